//! Portable persistence of trained models.
//!
//! A snapshot pairs the engine's opaque internal state with the column
//! schema as one self-describing JSON record:
//!
//! ```json
//! {"state":"<engine blob>","columns":["Continuous","Discrete"]}
//! ```
//!
//! The state string is produced and consumed by the engine and never
//! interpreted here; the schema is what lets a restored model marshal
//! sample output again.

use crate::error::{SynthError, SynthResult};
use crate::loader::SynthLibrary;
use crate::model::SynthModel;
use lib_tabular::ColumnType;
use serde::{Deserialize, Serialize};
use std::ffi::{CStr, CString};
use std::sync::Arc;

/// Persisted snapshot record.
#[derive(Debug, Serialize, Deserialize)]
struct SnapshotRecord {
    /// Opaque engine state, treated as an uninterpreted blob.
    state: String,

    /// Column-type schema in original column order.
    columns: Vec<ColumnType>,
}

/// Serialize a model's engine state and schema into one text record.
///
/// The engine-side snapshot resource is released before this returns, on
/// success and error paths alike.
pub fn save(model: &SynthModel) -> SynthResult<String> {
    model.ensure_live()?;

    let library = model.library();
    let create = library.snapshot_create_fn();
    let release = library.snapshot_release_fn();

    let raw = unsafe { create(model.handle()) };
    if raw.is_null() {
        return Err(SynthError::native_call_failure("synth_net_snapshot_create"));
    }

    // Copy the state out, then hand the resource back to the engine
    // before any error can propagate.
    let state = unsafe { CStr::from_ptr(raw) }.to_str().map(String::from);
    unsafe { release(raw) };

    let state = state.map_err(|e| SynthError::InvalidSnapshotState(e.to_string()))?;
    let record = SnapshotRecord {
        state,
        columns: model.schema().to_vec(),
    };
    let text = serde_json::to_string(&record)?;

    tracing::debug!(columns = record.columns.len(), "Snapshot serialized");
    Ok(text)
}

/// Reconstruct a model from a snapshot record.
///
/// The fresh handle is owned by the returned model exactly as if it had
/// come from [`SynthModel::fit`].
pub fn restore(library: Arc<SynthLibrary>, text: &str) -> SynthResult<SynthModel> {
    let record: SnapshotRecord = serde_json::from_str(text)?;

    let state = CString::new(record.state)
        .map_err(|_| SynthError::InvalidSnapshotState("interior NUL in engine state".to_string()))?;

    let create_from = library.snapshot_create_from_fn();
    let handle = unsafe { create_from(state.as_ptr()) };
    if handle == 0 {
        return Err(SynthError::native_call_failure(
            "synth_net_snapshot_create_from",
        ));
    }

    tracing::debug!(handle, columns = record.columns.len(), "Snapshot restored");
    Ok(SynthModel::from_parts(library, handle, record.columns))
}
