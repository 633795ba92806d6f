//! Engine model lifecycle: fit, sample, dispose.
//!
//! A [`SynthModel`] owns exactly one opaque engine handle, created by
//! [`SynthModel::fit`] or by [`crate::snapshot::restore`], and destroys it
//! exactly once. Using a model after dispose fails fast instead of
//! re-crossing the boundary with a dead handle.

use crate::control;
use crate::error::{SynthError, SynthResult};
use crate::loader::{RawColumn, SynthLibrary, SynthNetHandle, TrainParams};
use crate::marshal::ColumnBuffer;
use lib_tabular::{ColumnData, ColumnType, SampledColumnData};
use std::ffi::c_int;
use std::sync::Arc;

/// A trained synthesis model backed by an opaque engine handle.
///
/// # Thread Safety
///
/// The engine gives no guarantees for concurrent use of one handle, so a
/// model must be driven by one logical owner at a time. The type is
/// deliberately `!Sync` (the `_not_sync` marker enforces this at compile
/// time); wrap it in a `Mutex` to share across threads. Separate models
/// over the same loaded library are independent.
#[derive(Debug)]
pub struct SynthModel {
    /// The loaded engine library.
    library: Arc<SynthLibrary>,

    /// Opaque handle from `synth_net_fit` or snapshot restore.
    handle: SynthNetHandle,

    /// Column-type schema captured at fit/restore time, in column order.
    schema: Vec<ColumnType>,

    /// Set once `synth_net_destroy` has run; guards against double
    /// destruction and use-after-dispose.
    disposed: bool,

    /// Marker to prevent a `Sync` implementation.
    _not_sync: std::marker::PhantomData<std::cell::Cell<()>>,
}

impl SynthModel {
    /// Train a model on a set of columns.
    ///
    /// Blocks the calling thread for the full training duration; `on_epoch`
    /// is invoked on this same thread once per completed epoch with the
    /// 0-based epoch index and current loss, and returning `true` stops
    /// training after that epoch. The returned model reflects whatever
    /// state was reached when training ended.
    ///
    /// Fails with [`SynthError::SchemaMismatch`] before any native call if
    /// the column set is empty, has zero rows, or disagrees on row count.
    /// A panic in `on_epoch` aborts the fit: training is stopped, any
    /// handle the engine produced is destroyed, and
    /// [`SynthError::ControllerPanicked`] is returned.
    pub fn fit<F>(
        library: Arc<SynthLibrary>,
        columns: &[ColumnData],
        batch_size: usize,
        mut on_epoch: F,
    ) -> SynthResult<Self>
    where
        F: FnMut(u32, f64) -> bool,
    {
        let n_rows = validate_schema(columns)?;
        let schema: Vec<ColumnType> = columns.iter().map(ColumnData::column_type).collect();

        // Scoped wire buffers; freed when they drop, on every exit path.
        let mut buffers: Vec<ColumnBuffer> = columns.iter().map(ColumnBuffer::from_column).collect();
        let descriptors: Vec<RawColumn> = buffers.iter_mut().map(ColumnBuffer::descriptor).collect();

        let params = TrainParams {
            batch_size: batch_size as c_int,
            flow_control: control::flow_control_trampoline,
        };

        let fit_fn = library.fit_fn();
        let (handle, outcome) = control::with_controller(&mut on_epoch, || unsafe {
            fit_fn(
                descriptors.as_ptr(),
                descriptors.len() as c_int,
                n_rows as c_int,
                &params,
            )
        });

        if let Some(message) = outcome.panic_message {
            // The callback aborted training; drop whatever handle the
            // engine produced so nothing leaks.
            if handle != 0 {
                let destroy = library.destroy_fn();
                unsafe { destroy(handle) };
            }
            return Err(SynthError::ControllerPanicked(message));
        }

        if handle == 0 {
            return Err(SynthError::native_call_failure("synth_net_fit"));
        }

        tracing::debug!(
            handle,
            columns = schema.len(),
            rows = n_rows,
            "synth_net_fit completed"
        );

        Ok(Self::from_parts(library, handle, schema))
    }

    /// Wrap an engine handle and its schema into a live model.
    pub(crate) fn from_parts(
        library: Arc<SynthLibrary>,
        handle: SynthNetHandle,
        schema: Vec<ColumnType>,
    ) -> Self {
        Self {
            library,
            handle,
            schema,
            disposed: false,
            _not_sync: std::marker::PhantomData,
        }
    }

    /// Column-type schema this model was trained or restored with, in
    /// original column order.
    pub fn schema(&self) -> &[ColumnType] {
        &self.schema
    }

    /// Draw `sample_count` synthesized rows per column.
    ///
    /// Columns come back in the original column order, each typed per the
    /// schema and paired with the engine's realness score. A zero
    /// `sample_count` yields an empty result without a native call.
    pub fn sample(&self, sample_count: usize) -> SynthResult<Vec<SampledColumnData>> {
        self.ensure_live()?;

        if sample_count == 0 {
            return Ok(Vec::new());
        }

        let mut buffers: Vec<ColumnBuffer> = self
            .schema
            .iter()
            .map(|&ty| ColumnBuffer::for_output(ty, sample_count))
            .collect();
        let descriptors: Vec<RawColumn> = buffers.iter_mut().map(ColumnBuffer::descriptor).collect();
        let mut realness = vec![0.0f32; self.schema.len()];

        let sample_fn = self.library.sample_fn();
        unsafe {
            sample_fn(
                self.handle,
                descriptors.as_ptr(),
                descriptors.len() as c_int,
                sample_count as c_int,
                realness.as_mut_ptr(),
            );
        }

        let columns = buffers
            .into_iter()
            .zip(realness)
            .map(|(buffer, realness)| SampledColumnData {
                data: buffer.into_column(),
                realness,
            })
            .collect();

        tracing::debug!(
            handle = self.handle,
            samples = sample_count,
            "synth_net_sample completed"
        );

        Ok(columns)
    }

    /// Destroy the native handle.
    ///
    /// Called automatically on drop if not called explicitly. Any further
    /// operation on the model, including a second dispose, fails with
    /// [`SynthError::UseAfterDispose`].
    pub fn dispose(&mut self) -> SynthResult<()> {
        self.ensure_live()?;
        self.disposed = true;

        let destroy = self.library.destroy_fn();
        unsafe { destroy(self.handle) };

        tracing::debug!(handle = self.handle, "synth_net_destroy completed");
        Ok(())
    }

    /// The engine handle. Callers must have checked liveness.
    pub(crate) fn handle(&self) -> SynthNetHandle {
        self.handle
    }

    /// The library this model's handle belongs to.
    pub(crate) fn library(&self) -> &Arc<SynthLibrary> {
        &self.library
    }

    /// Fail fast if the handle was already destroyed.
    pub(crate) fn ensure_live(&self) -> SynthResult<()> {
        if self.disposed {
            Err(SynthError::UseAfterDispose)
        } else {
            Ok(())
        }
    }
}

impl Drop for SynthModel {
    fn drop(&mut self) {
        if !self.disposed {
            // Best-effort cleanup, never panic in drop.
            if let Err(e) = self.dispose() {
                tracing::warn!(error = %e, "Error during model cleanup");
            }
        }
    }
}

/// Validate that the column set is non-empty and rectangular, returning
/// the shared row count.
fn validate_schema(columns: &[ColumnData]) -> SynthResult<usize> {
    let Some(first) = columns.first() else {
        return Err(SynthError::schema_mismatch("empty column set"));
    };

    let n_rows = first.row_count();
    if n_rows == 0 {
        return Err(SynthError::schema_mismatch("columns have zero rows"));
    }

    for (i, column) in columns.iter().enumerate() {
        if column.row_count() != n_rows {
            return Err(SynthError::schema_mismatch(format!(
                "column {i} has {} rows, expected {n_rows}",
                column.row_count()
            )));
        }
    }

    Ok(n_rows)
}
