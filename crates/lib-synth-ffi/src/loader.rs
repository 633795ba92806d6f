//! Dynamic library loading for the synthesis engine.
//!
//! This module handles loading the engine shared library and extracting
//! the fixed set of entry points. Loading is explicit and process-scoped:
//! load the library once before first use, share it via `Arc`, and let it
//! live until process exit.

use crate::error::{SynthError, SynthResult};
use libloading::Library;
use std::ffi::{c_char, c_double, c_int, c_void};
use std::path::Path;
use std::sync::Arc;

/// Opaque engine model handle.
///
/// Zero is the engine's failure sentinel; a valid handle is never zero.
pub type SynthNetHandle = i64;

/// Per-epoch flow-control callback crossing the C boundary.
///
/// The engine invokes it synchronously once per completed epoch with the
/// 0-based epoch index and the current loss. Returning `true` terminates
/// the training loop after the current epoch.
pub type FlowControlFn = extern "C" fn(epoch: c_int, loss: c_double) -> bool;

/// Wire descriptor for one column buffer.
///
/// ```c
/// struct RawColumn {
///     int32_t type;   // 0 = continuous (float), 1 = discrete (int32)
///     void   *data;   // row_count * element_size contiguous bytes
/// };
/// ```
#[repr(C)]
pub struct RawColumn {
    pub ty: c_int,
    pub data: *mut c_void,
}

/// Batch configuration handed to `synth_net_fit`.
///
/// ```c
/// struct TrainParams {
///     int32_t batch_size;
///     bool  (*flow_control)(int32_t epoch, double loss);
/// };
/// ```
#[repr(C)]
pub struct TrainParams {
    pub batch_size: c_int,
    pub flow_control: FlowControlFn,
}

/// Function signature for `synth_net_fit`.
///
/// ```c
/// int64_t synth_net_fit(
///     const struct RawColumn  *columns,
///     int32_t                  n_columns,
///     int32_t                  n_rows,
///     const struct TrainParams *params
/// );
/// ```
pub type SynthFitFn = unsafe extern "C" fn(
    columns: *const RawColumn,
    n_columns: c_int,
    n_rows: c_int,
    params: *const TrainParams,
) -> SynthNetHandle;

/// Function signature for `synth_net_sample`.
///
/// The engine writes `n_samples` elements into each column's buffer and
/// one realness float per column into `realness`.
///
/// ```c
/// void synth_net_sample(
///     int64_t                 handle,
///     const struct RawColumn *columns,
///     int32_t                 n_columns,
///     int32_t                 n_samples,
///     float                  *realness
/// );
/// ```
pub type SynthSampleFn = unsafe extern "C" fn(
    handle: SynthNetHandle,
    columns: *const RawColumn,
    n_columns: c_int,
    n_samples: c_int,
    realness: *mut f32,
);

/// Function signature for `synth_net_destroy`.
///
/// ```c
/// void synth_net_destroy(int64_t handle);
/// ```
pub type SynthDestroyFn = unsafe extern "C" fn(handle: SynthNetHandle);

/// Function signature for `synth_net_snapshot_create`.
///
/// Returns the engine's opaque internal state as a C string. The caller
/// must hand the pointer back to `synth_net_snapshot_release`.
pub type SnapshotCreateFn = unsafe extern "C" fn(handle: SynthNetHandle) -> *mut c_char;

/// Function signature for `synth_net_snapshot_release`.
pub type SnapshotReleaseFn = unsafe extern "C" fn(state: *mut c_char);

/// Function signature for `synth_net_snapshot_create_from`.
///
/// Reconstructs a model from an opaque state string previously produced
/// by `synth_net_snapshot_create`.
pub type SnapshotCreateFromFn = unsafe extern "C" fn(state: *const c_char) -> SynthNetHandle;

/// Loaded engine library with extracted entry points.
#[derive(Debug)]
pub struct SynthLibrary {
    /// Keeps the dlopen handle alive for the lifetime of the extracted
    /// function pointers. `None` only for in-process test doubles.
    #[allow(dead_code)]
    library: Option<Library>,

    /// Path the library was loaded from.
    pub path: String,

    fit: SynthFitFn,
    sample: SynthSampleFn,
    destroy: SynthDestroyFn,
    snapshot_create: SnapshotCreateFn,
    snapshot_release: SnapshotReleaseFn,
    snapshot_create_from: SnapshotCreateFromFn,
}

impl SynthLibrary {
    /// Load the engine from a shared library file.
    ///
    /// All six entry points are resolved eagerly so a missing symbol fails
    /// the load rather than a later call.
    ///
    /// # Safety
    ///
    /// The library must implement the engine ABI. A binary exporting these
    /// symbols with different signatures causes undefined behavior when the
    /// entry points are invoked.
    pub fn load<P: AsRef<Path>>(path: P) -> SynthResult<Arc<Self>> {
        let path = path.as_ref();
        let path_str = path.display().to_string();

        let library =
            unsafe { Library::new(path) }.map_err(|e| SynthError::load_error(&path_str, e))?;

        let fit: SynthFitFn = unsafe {
            *library
                .get::<SynthFitFn>(b"synth_net_fit\0")
                .map_err(|_| SynthError::symbol_not_found("synth_net_fit"))?
        };

        let sample: SynthSampleFn = unsafe {
            *library
                .get::<SynthSampleFn>(b"synth_net_sample\0")
                .map_err(|_| SynthError::symbol_not_found("synth_net_sample"))?
        };

        let destroy: SynthDestroyFn = unsafe {
            *library
                .get::<SynthDestroyFn>(b"synth_net_destroy\0")
                .map_err(|_| SynthError::symbol_not_found("synth_net_destroy"))?
        };

        let snapshot_create: SnapshotCreateFn = unsafe {
            *library
                .get::<SnapshotCreateFn>(b"synth_net_snapshot_create\0")
                .map_err(|_| SynthError::symbol_not_found("synth_net_snapshot_create"))?
        };

        let snapshot_release: SnapshotReleaseFn = unsafe {
            *library
                .get::<SnapshotReleaseFn>(b"synth_net_snapshot_release\0")
                .map_err(|_| SynthError::symbol_not_found("synth_net_snapshot_release"))?
        };

        let snapshot_create_from: SnapshotCreateFromFn = unsafe {
            *library
                .get::<SnapshotCreateFromFn>(b"synth_net_snapshot_create_from\0")
                .map_err(|_| SynthError::symbol_not_found("synth_net_snapshot_create_from"))?
        };

        tracing::info!(path = %path_str, "Loaded synthesis engine library");

        Ok(Arc::new(Self {
            library: Some(library),
            path: path_str,
            fit,
            sample,
            destroy,
            snapshot_create,
            snapshot_release,
            snapshot_create_from,
        }))
    }

    /// Build a library from entry points already in this process.
    ///
    /// Test seam: lets lifecycle tests run against an engine double
    /// without a shared library on disk.
    #[cfg(test)]
    pub(crate) fn from_entry_points(
        fit: SynthFitFn,
        sample: SynthSampleFn,
        destroy: SynthDestroyFn,
        snapshot_create: SnapshotCreateFn,
        snapshot_release: SnapshotReleaseFn,
        snapshot_create_from: SnapshotCreateFromFn,
    ) -> Arc<Self> {
        Arc::new(Self {
            library: None,
            path: "<in-process double>".to_string(),
            fit,
            sample,
            destroy,
            snapshot_create,
            snapshot_release,
            snapshot_create_from,
        })
    }

    /// Get the `synth_net_fit` function pointer.
    pub(crate) fn fit_fn(&self) -> SynthFitFn {
        self.fit
    }

    /// Get the `synth_net_sample` function pointer.
    pub(crate) fn sample_fn(&self) -> SynthSampleFn {
        self.sample
    }

    /// Get the `synth_net_destroy` function pointer.
    pub(crate) fn destroy_fn(&self) -> SynthDestroyFn {
        self.destroy
    }

    /// Get the `synth_net_snapshot_create` function pointer.
    pub(crate) fn snapshot_create_fn(&self) -> SnapshotCreateFn {
        self.snapshot_create
    }

    /// Get the `synth_net_snapshot_release` function pointer.
    pub(crate) fn snapshot_release_fn(&self) -> SnapshotReleaseFn {
        self.snapshot_release
    }

    /// Get the `synth_net_snapshot_create_from` function pointer.
    pub(crate) fn snapshot_create_from_fn(&self) -> SnapshotCreateFromFn {
        self.snapshot_create_from
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_library_fails() {
        let err = SynthLibrary::load("/nonexistent/libsynthetic_data.so").unwrap_err();
        assert!(matches!(err, SynthError::LoadError { .. }));
    }
}
