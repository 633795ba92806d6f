//! In-process engine double for lifecycle tests.
//!
//! The double implements the full engine ABI with static `extern "C"`
//! functions backed by one global [`StubEngine`] record. Its fit loop
//! invokes the flow-control callback once per epoch with a decreasing
//! loss until the callback asks to stop or the scripted epoch budget
//! runs out, mirroring the synchronous contract of the real engine.
//!
//! State is global, so tests take [`stub_library`]'s guard to serialize
//! against each other.

use crate::loader::{RawColumn, SynthLibrary, SynthNetHandle, TrainParams};
use std::ffi::{c_char, c_int, CStr, CString};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Serializes tests that share the double's global state.
static ENGINE_LOCK: Mutex<()> = Mutex::new(());

/// Everything the double records and everything tests can script.
pub(crate) struct StubEngine {
    /// Epochs the fit loop runs unless the callback stops it first.
    pub epoch_budget: c_int,

    /// Handle returned by fit and snapshot-restore; 0 scripts a failure.
    pub next_handle: SynthNetHandle,

    /// State string handed out by snapshot-create.
    pub snapshot_state: String,

    pub fit_calls: u32,
    pub fit_rows: c_int,
    pub fit_batch_size: c_int,
    pub fit_tags: Vec<i32>,
    pub fit_continuous: Vec<f32>,
    pub fit_discrete: Vec<i32>,
    pub epochs_run: Vec<c_int>,

    pub sample_calls: u32,
    pub destroyed: Vec<SynthNetHandle>,

    pub snapshot_creates: u32,
    pub snapshot_releases: u32,
    pub restored_from: Vec<String>,
}

impl StubEngine {
    const fn new() -> Self {
        Self {
            epoch_budget: 0,
            next_handle: 0,
            snapshot_state: String::new(),
            fit_calls: 0,
            fit_rows: 0,
            fit_batch_size: 0,
            fit_tags: Vec::new(),
            fit_continuous: Vec::new(),
            fit_discrete: Vec::new(),
            epochs_run: Vec::new(),
            sample_calls: 0,
            destroyed: Vec::new(),
            snapshot_creates: 0,
            snapshot_releases: 0,
            restored_from: Vec::new(),
        }
    }
}

static STATE: Mutex<StubEngine> = Mutex::new(StubEngine::new());

fn state() -> MutexGuard<'static, StubEngine> {
    STATE.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Keeps other tests out of the double while held.
pub(crate) struct StubGuard {
    _lock: MutexGuard<'static, ()>,
}

/// Reset the double, script its behavior, and build a library over it.
pub(crate) fn stub_library(
    epoch_budget: c_int,
    next_handle: SynthNetHandle,
) -> (Arc<SynthLibrary>, StubGuard) {
    let lock = ENGINE_LOCK.lock().unwrap_or_else(PoisonError::into_inner);

    {
        let mut s = state();
        *s = StubEngine::new();
        s.epoch_budget = epoch_budget;
        s.next_handle = next_handle;
        s.snapshot_state = "opaque-state".to_string();
    }

    let library = SynthLibrary::from_entry_points(
        stub_fit,
        stub_sample,
        stub_destroy,
        stub_snapshot_create,
        stub_snapshot_release,
        stub_snapshot_create_from,
    );

    (library, StubGuard { _lock: lock })
}

/// Inspect or adjust the double's state mid-test.
pub(crate) fn with_state<R>(f: impl FnOnce(&mut StubEngine) -> R) -> R {
    f(&mut state())
}

unsafe extern "C" fn stub_fit(
    columns: *const RawColumn,
    n_columns: c_int,
    n_rows: c_int,
    params: *const TrainParams,
) -> SynthNetHandle {
    let params = unsafe { &*params };

    let epoch_budget = {
        let mut s = state();
        s.fit_calls += 1;
        s.fit_rows = n_rows;
        s.fit_batch_size = params.batch_size;

        for i in 0..n_columns as usize {
            let column = unsafe { &*columns.add(i) };
            s.fit_tags.push(column.ty);
            match column.ty {
                0 => {
                    let data = column.data as *const f32;
                    for r in 0..n_rows as usize {
                        s.fit_continuous.push(unsafe { *data.add(r) });
                    }
                }
                1 => {
                    let data = column.data as *const i32;
                    for r in 0..n_rows as usize {
                        s.fit_discrete.push(unsafe { *data.add(r) });
                    }
                }
                _ => {}
            }
        }

        s.epoch_budget
    };

    // The training loop: one callback per completed epoch, loss shrinking,
    // lock released so the callback can reach the state itself.
    for epoch in 0..epoch_budget {
        state().epochs_run.push(epoch);
        let stop = (params.flow_control)(epoch, 1.0 / (epoch + 1) as f64);
        if stop {
            break;
        }
    }

    state().next_handle
}

unsafe extern "C" fn stub_sample(
    _handle: SynthNetHandle,
    columns: *const RawColumn,
    n_columns: c_int,
    n_samples: c_int,
    realness: *mut f32,
) {
    state().sample_calls += 1;

    for i in 0..n_columns as usize {
        let column = unsafe { &*columns.add(i) };
        match column.ty {
            0 => {
                let data = column.data as *mut f32;
                for r in 0..n_samples as usize {
                    unsafe { *data.add(r) = (i * 10 + r) as f32 * 0.5 };
                }
            }
            1 => {
                let data = column.data as *mut i32;
                for r in 0..n_samples as usize {
                    unsafe { *data.add(r) = (i * 10 + r) as i32 };
                }
            }
            _ => {}
        }
        unsafe { *realness.add(i) = 0.25 * (i as f32 + 1.0) };
    }
}

unsafe extern "C" fn stub_destroy(handle: SynthNetHandle) {
    state().destroyed.push(handle);
}

unsafe extern "C" fn stub_snapshot_create(_handle: SynthNetHandle) -> *mut c_char {
    let mut s = state();
    s.snapshot_creates += 1;
    CString::new(s.snapshot_state.clone())
        .expect("stub state must not contain NUL")
        .into_raw()
}

unsafe extern "C" fn stub_snapshot_release(state_ptr: *mut c_char) {
    state().snapshot_releases += 1;
    drop(unsafe { CString::from_raw(state_ptr) });
}

unsafe extern "C" fn stub_snapshot_create_from(state_ptr: *const c_char) -> SynthNetHandle {
    let restored = unsafe { CStr::from_ptr(state_ptr) }
        .to_string_lossy()
        .into_owned();

    let mut s = state();
    s.restored_from.push(restored);
    s.next_handle
}
