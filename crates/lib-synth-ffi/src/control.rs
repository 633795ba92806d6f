//! Flow control bridging between the engine's training loop and caller code.
//!
//! The engine drives training epoch by epoch and asks, through a bare C
//! function pointer, whether to keep going. The ABI carries no user-data
//! slot, so the active controller is parked in a thread-local for the
//! duration of the fit call: training is synchronous and the engine invokes
//! the callback on the same thread that installed the slot.
//!
//! A panicking callback must not unwind into the engine. The trampoline
//! catches the panic, parks the payload for the owning fit call, and keeps
//! answering "stop" until the native loop returns.

use std::any::Any;
use std::cell::RefCell;
use std::ffi::{c_double, c_int, c_void};
use std::panic::{self, AssertUnwindSafe};

thread_local! {
    static ACTIVE: RefCell<Option<ActiveController>> = RefCell::new(None);
}

/// Controller installed for the duration of one fit call.
struct ActiveController {
    /// Type-erased pointer to the caller's hook; valid only while the
    /// owning `with_controller` frame is on the stack.
    hook_data: *mut c_void,

    /// Monomorphized shim that calls the hook through `hook_data`.
    hook_call: unsafe fn(*mut c_void, u32, f64) -> bool,

    /// Panic captured from the hook, reported after the native call ends.
    panic_message: Option<String>,
}

/// What happened to the controller while the native call ran.
pub(crate) struct ControllerOutcome {
    /// Message of the panic that aborted training, if any.
    pub(crate) panic_message: Option<String>,
}

/// Install `hook` as the thread's active controller, run `body`, and
/// report the controller outcome alongside the body's result.
pub(crate) fn with_controller<F, B, R>(hook: &mut F, body: B) -> (R, ControllerOutcome)
where
    F: FnMut(u32, f64) -> bool,
    B: FnOnce() -> R,
{
    // Clears the slot if `body` unwinds, so a dangling hook pointer can
    // never survive past this frame.
    struct ClearOnUnwind;
    impl Drop for ClearOnUnwind {
        fn drop(&mut self) {
            ACTIVE.with(|slot| slot.borrow_mut().take());
        }
    }

    ACTIVE.with(|slot| {
        let mut slot = slot.borrow_mut();
        assert!(slot.is_none(), "nested fit on one thread is not supported");
        *slot = Some(ActiveController {
            hook_data: hook as *mut F as *mut c_void,
            hook_call: call_hook::<F>,
            panic_message: None,
        });
    });

    let _guard = ClearOnUnwind;
    let result = body();

    let state = ACTIVE
        .with(|slot| slot.borrow_mut().take())
        .expect("controller slot cleared during native call");
    (
        result,
        ControllerOutcome {
            panic_message: state.panic_message,
        },
    )
}

/// Call the hook behind a type-erased pointer.
///
/// # Safety
///
/// `data` must be the `hook_data` pointer stored by `with_controller` for
/// the same concrete `F`, and the owning frame must still be live.
unsafe fn call_hook<F: FnMut(u32, f64) -> bool>(data: *mut c_void, epoch: u32, loss: f64) -> bool {
    let hook = unsafe { &mut *(data as *mut F) };
    hook(epoch, loss)
}

/// `extern "C"` entry the engine invokes once per completed epoch.
///
/// Never unwinds into the engine. Without an installed controller there is
/// nothing sane to ask, so the engine is told to stop.
pub(crate) extern "C" fn flow_control_trampoline(epoch: c_int, loss: c_double) -> bool {
    ACTIVE.with(|slot| {
        let mut slot = slot.borrow_mut();
        let Some(state) = slot.as_mut() else {
            return true;
        };

        if state.panic_message.is_some() {
            // Already aborting; keep telling the engine to stop.
            return true;
        }

        let hook_data = state.hook_data;
        let hook_call = state.hook_call;
        let result = panic::catch_unwind(AssertUnwindSafe(|| unsafe {
            hook_call(hook_data, epoch as u32, loss)
        }));

        match result {
            Ok(stop) => stop,
            Err(payload) => {
                state.panic_message = Some(panic_message(payload));
                true
            }
        }
    })
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trampoline_without_controller_requests_stop() {
        assert!(flow_control_trampoline(0, 0.5));
    }

    #[test]
    fn controller_sees_epochs_and_losses() {
        let mut seen = Vec::new();
        let mut hook = |epoch: u32, loss: f64| {
            seen.push((epoch, loss));
            epoch >= 1
        };

        let (_, outcome) = with_controller(&mut hook, || {
            assert!(!flow_control_trampoline(0, 1.0));
            assert!(flow_control_trampoline(1, 0.5));
        });

        assert!(outcome.panic_message.is_none());
        assert_eq!(seen, vec![(0, 1.0), (1, 0.5)]);
    }

    #[test]
    fn panicking_hook_is_caught_and_reported() {
        let mut hook = |_: u32, _: f64| -> bool { panic!("hook failed") };

        let (_, outcome) = with_controller(&mut hook, || {
            // First invocation panics inside the hook; later invocations
            // keep stopping without touching the hook again.
            assert!(flow_control_trampoline(0, 1.0));
            assert!(flow_control_trampoline(1, 0.9));
        });

        assert_eq!(outcome.panic_message.as_deref(), Some("hook failed"));
    }

    #[test]
    fn slot_is_cleared_after_the_call() {
        let mut hook = |_: u32, _: f64| false;
        let _ = with_controller(&mut hook, || ());

        assert!(flow_control_trampoline(0, 1.0));
    }
}
