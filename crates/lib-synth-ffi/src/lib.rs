//! # lib-synth-ffi
//!
//! Safe FFI adapter for the native tabular synthesis engine.
//!
//! This crate is the only place in the workspace that crosses the
//! foreign-function boundary. It handles:
//!
//! - Dynamic engine loading with `libloading`
//! - Column marshaling into and out of the engine's wire buffer layout
//! - Model lifecycle (fit/sample/destroy) over an opaque handle
//! - Per-epoch flow control for cooperative training stops
//! - Snapshot persistence of opaque model state plus column schema
//!
//! # Safety
//!
//! The engine is native code reached through a fixed C ABI. The adapter
//! confines the unsafe surface behind three guarantees:
//!
//! 1. **Shape validation**: malformed column sets are rejected before any
//!    native call
//! 2. **Scoped buffers**: wire memory is owned on the Rust side and freed
//!    on every exit path
//! 3. **Panic catching**: caller callbacks invoked from engine frames are
//!    wrapped in `catch_unwind` so unwinding never crosses the boundary

mod control;
pub mod error;
pub mod loader;
mod marshal;
pub mod model;
pub mod snapshot;

#[cfg(test)]
pub(crate) mod testutil;

pub use error::{SynthError, SynthResult};
pub use loader::SynthLibrary;
pub use model::SynthModel;
pub use snapshot::{restore, save};
