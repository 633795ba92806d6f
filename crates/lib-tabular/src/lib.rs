//! # lib-tabular
//!
//! Core column types for tabular data synthesis.
//!
//! This crate provides the foundational types shared across the workspace:
//! - Typed column representation (continuous floats / discrete codes)
//! - Sampled columns carrying per-column realness scores
//! - Categorical string encoding via [`StringTransformer`]
//!
//! Nothing here touches the foreign engine; everything is plain in-process
//! data that the FFI adapter marshals at the boundary.

pub mod column;
pub mod error;
pub mod transform;

pub use column::{ColumnData, ColumnType, SampledColumnData};
pub use error::TransformError;
pub use transform::StringTransformer;
