//! Typed column representation.
//!
//! A column is the unit of data exchanged with the synthesis engine: either
//! continuous (`f32` samples) or discrete (`i32` categorical codes). Element
//! types are fixed per column and never mixed. Categorical string columns
//! must be encoded with a [`crate::StringTransformer`] before they become
//! discrete columns.

use serde::{Deserialize, Serialize};

/// Column element type.
///
/// Serialized by variant name in snapshot records, so the variants must not
/// be renamed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    /// 4-byte IEEE-754 floating-point elements.
    Continuous,

    /// 4-byte signed integer elements (categorical codes).
    Discrete,
}

impl ColumnType {
    /// Wire tag the engine uses for this type (0 = Continuous, 1 = Discrete).
    pub fn native_tag(self) -> i32 {
        match self {
            Self::Continuous => 0,
            Self::Discrete => 1,
        }
    }

    /// Size in bytes of one element of this type.
    pub fn element_size(self) -> usize {
        match self {
            Self::Continuous => std::mem::size_of::<f32>(),
            Self::Discrete => std::mem::size_of::<i32>(),
        }
    }
}

/// A single data column.
///
/// All columns passed to one fit or sample call must share the same row
/// count; the adapter rejects mismatched sets before any native call.
#[derive(Clone, Debug, PartialEq)]
pub enum ColumnData {
    /// Continuous values.
    Continuous(Vec<f32>),

    /// Discrete categorical codes.
    Discrete(Vec<i32>),
}

impl ColumnData {
    /// Number of rows (elements) in this column.
    pub fn row_count(&self) -> usize {
        match self {
            Self::Continuous(data) => data.len(),
            Self::Discrete(data) => data.len(),
        }
    }

    /// Element type of this column.
    pub fn column_type(&self) -> ColumnType {
        match self {
            Self::Continuous(_) => ColumnType::Continuous,
            Self::Discrete(_) => ColumnType::Discrete,
        }
    }

    /// Check if the column has no rows.
    pub fn is_empty(&self) -> bool {
        self.row_count() == 0
    }
}

/// A sampled column paired with the engine's realness score.
///
/// The realness score is a per-column fidelity signal reported by the engine
/// alongside sampling output; it never appears on input columns.
#[derive(Clone, Debug, PartialEq)]
pub struct SampledColumnData {
    /// The synthesized column values.
    pub data: ColumnData,

    /// Engine-reported fidelity signal for this column.
    pub realness: f32,
}
