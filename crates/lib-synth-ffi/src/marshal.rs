//! Scoped buffer marshaling between typed columns and the wire layout.
//!
//! Wire memory lives exactly as long as one native call: allocate, copy,
//! call, read back, free. Ownership stays on the Rust side so release is
//! guaranteed on every exit path, including native failures and callback
//! panics.

use crate::loader::RawColumn;
use lib_tabular::{ColumnData, ColumnType};
use std::ffi::c_void;

/// One column's worth of native-call backing memory.
///
/// Owns its bytes; the [`RawColumn`] descriptor borrows them for the
/// duration of a single call and must not outlive the buffer.
pub(crate) struct ColumnBuffer {
    ty: ColumnType,
    bytes: Vec<u8>,
}

impl ColumnBuffer {
    /// Allocate a buffer and fill it with a column's raw elements.
    pub(crate) fn from_column(column: &ColumnData) -> Self {
        let ty = column.column_type();
        let mut bytes = Vec::with_capacity(column.row_count() * ty.element_size());

        match column {
            ColumnData::Continuous(data) => {
                for value in data {
                    bytes.extend_from_slice(&value.to_ne_bytes());
                }
            }
            ColumnData::Discrete(data) => {
                for value in data {
                    bytes.extend_from_slice(&value.to_ne_bytes());
                }
            }
        }

        Self { ty, bytes }
    }

    /// Allocate a zeroed output buffer for `rows` elements of `ty`.
    pub(crate) fn for_output(ty: ColumnType, rows: usize) -> Self {
        Self {
            ty,
            bytes: vec![0u8; rows * ty.element_size()],
        }
    }

    /// Wire descriptor pointing into this buffer.
    pub(crate) fn descriptor(&mut self) -> RawColumn {
        RawColumn {
            ty: self.ty.native_tag(),
            data: self.bytes.as_mut_ptr() as *mut c_void,
        }
    }

    /// Reinterpret the buffer contents according to the column type.
    pub(crate) fn into_column(self) -> ColumnData {
        match self.ty {
            ColumnType::Continuous => ColumnData::Continuous(
                self.bytes
                    .chunks_exact(4)
                    .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
                    .collect(),
            ),
            ColumnType::Discrete => ColumnData::Discrete(
                self.bytes
                    .chunks_exact(4)
                    .map(|c| i32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
                    .collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_buffer_carries_type_tag_and_raw_elements() {
        let column = ColumnData::Discrete(vec![3, -1, 7]);
        let mut buf = ColumnBuffer::from_column(&column);

        let desc = buf.descriptor();
        assert_eq!(desc.ty, 1);

        let elements = unsafe { std::slice::from_raw_parts(desc.data as *const i32, 3) };
        assert_eq!(elements, &[3, -1, 7]);
    }

    #[test]
    fn output_buffer_reinterprets_written_elements() {
        let mut buf = ColumnBuffer::for_output(ColumnType::Continuous, 3);

        let desc = buf.descriptor();
        unsafe {
            let data = desc.data as *mut f32;
            *data = 1.5;
            *data.add(1) = -2.0;
            *data.add(2) = 0.25;
        }

        match buf.into_column() {
            ColumnData::Continuous(values) => assert_eq!(values, vec![1.5, -2.0, 0.25]),
            other => panic!("expected continuous column, got {other:?}"),
        }
    }
}
