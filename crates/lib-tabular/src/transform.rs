//! Categorical string encoding.
//!
//! Maps a closed set of string values to dense integer codes so that
//! categorical columns can be fed to the engine as discrete columns, and
//! decodes sampled codes back to their original string form.

use crate::error::TransformError;
use std::collections::HashMap;

/// Bijective mapping between a closed set of trimmed strings and dense
/// integer codes.
///
/// Values are trimmed and deduplicated at construction; indices are
/// assigned `0..n-1` in first-occurrence order. The mapping is frozen after
/// construction: [`transform`](Self::transform) rejects values that were not
/// in the construction set.
#[derive(Clone, Debug)]
pub struct StringTransformer {
    uniques: Vec<String>,
    str_to_idx: HashMap<String, i32>,
}

impl StringTransformer {
    /// Build a transformer from a set of observed values.
    pub fn new<S: AsRef<str>>(values: &[S]) -> Self {
        let mut uniques = Vec::new();
        let mut str_to_idx = HashMap::new();

        for value in values {
            let value = value.as_ref().trim();
            if !str_to_idx.contains_key(value) {
                str_to_idx.insert(value.to_string(), uniques.len() as i32);
                uniques.push(value.to_string());
            }
        }

        Self { uniques, str_to_idx }
    }

    /// Number of unique values in the learned vocabulary.
    pub fn uniques_size(&self) -> usize {
        self.uniques.len()
    }

    /// The learned vocabulary in first-occurrence order.
    pub fn uniques(&self) -> &[String] {
        &self.uniques
    }

    /// Encode values to their integer codes.
    ///
    /// Each value is trimmed before lookup. Fails on the first value that
    /// was not present at construction time.
    pub fn transform<S: AsRef<str>>(&self, values: &[S]) -> Result<Vec<i32>, TransformError> {
        values
            .iter()
            .map(|value| {
                let value = value.as_ref().trim();
                self.str_to_idx
                    .get(value)
                    .copied()
                    .ok_or_else(|| TransformError::UnknownCategory(value.to_string()))
            })
            .collect()
    }

    /// Decode integer codes back to their string values.
    ///
    /// Fails on the first code outside `[0, uniques_size())`.
    pub fn reverse_transform(&self, codes: &[i32]) -> Result<Vec<String>, TransformError> {
        codes
            .iter()
            .map(|&code| {
                usize::try_from(code)
                    .ok()
                    .and_then(|idx| self.uniques.get(idx))
                    .cloned()
                    .ok_or(TransformError::CodeOutOfRange {
                        code,
                        uniques: self.uniques.len(),
                    })
            })
            .collect()
    }
}
