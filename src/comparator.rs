//! Byte comparator
//!
//! Total order over variable-length byte strings: unsigned lexicographic
//! comparison, and on a common-prefix tie the shorter string sorts first.
//!
//! This is exactly `Ord for [u8]`, which is why every sorted structure in the
//! crate is keyed by `Vec<u8>`. The explicit functions exist for range-bound
//! construction and for external `SortedMap` implementations that need a
//! comparator value.

use std::cmp::Ordering;

/// Comparator value for byte-keyed sorted maps
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ByteComparator;

impl ByteComparator {
    pub fn compare(&self, a: &[u8], b: &[u8]) -> Ordering {
        compare(a, b)
    }
}

/// Compare two byte strings
pub fn compare(a: &[u8], b: &[u8]) -> Ordering {
    let min_len = a.len().min(b.len());
    for i in 0..min_len {
        match a[i].cmp(&b[i]) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    a.len().cmp(&b.len())
}

/// Smallest byte string that sorts after every string starting with `prefix`
///
/// Returns `None` when no such string exists (empty prefix, or all `0xFF`).
pub fn prefix_successor(prefix: &[u8]) -> Option<Vec<u8>> {
    let last = prefix.iter().rposition(|&b| b != 0xFF)?;
    let mut successor = prefix[..=last].to_vec();
    successor[last] += 1;
    Some(successor)
}
