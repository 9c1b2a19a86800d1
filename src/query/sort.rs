//! Entry sorter
//!
//! Buffers a source and re-emits it in another order. The sort runs on the
//! first call to `next`.

use std::collections::VecDeque;

use crate::entry::Entry;
use crate::error::Result;
use crate::field::Field;

/// A buffering sort strategy
pub trait Sort {
    /// Drain `source` into `sorted`, keeping at most `count` records
    fn sort(
        &self,
        source: &mut dyn Iterator<Item = Result<Entry>>,
        count: usize,
        after: Option<&Entry>,
        sorted: &mut VecDeque<Entry>,
    ) -> Result<()>;
}

/// Re-ascend a source produced in descending `field` order
///
/// Keeps the last `count` records consumed. With a cursor, consumption stops
/// at the first record whose field value is not strictly greater than the
/// cursor's.
#[derive(Debug, Clone)]
pub struct Unreverse {
    field: Field,
}

impl Unreverse {
    pub fn new(field: Field) -> Self {
        Self { field }
    }
}

impl Sort for Unreverse {
    fn sort(
        &self,
        source: &mut dyn Iterator<Item = Result<Entry>>,
        count: usize,
        after: Option<&Entry>,
        sorted: &mut VecDeque<Entry>,
    ) -> Result<()> {
        let cursor = after.and_then(|a| a.get(&self.field));

        for next in source {
            let next = next?;
            if let Some(cursor) = cursor {
                let past = matches!(next.get(&self.field), Some(value) if value > cursor);
                if !past {
                    break;
                }
            }

            sorted.push_front(next);
            if sorted.len() > count {
                sorted.pop_back();
            }
        }
        Ok(())
    }
}

/// Records of a source, re-sorted by `S`
pub struct EntrySorter<I, S> {
    source: Option<I>,
    sort: S,
    count: usize,
    after: Option<Entry>,
    sorted: VecDeque<Entry>,
}

impl<I, S> EntrySorter<I, S>
where
    I: Iterator<Item = Result<Entry>>,
    S: Sort,
{
    /// `count == None` keeps every record
    pub fn new(source: I, sort: S, count: Option<usize>, after: Option<Entry>) -> Self {
        Self {
            source: Some(source),
            sort,
            count: count.unwrap_or(usize::MAX),
            after,
            sorted: VecDeque::new(),
        }
    }
}

impl<I, S> Iterator for EntrySorter<I, S>
where
    I: Iterator<Item = Result<Entry>>,
    S: Sort,
{
    type Item = Result<Entry>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(mut source) = self.source.take() {
            if let Err(e) = self
                .sort
                .sort(&mut source, self.count, self.after.as_ref(), &mut self.sorted)
            {
                self.sorted.clear();
                return Some(Err(e));
            }
        }
        self.sorted.pop_front().map(Ok)
    }
}
