//! Lazy projections of a record stream.

use crate::entry::Entry;
use crate::error::Result;
use crate::field::{Field, Value};

/// Maps every record through a conversion function
pub struct EntryConverter<I, F> {
    source: I,
    convert: F,
}

impl<I, F> EntryConverter<I, F> {
    pub fn new(source: I, convert: F) -> Self {
        Self { source, convert }
    }
}

impl<I, F, T> Iterator for EntryConverter<I, F>
where
    I: Iterator<Item = Result<Entry>>,
    F: FnMut(Entry) -> T,
{
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.source.next()?;
        Some(entry.map(&mut self.convert))
    }
}

/// Projects every record to the value of one field
pub struct Unbox<I> {
    source: I,
    field: Field,
}

impl<I> Unbox<I> {
    pub fn new(source: I, field: Field) -> Self {
        Self { source, field }
    }
}

impl<I> Iterator for Unbox<I>
where
    I: Iterator<Item = Result<Entry>>,
{
    type Item = Result<Option<Value>>;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.source.next()?;
        Some(entry.map(|e| e.get(&self.field).cloned()))
    }
}
