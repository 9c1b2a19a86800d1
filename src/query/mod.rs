//! Query Module
//!
//! Lazy combinators over streams of decoded records.
//!
//! - [`EntryFilter`]: predicates with early termination per source
//! - [`EntrySorter`]: bounded re-sort of a descending source, with a keyset cursor
//! - [`EntryConverter`] / [`Unbox`]: projection to another type or to one field
//!
//! Every combinator consumes and yields `Result<Entry>`; source errors pass
//! through unchanged.

mod convert;
mod filter;
mod sort;

use crate::entry::Entry;
use crate::error::Result;
use crate::field::Field;

pub use convert::{EntryConverter, Unbox};
pub use filter::{EntryFilter, Evaluation, Predicate, Values};
pub use sort::{EntrySorter, Sort, Unreverse};

/// Combinator methods for any stream of decoded records
pub trait EntriesExt: Iterator<Item = Result<Entry>> + Sized {
    fn filter_entries(self, predicates: Vec<Box<dyn Predicate>>) -> EntryFilter<Self> {
        EntryFilter::new(vec![self], predicates)
    }

    fn unreverse(self, field: Field, count: Option<usize>, after: Option<Entry>) -> EntrySorter<Self, Unreverse> {
        EntrySorter::new(self, Unreverse::new(field), count, after)
    }

    fn convert<T, F>(self, convert: F) -> EntryConverter<Self, F>
    where
        F: FnMut(Entry) -> T,
    {
        EntryConverter::new(self, convert)
    }

    fn unbox(self, field: Field) -> Unbox<Self> {
        Unbox::new(self, field)
    }
}

impl<I> EntriesExt for I where I: Iterator<Item = Result<Entry>> {}
