//! Entry filter
//!
//! Chains several sources and drops records the predicates reject. A
//! predicate can also end the current source early, which lets a caller
//! stop scanning a pre-sorted source once it has passed the interesting part.

use std::fmt;

use crate::entry::Entry;
use crate::error::Result;
use crate::field::{Column, FieldValue};

/// Verdict of a predicate on one record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Evaluation {
    /// Keep the record
    Accept,
    /// Drop the record
    Reject,
    /// Keep the record, then skip the rest of the current source
    LastAccept,
    /// Drop the record and skip the rest of the current source
    RejectAll,
}

impl Evaluation {
    /// Combine two verdicts: rejection and stopping are both sticky
    fn and(self, other: Evaluation) -> Evaluation {
        let reject = self.rejects() || other.rejects();
        let stop = self.stops() || other.stops();
        match (reject, stop) {
            (false, false) => Evaluation::Accept,
            (true, false) => Evaluation::Reject,
            (false, true) => Evaluation::LastAccept,
            (true, true) => Evaluation::RejectAll,
        }
    }

    pub fn rejects(self) -> bool {
        matches!(self, Evaluation::Reject | Evaluation::RejectAll)
    }

    pub fn stops(self) -> bool {
        matches!(self, Evaluation::LastAccept | Evaluation::RejectAll)
    }
}

/// A test applied to every record
pub trait Predicate {
    fn evaluate(&self, entry: &Entry) -> Evaluation;
}

impl<F> Predicate for F
where
    F: Fn(&Entry) -> Evaluation,
{
    fn evaluate(&self, entry: &Entry) -> Evaluation {
        self(entry)
    }
}

/// Accepts records carrying every given field value
#[derive(Debug, Clone)]
pub struct Values {
    columns: Vec<Column>,
}

impl Values {
    pub fn new(values: Vec<FieldValue>) -> Self {
        Self {
            columns: values.into_iter().map(Column::Value).collect(),
        }
    }
}

impl Predicate for Values {
    fn evaluate(&self, entry: &Entry) -> Evaluation {
        if entry.contains_field_values(&self.columns) {
            Evaluation::Accept
        } else {
            Evaluation::Reject
        }
    }
}

/// Filtered concatenation of record sources
pub struct EntryFilter<S> {
    sources: std::vec::IntoIter<S>,
    current: Option<S>,
    predicates: Vec<Box<dyn Predicate>>,
}

impl<S> EntryFilter<S>
where
    S: Iterator<Item = Result<Entry>>,
{
    pub fn new(sources: Vec<S>, predicates: Vec<Box<dyn Predicate>>) -> Self {
        let mut sources = sources.into_iter();
        let current = sources.next();
        Self {
            sources,
            current,
            predicates,
        }
    }

    /// Aggregate verdict of all predicates
    pub fn evaluate(&self, entry: &Entry) -> Evaluation {
        let mut verdict = Evaluation::Accept;
        for predicate in &self.predicates {
            verdict = verdict.and(predicate.evaluate(entry));
            if verdict == Evaluation::RejectAll {
                break;
            }
        }
        verdict
    }
}

impl<S> Iterator for EntryFilter<S>
where
    S: Iterator<Item = Result<Entry>>,
{
    type Item = Result<Entry>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let Some(source) = self.current.as_mut() else {
                self.current = Some(self.sources.next()?);
                continue;
            };

            let entry = match source.next() {
                Some(Ok(entry)) => entry,
                Some(Err(e)) => return Some(Err(e)),
                None => {
                    self.current = None;
                    continue;
                }
            };

            let verdict = self.evaluate(&entry);
            if verdict.stops() {
                self.current = None;
            }
            if !verdict.rejects() {
                return Some(Ok(entry));
            }
        }
    }
}

impl<S> fmt::Debug for EntryFilter<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryFilter")
            .field("predicates", &self.predicates.len())
            .field("remaining_sources", &self.sources.len())
            .finish()
    }
}
