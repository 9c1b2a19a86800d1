//! Entry Module
//!
//! A sparse, field-keyed record and its binary layout.
//!
//! ## Layout
//! Fields are written in column order with no tags and no separators beyond
//! what each field's size policy requires:
//! ```text
//! ┌──────────┬─────────────────┬───────────────┬──────────────┐
//! │ Fixed(4) │ Prefixed2       │ NullTerminated│ last variable│
//! │ 00000001 │ 0003 'B' 'o' 'b'│ 'x' 'y' 00    │ rest of bytes│
//! └──────────┴─────────────────┴───────────────┴──────────────┘
//! ```
//!
//! ## Range Bounds
//! Scans need boundary keys for records that are only partially known. A
//! field missing from the entry is resolved in order:
//! 1. the column's own literal (`Column::Value`),
//! 2. the `FieldRange` min (lower bound) or max (upper bound),
//! 3. `0x00` fill (lower) or `0xFF` fill (upper) for fixed-width fields.
//!
//! A missing variable-width field ends the bound early: the lower bound is
//! the bytes written so far and the upper bound is their prefix successor.
//! A complete upper bound gets one trailing `0x00` so it sorts after the
//! record it names.

use std::collections::HashMap;

use crate::comparator::prefix_successor;
use crate::error::{Result, StoreError};
use crate::field::layout::span;
use crate::field::{Column, Field, FieldSize, FieldValue, Value};

/// Immutable mapping from field identity to value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Entry {
    values: HashMap<Field, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Plain,
    Lower,
    Upper,
}

enum Segment {
    Raw {
        bytes: Vec<u8>,
        size: FieldSize,
        is_last: bool,
    },
    Fill {
        width: usize,
        byte: u8,
    },
}

impl Segment {
    fn len(&self) -> usize {
        match self {
            Segment::Raw { bytes, size, is_last } => match size {
                FieldSize::Fixed(_) => bytes.len(),
                _ if *is_last => bytes.len(),
                FieldSize::NullTerminated => bytes.len() + 1,
                prefixed => prefixed.prefix_len() + bytes.len(),
            },
            Segment::Fill { width, .. } => *width,
        }
    }

    fn write_to(&self, out: &mut Vec<u8>) {
        match self {
            Segment::Raw { bytes, size, is_last } => {
                let prefix = size.prefix_len();
                if !is_last && prefix > 0 {
                    let len = (bytes.len() as u32).to_be_bytes();
                    out.extend_from_slice(&len[4 - prefix..]);
                }
                out.extend_from_slice(bytes);
                if !is_last && *size == FieldSize::NullTerminated {
                    out.push(0);
                }
            }
            Segment::Fill { width, byte } => out.resize(out.len() + width, *byte),
        }
    }
}

struct Encoded {
    bytes: Vec<u8>,
    truncated: bool,
}

impl Entry {
    /// Build an entry from explicit field values
    pub fn new(values: &[FieldValue]) -> Self {
        values.iter().cloned().collect()
    }

    /// Combine two entries; `second` wins on conflict
    pub fn merge(first: &Entry, second: &Entry) -> Self {
        let mut values = first.values.clone();
        values.extend(second.values.iter().map(|(f, v)| (f.clone(), v.clone())));
        Self { values }
    }

    /// Decode an entry from bytes laid out by `columns`
    ///
    /// The columns must consume the bytes exactly.
    pub fn decode(bytes: &[u8], columns: &[Column]) -> Result<Self> {
        let mut values = HashMap::with_capacity(columns.len());
        let mut position = 0;

        for (i, column) in columns.iter().enumerate() {
            let is_last = i + 1 == columns.len();
            let field = column.field();
            let located = span(bytes, position, column.size(), is_last).ok_or_else(|| {
                StoreError::Malformed(format!(
                    "field <{}> at offset {} runs past {} bytes",
                    field.uri(),
                    position,
                    bytes.len()
                ))
            })?;
            values.insert(
                field.clone(),
                field.decode(&bytes[located.start..located.end()])?,
            );
            position = located.next;
        }

        if position != bytes.len() {
            return Err(StoreError::Malformed(format!(
                "{} trailing bytes after {} fields",
                bytes.len() - position,
                columns.len()
            )));
        }
        Ok(Self { values })
    }

    pub fn get(&self, field: &Field) -> Option<&Value> {
        self.values.get(field)
    }

    pub fn contains(&self, field: &Field) -> bool {
        self.values.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Field, &Value)> {
        self.values.iter()
    }

    /// Every column's field is present
    pub fn contains_fields(&self, columns: &[Column]) -> bool {
        columns.iter().all(|c| self.values.contains_key(c.field()))
    }

    /// Every column's field is present and equal to the column literal, if any
    pub fn contains_field_values(&self, columns: &[Column]) -> bool {
        columns.iter().all(|c| match (self.values.get(c.field()), c.literal()) {
            (None, _) => false,
            (Some(value), Some(literal)) => value == literal,
            (Some(_), None) => true,
        })
    }

    /// Entry restricted to the fields of `columns`
    pub fn project(&self, columns: &[Column]) -> Self {
        let values = columns
            .iter()
            .filter_map(|c| {
                let field = c.field();
                self.values.get(field).map(|v| (field.clone(), v.clone()))
            })
            .collect();
        Self { values }
    }

    /// Encode the fields of `columns`; every field must be present
    pub fn to_bytes(&self, columns: &[Column]) -> Result<Vec<u8>> {
        Ok(self.encode(columns, Mode::Plain)?.bytes)
    }

    /// Synthesize a scan bound
    ///
    /// `stop == false` gives the inclusive lower bound, `stop == true` the
    /// exclusive upper bound. `None` means the upper end is unbounded.
    pub fn to_range_bytes(&self, columns: &[Column], stop: bool) -> Result<Option<Vec<u8>>> {
        if !stop {
            return Ok(Some(self.encode(columns, Mode::Lower)?.bytes));
        }

        let Encoded { mut bytes, truncated } = self.encode(columns, Mode::Upper)?;
        if truncated {
            return Ok(prefix_successor(&bytes));
        }
        bytes.push(0);
        Ok(Some(bytes))
    }

    pub fn lower_bound(&self, columns: &[Column]) -> Result<Vec<u8>> {
        Ok(self.encode(columns, Mode::Lower)?.bytes)
    }

    pub fn upper_bound(&self, columns: &[Column]) -> Result<Option<Vec<u8>>> {
        self.to_range_bytes(columns, true)
    }

    fn encode(&self, columns: &[Column], mode: Mode) -> Result<Encoded> {
        let mut segments = Vec::with_capacity(columns.len());
        let mut truncated = false;

        // Pass 1: pre-encode every field
        for (i, column) in columns.iter().enumerate() {
            let is_last = i + 1 == columns.len();
            let field = column.field();
            let size = column.size();

            let value = self.values.get(field).or_else(|| column.literal()).or_else(|| {
                match (column, mode) {
                    (Column::Range(range), Mode::Lower) => range.min(),
                    (Column::Range(range), Mode::Upper) => range.max(),
                    _ => None,
                }
            });

            let Some(value) = value else {
                match (mode, size) {
                    (Mode::Plain, _) => {
                        return Err(StoreError::FieldEncoding(format!(
                            "field <{}> has no value",
                            field.uri()
                        )))
                    }
                    (Mode::Lower, FieldSize::Fixed(width)) => {
                        segments.push(Segment::Fill { width, byte: 0x00 })
                    }
                    (Mode::Upper, FieldSize::Fixed(width)) => {
                        segments.push(Segment::Fill { width, byte: 0xFF })
                    }
                    _ => {
                        truncated = true;
                        break;
                    }
                }
                continue;
            };

            let mut bytes = Vec::new();
            field.encode(value, &mut bytes)?;
            check_variable(field, size, is_last, &bytes)?;
            segments.push(Segment::Raw { bytes, size, is_last });
        }

        // Pass 2: total length
        let len: usize = segments.iter().map(Segment::len).sum();

        // Pass 3: write
        let mut out = Vec::with_capacity(len + 1);
        for segment in &segments {
            segment.write_to(&mut out);
        }
        Ok(Encoded {
            bytes: out,
            truncated,
        })
    }
}

fn check_variable(field: &Field, size: FieldSize, is_last: bool, bytes: &[u8]) -> Result<()> {
    if is_last {
        return Ok(());
    }
    match size {
        FieldSize::NullTerminated if bytes.contains(&0) => Err(StoreError::FieldEncoding(
            format!("field <{}> is null-terminated but contains 0x00", field.uri()),
        )),
        FieldSize::Prefixed1 | FieldSize::Prefixed2 | FieldSize::Prefixed4
            if bytes.len() > size.max_len() =>
        {
            Err(StoreError::FieldEncoding(format!(
                "field <{}> value of {} bytes overflows a {}-byte length prefix",
                field.uri(),
                bytes.len(),
                size.prefix_len()
            )))
        }
        _ => Ok(()),
    }
}

impl FromIterator<FieldValue> for Entry {
    fn from_iter<I: IntoIterator<Item = FieldValue>>(iter: I) -> Self {
        let values = iter
            .into_iter()
            .map(|fv| (fv.field().clone(), fv.value().clone()))
            .collect();
        Self { values }
    }
}

impl From<&[FieldValue]> for Entry {
    fn from(values: &[FieldValue]) -> Self {
        Entry::new(values)
    }
}
