//! Field Module
//!
//! Typed, identity-comparable column descriptors and their byte codecs.
//!
//! ## Size Policies
//! ```text
//! Fixed(n)        exactly n bytes
//! NullTerminated  value bytes, then 0x00
//! Prefixed1       u8 length (BE), then value bytes
//! Prefixed2       u16 length (BE), then value bytes
//! Prefixed4       u32 length (BE), then value bytes
//! ```
//! A variable-size field in the last position of a layout carries no
//! terminator or prefix; it owns the remaining bytes.
//!
//! ## Identity
//! A `Field` is an `Arc`'d descriptor. Equality and hashing use the
//! descriptor's address, never its contents: two fields built from the same
//! UUID are different members of a field set, while still hashing to the
//! same table identity (which is UUID based).

pub(crate) mod layout;
mod value;

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use uuid::Uuid;

use crate::blob::Blob;
use crate::error::{Result, StoreError};

pub use value::Value;

/// Byte-encoding policy of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSize {
    Fixed(usize),
    NullTerminated,
    Prefixed1,
    Prefixed2,
    Prefixed4,
}

impl FieldSize {
    pub fn is_variable(&self) -> bool {
        !matches!(self, FieldSize::Fixed(_))
    }

    /// Width of the length prefix (0 for fixed and null-terminated)
    pub fn prefix_len(&self) -> usize {
        match self {
            FieldSize::Prefixed1 => 1,
            FieldSize::Prefixed2 => 2,
            FieldSize::Prefixed4 => 4,
            FieldSize::Fixed(_) | FieldSize::NullTerminated => 0,
        }
    }

    /// Largest value length the prefix can express
    pub(crate) fn max_len(&self) -> usize {
        match self {
            FieldSize::Prefixed1 => u8::MAX as usize,
            FieldSize::Prefixed2 => u16::MAX as usize,
            FieldSize::Prefixed4 => u32::MAX as usize,
            FieldSize::Fixed(n) => *n,
            FieldSize::NullTerminated => usize::MAX,
        }
    }
}

/// Codec of a field: how values map to bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// 4-byte big-endian two's complement
    Int32,
    /// 8-byte big-endian two's complement
    Int64,
    /// 16 raw bytes
    Uuid,
    /// UTF-8 text under the given size policy
    Text(FieldSize),
    /// Raw bytes under the given size policy
    Bytes(FieldSize),
    /// Blob reference, length-prefixed (4 bytes)
    Blob,
}

impl FieldKind {
    pub fn size(&self) -> FieldSize {
        match self {
            FieldKind::Int32 => FieldSize::Fixed(4),
            FieldKind::Int64 => FieldSize::Fixed(8),
            FieldKind::Uuid => FieldSize::Fixed(16),
            FieldKind::Text(size) | FieldKind::Bytes(size) => *size,
            FieldKind::Blob => FieldSize::Prefixed4,
        }
    }
}

struct FieldDef {
    uuid: Uuid,
    uri: String,
    kind: FieldKind,
}

/// Immutable, shared column descriptor
#[derive(Clone)]
pub struct Field(Arc<FieldDef>);

impl Field {
    pub fn new(uuid: Uuid, uri: impl Into<String>, kind: FieldKind) -> Self {
        Self(Arc::new(FieldDef {
            uuid,
            uri: uri.into(),
            kind,
        }))
    }

    pub fn uuid(&self) -> &Uuid {
        &self.0.uuid
    }

    pub fn uri(&self) -> &str {
        &self.0.uri
    }

    pub fn kind(&self) -> FieldKind {
        self.0.kind
    }

    pub fn size(&self) -> FieldSize {
        self.0.kind.size()
    }

    /// Bind this field to a value
    pub fn value(&self, value: impl Into<Value>) -> FieldValue {
        FieldValue::new(self.clone(), value.into())
    }

    /// Bind this field to optional scan limits
    pub fn range(&self, min: Option<Value>, max: Option<Value>) -> FieldRange {
        FieldRange {
            field: self.clone(),
            min,
            max,
        }
    }

    /// Append the raw encoding of `value` (no terminator or prefix)
    pub fn encode(&self, value: &Value, out: &mut Vec<u8>) -> Result<()> {
        let start = out.len();
        match (self.kind(), value) {
            (FieldKind::Int32, Value::Int32(v)) => out.extend_from_slice(&v.to_be_bytes()),
            (FieldKind::Int64, Value::Int64(v)) => out.extend_from_slice(&v.to_be_bytes()),
            (FieldKind::Uuid, Value::Uuid(v)) => out.extend_from_slice(v.as_bytes()),
            (FieldKind::Text(_), Value::Text(v)) => out.extend_from_slice(v.as_bytes()),
            (FieldKind::Bytes(_), Value::Bytes(v)) => out.extend_from_slice(v),
            (FieldKind::Blob, Value::Blob(v)) => v.encode_reference(out),
            (kind, value) => {
                return Err(StoreError::FieldEncoding(format!(
                    "field <{}> of kind {:?} cannot hold a {} value",
                    self.uri(),
                    kind,
                    value.type_name()
                )))
            }
        }

        if let FieldSize::Fixed(width) = self.size() {
            let written = out.len() - start;
            if written != width {
                out.truncate(start);
                return Err(StoreError::FieldEncoding(format!(
                    "field <{}> is {} bytes wide, value encodes to {}",
                    self.uri(),
                    width,
                    written
                )));
            }
        }
        Ok(())
    }

    /// Decode a value from exactly the bytes of this field
    pub fn decode(&self, bytes: &[u8]) -> Result<Value> {
        let value = match self.kind() {
            FieldKind::Int32 => Value::Int32(i32::from_be_bytes(self.fixed::<4>(bytes)?)),
            FieldKind::Int64 => Value::Int64(i64::from_be_bytes(self.fixed::<8>(bytes)?)),
            FieldKind::Uuid => Value::Uuid(Uuid::from_bytes(self.fixed::<16>(bytes)?)),
            FieldKind::Text(_) => {
                let text = std::str::from_utf8(bytes).map_err(|e| {
                    StoreError::Malformed(format!("field <{}> is not UTF-8: {}", self.uri(), e))
                })?;
                Value::Text(text.to_string())
            }
            FieldKind::Bytes(_) => Value::Bytes(bytes.to_vec()),
            FieldKind::Blob => Value::Blob(Blob::decode_reference(bytes)?),
        };
        Ok(value)
    }

    fn fixed<const N: usize>(&self, bytes: &[u8]) -> Result<[u8; N]> {
        bytes.try_into().map_err(|_| {
            StoreError::Malformed(format!(
                "field <{}> expects {} bytes, got {}",
                self.uri(),
                N,
                bytes.len()
            ))
        })
    }
}

impl PartialEq for Field {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Field {}

impl Hash for Field {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.0) as usize).hash(state);
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.uri())
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.uri())
    }
}

/// A field bound to a concrete value
#[derive(Debug, Clone, PartialEq)]
pub struct FieldValue {
    field: Field,
    value: Value,
    size: FieldSize,
}

impl FieldValue {
    pub fn new(field: Field, value: Value) -> Self {
        let size = field.size();
        Self { field, value, size }
    }

    pub fn field(&self) -> &Field {
        &self.field
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Size policy captured when the value was bound
    pub fn size(&self) -> FieldSize {
        self.size
    }
}

/// A field bound to optional scan limits
#[derive(Debug, Clone, PartialEq)]
pub struct FieldRange {
    field: Field,
    min: Option<Value>,
    max: Option<Value>,
}

impl FieldRange {
    pub fn field(&self) -> &Field {
        &self.field
    }

    pub fn min(&self) -> Option<&Value> {
        self.min.as_ref()
    }

    pub fn max(&self) -> Option<&Value> {
        self.max.as_ref()
    }
}

/// One slot of a layout: a bare field, a literal, or a ranged field
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Field(Field),
    Value(FieldValue),
    Range(FieldRange),
}

impl Column {
    pub fn field(&self) -> &Field {
        match self {
            Column::Field(field) => field,
            Column::Value(value) => value.field(),
            Column::Range(range) => range.field(),
        }
    }

    pub fn size(&self) -> FieldSize {
        match self {
            Column::Value(value) => value.size(),
            other => other.field().size(),
        }
    }

    /// Literal carried by this column, if any
    pub fn literal(&self) -> Option<&Value> {
        match self {
            Column::Value(value) => Some(value.value()),
            _ => None,
        }
    }
}

impl From<Field> for Column {
    fn from(field: Field) -> Self {
        Column::Field(field)
    }
}

impl From<&Field> for Column {
    fn from(field: &Field) -> Self {
        Column::Field(field.clone())
    }
}

impl From<FieldValue> for Column {
    fn from(value: FieldValue) -> Self {
        Column::Value(value)
    }
}

impl From<&FieldValue> for Column {
    fn from(value: &FieldValue) -> Self {
        Column::Value(value.clone())
    }
}

impl From<FieldRange> for Column {
    fn from(range: FieldRange) -> Self {
        Column::Range(range)
    }
}
