//! Positional walker shared by record decoding and value matching.

use super::FieldSize;

/// Location of one field's value inside an encoded record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Span {
    /// First value byte
    pub start: usize,
    /// Value length, excluding terminator and prefix
    pub len: usize,
    /// Cursor position after this field
    pub next: usize,
}

impl Span {
    pub fn end(&self) -> usize {
        self.start + self.len
    }
}

/// Locate the field starting at `position`, or `None` if the bytes run out
pub(crate) fn span(bytes: &[u8], position: usize, size: FieldSize, is_last: bool) -> Option<Span> {
    let remaining = bytes.len().checked_sub(position)?;

    match size {
        FieldSize::Fixed(width) => (width <= remaining).then_some(Span {
            start: position,
            len: width,
            next: position + width,
        }),
        _ if is_last => Some(Span {
            start: position,
            len: remaining,
            next: bytes.len(),
        }),
        FieldSize::NullTerminated => {
            let len = bytes[position..].iter().position(|&b| b == 0)?;
            Some(Span {
                start: position,
                len,
                next: position + len + 1,
            })
        }
        FieldSize::Prefixed1 | FieldSize::Prefixed2 | FieldSize::Prefixed4 => {
            let prefix = size.prefix_len();
            if remaining < prefix {
                return None;
            }
            let len = bytes[position..position + prefix]
                .iter()
                .fold(0usize, |acc, &b| (acc << 8) | b as usize);
            if remaining - prefix < len {
                return None;
            }
            Some(Span {
                start: position + prefix,
                len,
                next: position + prefix + len,
            })
        }
    }
}
