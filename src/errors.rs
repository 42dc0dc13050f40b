use std::error::Error;
use std::fmt::{Display, Formatter};

use crate::field::FieldKind;
use crate::wire::WireError;

/// Errors decoding a Protocol Buffers message.
///
/// A decode error stops the decode pass, but fields decoded before the error
/// remain available on the [`Message`](crate::Message).
#[derive(Clone, Debug, PartialEq)]
pub struct DecodeError {
    kind: ErrorKind,
    field: Option<i32>,
    offset: usize,
}

impl DecodeError {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            field: None,
            offset: 0,
        }
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Return the number of the field that was being decoded, if the error
    /// occurred after its tag was read.
    pub fn field(&self) -> Option<i32> {
        self.field
    }

    /// Return the byte offset of the tag or value that failed to decode.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Associate a field number and byte offset with this error.
    pub fn with_context(mut self, field: Option<i32>, offset: usize) -> Self {
        self.field = field;
        self.offset = offset;
        self
    }
}

impl Display for DecodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.field {
            Some(field) => write!(
                f,
                "error in field {} at offset {}: {}",
                field, self.offset, self.kind
            ),
            None => write!(f, "error at offset {}: {}", self.offset, self.kind),
        }
    }
}

impl Error for DecodeError {}

impl From<WireError> for DecodeError {
    fn from(val: WireError) -> Self {
        match val {
            WireError::Truncated => Self::new(ErrorKind::Truncated),
            WireError::InvalidVarint => Self::new(ErrorKind::InvalidVarint),
        }
    }
}

/// Enum describing the kind of a [`DecodeError`].
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The buffer ended in the middle of a tag or value, or a
    /// length-delimited field declared more bytes than remain.
    Truncated,

    /// A varint value was encountered that contains more than 64 bits of
    /// value data.
    InvalidVarint,

    /// A field has an unsupported wire type.
    ///
    /// Protocol Buffers uses 3 bits to encode wire types. Only varint (0),
    /// 64-bit (1), length-delimited (2) and 32-bit (5) values are supported.
    InvalidWireType(u8),

    /// A tag specified a field number that doesn't fit in an `i32`.
    InvalidFieldNumber(u64),

    /// A field occurred with a wire type whose kind differs from the kind
    /// established by its first occurrence.
    ///
    /// This is only reported when decoding with
    /// [`KindConflict::Fail`](crate::KindConflict::Fail).
    FieldKindConflict {
        expected: FieldKind,
        actual: FieldKind,
    },
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Truncated => write!(f, "unexpected end of buffer"),
            ErrorKind::InvalidVarint => write!(f, "invalid varint"),
            ErrorKind::InvalidWireType(wire_type) => write!(f, "invalid wire type {wire_type}"),
            ErrorKind::InvalidFieldNumber(number) => write!(f, "invalid field number {number}"),
            ErrorKind::FieldKindConflict { expected, actual } => {
                write!(f, "field kind conflict: expected {expected}, found {actual}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{DecodeError, ErrorKind};
    use crate::field::FieldKind;
    use crate::wire::WireError;

    #[test]
    fn test_display() {
        let err = DecodeError::new(ErrorKind::Truncated).with_context(Some(3), 7);
        assert_eq!(
            err.to_string(),
            "error in field 3 at offset 7: unexpected end of buffer"
        );

        let err = DecodeError::new(ErrorKind::InvalidWireType(6)).with_context(None, 2);
        assert_eq!(err.to_string(), "error at offset 2: invalid wire type 6");

        let err = DecodeError::new(ErrorKind::FieldKindConflict {
            expected: FieldKind::Uint64,
            actual: FieldKind::Bytes,
        });
        assert_eq!(
            err.to_string(),
            "error at offset 0: field kind conflict: expected uint64, found bytes"
        );
    }

    #[test]
    fn test_from_wire_error() {
        let err = DecodeError::from(WireError::InvalidVarint);
        assert_eq!(err.kind(), &ErrorKind::InvalidVarint);
        assert_eq!(err.field(), None);
    }
}
