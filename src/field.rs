use std::borrow::Cow;
use std::cell::OnceCell;
use std::fmt::{Display, Formatter};

use smallvec::SmallVec;

use crate::message::{DecodeOptions, Message};
use crate::wire::WireType;

/// The representation in which the values of a field are stored.
///
/// The kind of a field is fixed by the wire type of its first occurrence in
/// a message.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FieldKind {
    /// Varint and 64-bit fixed-width values.
    Uint64,
    /// 32-bit fixed-width values.
    Uint32,
    /// Length-delimited values: bytes, strings and embedded messages.
    Bytes,
}

impl FieldKind {
    /// Return the kind of field that stores values of a given wire type.
    pub fn for_wire_type(wire_type: WireType) -> Self {
        match wire_type {
            WireType::Varint | WireType::I64 => Self::Uint64,
            WireType::I32 => Self::Uint32,
            WireType::Len => Self::Bytes,
        }
    }
}

impl Display for FieldKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Uint64 => "uint64",
            Self::Uint32 => "uint32",
            Self::Bytes => "bytes",
        };
        f.write_str(name)
    }
}

/// A single value as read from the wire, before it is stored in a field.
pub(crate) enum WireValue<'b> {
    Uint64(u64),
    Uint32(u32),
    Span(&'b [u8]),
}

impl WireValue<'_> {
    pub(crate) fn kind(&self) -> FieldKind {
        match self {
            Self::Uint64(_) => FieldKind::Uint64,
            Self::Uint32(_) => FieldKind::Uint32,
            Self::Span(_) => FieldKind::Bytes,
        }
    }
}

/// Stored values of a field. Most fields occur once, so values are stored
/// inline until a field repeats.
#[derive(Clone, Debug)]
pub(crate) enum FieldValues<'a> {
    Uint64(SmallVec<[u64; 1]>),
    Uint32(SmallVec<[u32; 1]>),

    /// Spans are either copies owned by the field or views into the buffer
    /// the message was decoded from.
    Bytes(SmallVec<[Cow<'a, [u8]>; 1]>),
}

/// All occurrences of one field number in a message, in wire order.
///
/// Fields are created by decoding a [`Message`] and accessed via
/// [`Message::field`] or [`Message::fields`]. The typed accessors of a field
/// take an occurrence index and return `None` if the index is out of range or
/// if the field's [kind](Field::kind) doesn't match the requested type.
#[derive(Clone, Debug)]
pub struct Field<'a> {
    pub(crate) values: FieldValues<'a>,

    /// Embedded messages decoded from `values`, one per span.
    ///
    /// This is populated the first time an embedded message is requested and
    /// is immutable afterwards.
    messages: OnceCell<Box<[Message<'a>]>>,

    /// Options inherited by embedded messages.
    options: DecodeOptions,
}

impl<'a> Field<'a> {
    /// Create a field from its first occurrence.
    pub(crate) fn new<'b>(
        value: WireValue<'b>,
        options: DecodeOptions,
        store_span: impl FnOnce(&'b [u8]) -> Cow<'a, [u8]>,
    ) -> Self {
        let values = match value {
            WireValue::Uint64(val) => FieldValues::Uint64(SmallVec::from_buf([val])),
            WireValue::Uint32(val) => FieldValues::Uint32(SmallVec::from_buf([val])),
            WireValue::Span(span) => FieldValues::Bytes(SmallVec::from_buf([store_span(span)])),
        };
        Field {
            values,
            messages: OnceCell::new(),
            options,
        }
    }

    /// Append an occurrence of this field.
    ///
    /// Returns `Err(kind)` with the kind of this field if `value` has a
    /// different kind. In that case the field is unchanged.
    pub(crate) fn push<'b>(
        &mut self,
        value: WireValue<'b>,
        store_span: impl FnOnce(&'b [u8]) -> Cow<'a, [u8]>,
    ) -> Result<(), FieldKind> {
        let kind = self.kind();
        match (&mut self.values, value) {
            (FieldValues::Uint64(values), WireValue::Uint64(val)) => values.push(val),
            (FieldValues::Uint32(values), WireValue::Uint32(val)) => values.push(val),
            (FieldValues::Bytes(values), WireValue::Span(span)) => {
                values.push(store_span(span));

                // Cached messages no longer line up with the spans.
                self.messages.take();
            }
            _ => return Err(kind),
        }
        Ok(())
    }

    /// Return true if values of kind `value_kind` can be added to this field.
    pub(crate) fn accepts(&self, value_kind: FieldKind) -> bool {
        self.kind() == value_kind
    }

    /// Return the representation in which values of this field are stored.
    pub fn kind(&self) -> FieldKind {
        match self.values {
            FieldValues::Uint64(_) => FieldKind::Uint64,
            FieldValues::Uint32(_) => FieldKind::Uint32,
            FieldValues::Bytes(_) => FieldKind::Bytes,
        }
    }

    /// Return the number of occurrences of this field.
    pub fn len(&self) -> usize {
        match &self.values {
            FieldValues::Uint64(values) => values.len(),
            FieldValues::Uint32(values) => values.len(),
            FieldValues::Bytes(values) => values.len(),
        }
    }

    /// Return true if the field has no occurrences.
    ///
    /// Fields created by decoding always have at least one.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the raw values of a varint or 64-bit field, or an empty slice
    /// for other kinds.
    pub fn uint64_values(&self) -> &[u64] {
        match &self.values {
            FieldValues::Uint64(values) => values.as_slice(),
            _ => &[],
        }
    }

    /// Return the raw values of a 32-bit field, or an empty slice for other
    /// kinds.
    pub fn uint32_values(&self) -> &[u32] {
        match &self.values {
            FieldValues::Uint32(values) => values.as_slice(),
            _ => &[],
        }
    }

    /// Return the spans of a length-delimited field, or an empty slice for
    /// other kinds.
    pub(crate) fn spans(&self) -> &[Cow<'a, [u8]>] {
        match &self.values {
            FieldValues::Bytes(values) => values.as_slice(),
            _ => &[],
        }
    }

    /// Return the embedded messages decoded from each occurrence of a
    /// length-delimited field.
    ///
    /// Messages are decoded on the first call and cached, so subsequent calls
    /// return the same messages. An occurrence which is not a valid message
    /// yields the fields decoded before the error, and the error is available
    /// from [`Message::decode_error`]. Fields of other kinds return an empty
    /// slice.
    pub fn messages(&self) -> &[Message<'a>] {
        if self.kind() != FieldKind::Bytes {
            return &[];
        }
        self.messages.get_or_init(|| {
            self.spans()
                .iter()
                .map(|span| Message::decode_embedded(span, self.options))
                .collect()
        })
    }

    /// Return true if embedded messages have been decoded for this field.
    pub fn has_cached_messages(&self) -> bool {
        self.messages.get().is_some()
    }

    /// Convert this field into one which owns all of its spans.
    pub(crate) fn into_owned(self) -> Field<'static> {
        let values = match self.values {
            FieldValues::Uint64(values) => FieldValues::Uint64(values),
            FieldValues::Uint32(values) => FieldValues::Uint32(values),
            FieldValues::Bytes(values) => FieldValues::Bytes(
                values
                    .into_iter()
                    .map(|span| Cow::Owned(span.into_owned()))
                    .collect(),
            ),
        };

        let messages = OnceCell::new();
        if let Some(cached) = self.messages.into_inner() {
            let _ = messages.set(
                cached
                    .into_vec()
                    .into_iter()
                    .map(Message::into_owned)
                    .collect(),
            );
        }

        Field {
            values,
            messages,
            options: self.options.into_copy(),
        }
    }
}
