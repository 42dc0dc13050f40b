use std::borrow::Cow;

use rustc_hash::FxHashMap;

use crate::errors::{DecodeError, ErrorKind};
use crate::field::{Field, FieldKind, WireValue};
use crate::wire::{read_fixed32, read_fixed64, read_span, read_varint, split_tag, WireType};

/// Specifies how length-delimited values are stored when decoding.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum BufferMode {
    /// Copy each length-delimited value into a buffer owned by the message.
    ///
    /// The message does not depend on the input buffer once decoding has
    /// finished.
    #[default]
    Copy,

    /// Store length-delimited values as views into the input buffer.
    ///
    /// This avoids copies, but the message borrows the input buffer for its
    /// whole lifetime, and the buffer cannot be modified while the message is
    /// alive.
    Borrow,
}

/// Specifies what happens when a field occurs with a wire type whose kind
/// differs from that of its first occurrence.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum KindConflict {
    /// Skip the conflicting occurrence and continue decoding.
    ///
    /// Skipped occurrences are counted by [`Message::ignored_occurrences`].
    #[default]
    KeepFirst,

    /// Stop decoding and report [`ErrorKind::FieldKindConflict`].
    Fail,
}

/// Options that control decoding of a [`Message`].
///
/// Embedded messages are decoded with the options of their parent.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Whether length-delimited values are copied or borrowed.
    pub mode: BufferMode,

    /// How to handle a field that occurs with different wire types.
    pub on_kind_conflict: KindConflict,
}

impl DecodeOptions {
    pub(crate) fn into_copy(self) -> Self {
        Self {
            mode: BufferMode::Copy,
            ..self
        }
    }
}

/// A message decoded without a schema.
///
/// A message maps field numbers to [`Field`]s holding every occurrence of
/// that field number. Values are stored in their wire representation and
/// converted to logical types by accessors such as
/// [`get_uint64`](Message::get_uint64) or [`get_string`](Message::get_string).
///
/// Singular accessors return the _first_ occurrence of a field. Array
/// accessors (`get_*_array`) return all occurrences in wire order. All
/// accessors return a default value (zero, empty string, `None`...) if a field
/// is missing or was stored with a different kind.
///
/// Embedded messages are not decoded until they are requested. See
/// [`get_message`](Message::get_message).
///
/// # Example
///
/// ```
/// use picoproto::Message;
///
/// let bytes = [
///     0x08, 0x96, 0x01, // field 1 = 150
///     0x12, 0x02, 0x68, 0x69, // field 2 = "hi"
///     0x1a, 0x03, 0x08, 0x96, 0x01, // field 3 = { field 1 = 150 }
/// ];
/// let mut message = Message::new();
/// message.parse_from_bytes(&bytes)?;
///
/// assert_eq!(message.get_uint64(1), 150);
/// assert_eq!(message.get_string(2), "hi");
/// assert_eq!(message.get_message(3).map(|m| m.get_uint64(1)), Some(150));
/// # Ok::<_, picoproto::DecodeError>(())
/// ```
///
/// # Borrowed buffers
///
/// In [`BufferMode::Borrow`] mode the message refers to the input buffer, so
/// the buffer cannot be modified while the message is in use:
///
/// ```compile_fail
/// use picoproto::{BufferMode, DecodeOptions, Message};
///
/// let mut bytes = vec![0x12, 0x07, b't', b'e', b's', b't', b'i', b'n', b'g'];
/// let mut message = Message::with_options(DecodeOptions {
///     mode: BufferMode::Borrow,
///     ..Default::default()
/// });
/// message.parse_from_bytes(&bytes).unwrap();
/// bytes[2] = b'p';
/// assert_eq!(message.get_string(2), "pesting");
/// ```
#[derive(Clone, Debug, Default)]
pub struct Message<'a> {
    /// Fields in order of first occurrence.
    fields: Vec<(i32, Field<'a>)>,

    /// Map of field number to index in `fields`.
    index: FxHashMap<i32, usize>,

    options: DecodeOptions,

    /// Number of occurrences skipped due to a kind conflict.
    ignored: usize,

    /// Error that stopped a decode pass.
    error: Option<DecodeError>,
}

impl<'a> Message<'a> {
    /// Create an empty message which copies length-delimited values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty message which is decoded using the given options.
    pub fn with_options(options: DecodeOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// Decode a message from `buf`.
    ///
    /// This is a convenience wrapper around
    /// [`parse_from_bytes`](Message::parse_from_bytes) for callers that don't
    /// use partially decoded messages.
    pub fn decode(buf: &'a [u8], options: DecodeOptions) -> Result<Self, DecodeError> {
        let mut message = Self::with_options(options);
        message.parse_from_bytes(buf)?;
        Ok(message)
    }

    /// Decode fields from `buf` and add them to this message.
    ///
    /// Length-delimited values are copied or borrowed from `buf` according to
    /// the message's [`BufferMode`].
    ///
    /// If decoding fails, fields read before the point of failure remain
    /// available and the error is also stored in the message (see
    /// [`decode_error`](Message::decode_error)). Decoding more than one buffer
    /// into the same message appends occurrences, in the same way as decoding
    /// the concatenation of the buffers.
    pub fn parse_from_bytes(&mut self, buf: &'a [u8]) -> Result<(), DecodeError> {
        match self.options.mode {
            BufferMode::Copy => self.decode_fields(buf, |span| Cow::Owned(span.to_vec())),
            BufferMode::Borrow => self.decode_fields(buf, Cow::Borrowed),
        }
    }

    /// Variant of [`parse_from_bytes`](Message::parse_from_bytes) which
    /// always copies length-delimited values.
    ///
    /// Unlike `parse_from_bytes` the lifetime of `buf` is unrelated to the
    /// message, so `buf` may be modified or dropped afterwards.
    pub fn parse_from_bytes_copied(&mut self, buf: &[u8]) -> Result<(), DecodeError> {
        self.decode_fields(buf, |span| Cow::Owned(span.to_vec()))
    }

    /// Decode an embedded message stored in a field of a parent message.
    ///
    /// A message stored in a borrowed span borrows from the same buffer as
    /// its parent. A message stored in a span owned by the parent makes its
    /// own copies.
    pub(crate) fn decode_embedded(span: &Cow<'a, [u8]>, options: DecodeOptions) -> Self {
        match span {
            Cow::Borrowed(bytes) => {
                let mut message = Self::with_options(DecodeOptions {
                    mode: BufferMode::Borrow,
                    ..options
                });
                // Errors are retained by the message.
                let _ = message.parse_from_bytes(*bytes);
                message
            }
            Cow::Owned(bytes) => {
                let mut message = Self::with_options(options.into_copy());
                let _ = message.parse_from_bytes_copied(bytes);
                message
            }
        }
    }

    fn decode_fields<'b>(
        &mut self,
        buf: &'b [u8],
        store_span: impl Fn(&'b [u8]) -> Cow<'a, [u8]>,
    ) -> Result<(), DecodeError> {
        let result = self.decode_fields_impl(buf, store_span);
        if let Err(err) = &result {
            self.error.get_or_insert_with(|| err.clone());
        }
        result
    }

    fn decode_fields_impl<'b>(
        &mut self,
        buf: &'b [u8],
        store_span: impl Fn(&'b [u8]) -> Cow<'a, [u8]>,
    ) -> Result<(), DecodeError> {
        let mut pos = 0;
        while pos < buf.len() {
            let tag_pos = pos;
            let (tag, value_pos) = read_varint(buf, tag_pos)
                .map_err(|err| DecodeError::from(err).with_context(None, tag_pos))?;
            let (number, wire_type) = split_tag(tag);

            let number = i32::try_from(number).map_err(|_| {
                DecodeError::new(ErrorKind::InvalidFieldNumber(number)).with_context(None, tag_pos)
            })?;
            let wire_type = WireType::from_code(wire_type).ok_or_else(|| {
                DecodeError::new(ErrorKind::InvalidWireType(wire_type))
                    .with_context(Some(number), tag_pos)
            })?;

            let (value, end) = match wire_type {
                WireType::Varint => {
                    read_varint(buf, value_pos).map(|(val, end)| (WireValue::Uint64(val), end))
                }
                WireType::I64 => {
                    read_fixed64(buf, value_pos).map(|(val, end)| (WireValue::Uint64(val), end))
                }
                WireType::Len => read_varint(buf, value_pos)
                    .and_then(|(len, start)| read_span(buf, start, len))
                    .map(|(span, end)| (WireValue::Span(span), end)),
                WireType::I32 => {
                    read_fixed32(buf, value_pos).map(|(val, end)| (WireValue::Uint32(val), end))
                }
            }
            .map_err(|err| DecodeError::from(err).with_context(Some(number), value_pos))?;
            pos = end;

            let field_index = match self.index.get(&number).copied() {
                Some(index) => index,
                None => {
                    self.index.insert(number, self.fields.len());
                    self.fields
                        .push((number, Field::new(value, self.options, &store_span)));
                    continue;
                }
            };

            let field = &mut self.fields[field_index].1;
            if !field.accepts(value.kind()) {
                match self.options.on_kind_conflict {
                    KindConflict::KeepFirst => {
                        self.ignored += 1;
                        continue;
                    }
                    KindConflict::Fail => {
                        let kind = ErrorKind::FieldKindConflict {
                            expected: field.kind(),
                            actual: value.kind(),
                        };
                        return Err(DecodeError::new(kind).with_context(Some(number), tag_pos));
                    }
                }
            }
            if field.push(value, &store_span).is_err() {
                self.ignored += 1;
            }
        }
        Ok(())
    }

    /// Return the options used to decode this message.
    pub fn options(&self) -> DecodeOptions {
        self.options
    }

    /// Return the error that stopped decoding of this message, if any.
    ///
    /// This is mainly useful for embedded messages, which are decoded
    /// on demand by accessors that don't report errors.
    pub fn decode_error(&self) -> Option<&DecodeError> {
        self.error.as_ref()
    }

    /// Return the number of field occurrences that were skipped because their
    /// kind differed from the first occurrence of the same field.
    pub fn ignored_occurrences(&self) -> usize {
        self.ignored
    }

    /// Return the field with a given number, or `None` if it never occurred.
    pub fn field(&self, number: i32) -> Option<&Field<'a>> {
        self.index
            .get(&number)
            .map(|&index| &self.fields[index].1)
    }

    /// Return the kind of a field, or `None` if it never occurred.
    pub fn field_kind(&self, number: i32) -> Option<FieldKind> {
        self.field(number).map(|field| field.kind())
    }

    /// Return true if a field with the given number occurred.
    pub fn has_field(&self, number: i32) -> bool {
        self.index.contains_key(&number)
    }

    /// Iterate over `(number, field)` pairs in order of each field's first
    /// occurrence.
    pub fn fields(&self) -> impl ExactSizeIterator<Item = (i32, &Field<'a>)> {
        self.fields.iter().map(|(number, field)| (*number, field))
    }

    /// Return the number of distinct field numbers in this message.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Return true if no fields were decoded.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Convert this message into one which owns all of its data.
    ///
    /// Borrowed spans are copied. Embedded messages that have already been
    /// decoded are kept.
    pub fn into_owned(self) -> Message<'static> {
        Message {
            fields: self
                .fields
                .into_iter()
                .map(|(number, field)| (number, field.into_owned()))
                .collect(),
            index: self.index,
            options: self.options.into_copy(),
            ignored: self.ignored,
            error: self.error,
        }
    }
}
