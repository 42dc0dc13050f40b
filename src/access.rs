//! Typed accessors for decoded fields.
//!
//! Values are stored in their wire representation. The accessors in this
//! module reinterpret them as the logical type requested by the caller:
//!
//! | Accessor | Stored as | Conversion |
//! |---|---|---|
//! | `uint32`, `uint64` | 32-bit, varint / 64-bit | none |
//! | `int32`, `int64` | 32-bit, varint / 64-bit | ZigZag decoding |
//! | `int` | any integer | two's complement |
//! | `bool` | varint / 64-bit | `value != 0` |
//! | `float`, `double` | 32-bit, 64-bit | IEEE 754 bit pattern |
//! | `bytes`, `string` | length-delimited | none, lossy UTF-8 |
//! | `message` | length-delimited | decoded on demand |
//!
//! Signed accessors always apply ZigZag decoding, which matches the `sint32`
//! and `sint64` schema types. Use `int` to read `int32` / `int64` values,
//! which use a two's complement encoding.

use std::borrow::Cow;

use crate::field::{Field, FieldValues};
use crate::message::Message;
use crate::wire::{zigzag_decode32, zigzag_decode64};

/// Generate accessors for a scalar type stored in one of the integer
/// representations of a field.
///
/// For each type this generates:
///
///  - An indexed accessor on [`Field`], returning `None` if the index is out
///    of range or the field has another kind
///  - A singular accessor on [`Message`] which returns the first occurrence
///    or a default value
///  - An array accessor on [`Message`] which returns all occurrences
macro_rules! impl_scalar_accessors {
    ($($ty:ty, $desc:literal, $values:ident, $convert:expr, $at:ident, $get:ident, $get_array:ident;)*) => {
        impl Field<'_> {
            $(
                #[doc = concat!("Return occurrence `index` of this field as ", $desc, ".")]
                pub fn $at(&self, index: usize) -> Option<$ty> {
                    self.$values().get(index).copied().map($convert)
                }
            )*
        }

        impl Message<'_> {
            $(
                #[doc = concat!("Return the first occurrence of field `number` as ", $desc, ".")]
                #[doc = ""]
                #[doc = "Returns the default value if the field is missing or has another kind."]
                pub fn $get(&self, number: i32) -> $ty {
                    self.field(number)
                        .and_then(|field| field.$at(0))
                        .unwrap_or_default()
                }

                #[doc = concat!("Return all occurrences of field `number` as ", $desc, ".")]
                pub fn $get_array(&self, number: i32) -> Vec<$ty> {
                    self.field(number)
                        .map(|field| field.$values().iter().copied().map($convert).collect())
                        .unwrap_or_default()
                }
            )*
        }
    };
}

impl_scalar_accessors!(
    u32, "a `uint32` or `fixed32`", uint32_values, |x| x, uint32, get_uint32, get_uint32_array;
    u64, "a `uint64` or `fixed64`", uint64_values, |x| x, uint64, get_uint64, get_uint64_array;
    i32, "a ZigZag-encoded 32-bit integer", uint32_values, zigzag_decode32, int32, get_int32, get_int32_array;
    i64, "a ZigZag-encoded 64-bit integer", uint64_values, zigzag_decode64, int64, get_int64, get_int64_array;
    bool, "a `bool`", uint64_values, |x| x != 0, bool, get_bool, get_bool_array;
    f32, "a `float`", uint32_values, f32::from_bits, float, get_float, get_float_array;
    f64, "a `double`", uint64_values, f64::from_bits, double, get_double, get_double_array;
);

impl<'a> Field<'a> {
    /// Return occurrence `index` of an integer field as a two's complement
    /// signed value.
    ///
    /// 32-bit values are sign-extended.
    pub fn int(&self, index: usize) -> Option<i64> {
        match &self.values {
            FieldValues::Uint64(values) => values.get(index).map(|&x| x as i64),
            FieldValues::Uint32(values) => values.get(index).map(|&x| x as i32 as i64),
            FieldValues::Bytes(_) => None,
        }
    }

    /// Return occurrence `index` of a length-delimited field as bytes.
    pub fn bytes(&self, index: usize) -> Option<&[u8]> {
        self.spans().get(index).map(|span| span.as_ref())
    }

    /// Return occurrence `index` of a length-delimited field as a string.
    ///
    /// The bytes are not required to be valid UTF-8. Invalid sequences are
    /// replaced with `U+FFFD`. Valid strings are returned without copying.
    pub fn string(&self, index: usize) -> Option<Cow<'_, str>> {
        self.bytes(index).map(String::from_utf8_lossy)
    }

    /// Return occurrence `index` of a length-delimited field as an embedded
    /// message.
    ///
    /// See [`messages`](Field::messages).
    pub fn message(&self, index: usize) -> Option<&Message<'a>> {
        self.messages().get(index)
    }
}

impl<'a> Message<'a> {
    /// Return the first occurrence of an integer field as a two's complement
    /// signed value.
    ///
    /// Unlike [`get_int64`](Message::get_int64) this does not apply ZigZag
    /// decoding, so it is suitable for `int32` and `int64` fields.
    pub fn get_int(&self, number: i32) -> i64 {
        self.field(number)
            .and_then(|field| field.int(0))
            .unwrap_or_default()
    }

    /// Return all occurrences of an integer field as two's complement signed
    /// values.
    pub fn get_int_array(&self, number: i32) -> Vec<i64> {
        let Some(field) = self.field(number) else {
            return Vec::new();
        };
        (0..field.len()).filter_map(|i| field.int(i)).collect()
    }

    /// Return the first occurrence of a length-delimited field, or an empty
    /// slice.
    pub fn get_bytes(&self, number: i32) -> &[u8] {
        self.field(number)
            .and_then(|field| field.bytes(0))
            .unwrap_or_default()
    }

    /// Return all occurrences of a length-delimited field.
    pub fn get_byte_array(&self, number: i32) -> Vec<&[u8]> {
        self.field(number)
            .map(|field| field.spans().iter().map(|span| span.as_ref()).collect())
            .unwrap_or_default()
    }

    /// Return the first occurrence of a length-delimited field as a string,
    /// or an empty string.
    ///
    /// See [`Field::string`].
    pub fn get_string(&self, number: i32) -> Cow<'_, str> {
        self.field(number)
            .and_then(|field| field.string(0))
            .unwrap_or_default()
    }

    /// Return all occurrences of a length-delimited field as strings.
    pub fn get_string_array(&self, number: i32) -> Vec<Cow<'_, str>> {
        self.field(number)
            .map(|field| {
                field
                    .spans()
                    .iter()
                    .map(|span| String::from_utf8_lossy(span))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Return the first occurrence of a length-delimited field as an embedded
    /// message, or `None` if the field is missing or has another kind.
    ///
    /// Embedded messages are decoded the first time they are requested and
    /// cached, so repeated calls return the same message. Decoding errors do
    /// not cause this to return `None`. Instead the message contains the
    /// fields decoded before the error and reports it via
    /// [`decode_error`](Message::decode_error).
    pub fn get_message(&self, number: i32) -> Option<&Message<'a>> {
        self.field(number).and_then(|field| field.message(0))
    }

    /// Return all occurrences of a length-delimited field as embedded
    /// messages.
    pub fn get_message_array(&self, number: i32) -> &[Message<'a>] {
        self.field(number)
            .map(|field| field.messages())
            .unwrap_or_default()
    }
}
