//! Internal testing utilities for the picoproto crates.
//!
//! This provides table-driven test cases ([`TestCases`]) and a minimal
//! Protocol Buffers encoder ([`Encoder`]) for building test inputs.

use std::fmt::Debug;
use std::panic::RefUnwindSafe;

/// Utility for creating parametrized (aka. table-driven) tests.
///
/// To create a table driven test:
///
/// 1. Import the `TestCases` trait
/// 2. Create a struct, conventionally named `Case`, that contains the data
///    for a single test case. This struct must implement `Debug`.
/// 3. Create a collection of `Case` instances (eg. an array or Vec),
///    conventionally named `cases`.
/// 4. Call `cases.test_each`, passing the test function as a closure
///
/// `test_each` will run all of the test cases and catch any panics. If all
/// cases succeed (ie. run without panicking), `test_each` will return.
/// Otherwise it will panic with a message that includes the count and debug
/// representations of failing test cases.
///
/// ## Example
///
/// ```
/// use picoproto_testing::{encode_varint, TestCases};
///
/// // Add #[test] attribute
/// fn test_varint_len() {
///   #[derive(Debug)]
///   struct Case {
///     value: u64,
///     len: usize,
///   }
///
///   let cases = [
///     Case { value: 1, len: 1 },
///     Case { value: 150, len: 2 },
///   ];
///
///   cases.test_each(|&Case { value, len }| {
///     assert_eq!(encode_varint(value).len(), len);
///   });
/// }
/// # test_varint_len();
/// ```
///
/// ## Unwind safety
///
/// Both test cases and the test function are required to be
/// [unwind safe](https://doc.rust-lang.org/std/panic/fn.catch_unwind.html).
///
/// Values with interior mutability, such as decoded messages that cache
/// embedded messages, should be created within the test function rather than
/// captured by it.
pub trait TestCases {
    /// The data for a single test case.
    type Case;

    /// Call test function `test` with each test case in `self`, catching any panics.
    ///
    /// After all cases have been evaluated, return if no panics occurred or
    /// panic with details of failing cases otherwise.
    fn test_each(self, test: impl Fn(&Self::Case) + RefUnwindSafe)
    where
        Self::Case: Debug + RefUnwindSafe;
}

impl<I: IntoIterator> TestCases for I {
    type Case = I::Item;

    fn test_each(self, test: impl Fn(&I::Item) + RefUnwindSafe)
    where
        Self::Case: Debug + RefUnwindSafe,
    {
        let mut failures = Vec::new();
        for case in self {
            if std::panic::catch_unwind(|| {
                test(&case);
            })
            .is_err()
            {
                failures.push(case);
            }
        }
        assert_eq!(
            failures.len(),
            0,
            "{} test cases failed: {:?}",
            failures.len(),
            failures
        );
    }
}

/// Encode a value as a varint.
pub fn encode_varint(mut val: u64) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(10);

    loop {
        let mut byte = (val & 0x7f) as u8;
        if val <= 0x7f {
            bytes.push(byte);
            break;
        } else {
            byte |= 0x80;
            bytes.push(byte);
            val >>= 7;
        }
    }

    bytes
}

/// Builder for Protocol Buffers messages.
///
/// Each method appends one field occurrence with the given field number.
///
/// ```
/// use picoproto_testing::Encoder;
///
/// let bytes = Encoder::new().varint(1, 150).string(2, "testing").finish();
/// assert_eq!(bytes[..3], [0x08, 0x96, 0x01]);
/// ```
#[derive(Clone, Debug, Default)]
pub struct Encoder {
    buf: Vec<u8>,
}

impl Encoder {
    pub fn new() -> Self {
        Self::default()
    }

    fn tag(mut self, number: u64, wire_type: u64) -> Self {
        self.buf.extend(encode_varint((number << 3) | wire_type));
        self
    }

    /// Append a varint field.
    pub fn varint(self, number: u64, val: u64) -> Self {
        let mut enc = self.tag(number, 0);
        enc.buf.extend(encode_varint(val));
        enc
    }

    /// Append a ZigZag-encoded `sint64` field.
    pub fn sint64(self, number: u64, val: i64) -> Self {
        self.varint(number, ((val << 1) ^ (val >> 63)) as u64)
    }

    /// Append a 64-bit fixed-width field.
    pub fn fixed64(self, number: u64, val: u64) -> Self {
        let mut enc = self.tag(number, 1);
        enc.buf.extend(val.to_le_bytes());
        enc
    }

    /// Append a `double` field.
    pub fn double(self, number: u64, val: f64) -> Self {
        self.fixed64(number, val.to_bits())
    }

    /// Append a length-delimited field.
    pub fn bytes(self, number: u64, val: &[u8]) -> Self {
        let mut enc = self.tag(number, 2);
        enc.buf.extend(encode_varint(val.len() as u64));
        enc.buf.extend_from_slice(val);
        enc
    }

    /// Append a string field.
    pub fn string(self, number: u64, val: &str) -> Self {
        self.bytes(number, val.as_bytes())
    }

    /// Append an embedded message field.
    pub fn message(self, number: u64, msg: Encoder) -> Self {
        self.bytes(number, &msg.buf)
    }

    /// Append a 32-bit fixed-width field.
    pub fn fixed32(self, number: u64, val: u32) -> Self {
        let mut enc = self.tag(number, 5);
        enc.buf.extend(val.to_le_bytes());
        enc
    }

    /// Append a `float` field.
    pub fn float(self, number: u64, val: f32) -> Self {
        self.fixed32(number, val.to_bits())
    }

    /// Append raw bytes without a tag.
    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    /// Return the encoded message.
    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::{encode_varint, Encoder, TestCases};

    #[test]
    fn test_test_cases_success() {
        #[derive(Clone, Debug)]
        struct Case {
            x: i32,
        }

        let cases = [Case { x: 1 }, Case { x: 2 }];
        cases.test_each(|case| _ = case.x);
    }

    #[test]
    #[should_panic(expected = "2 test cases failed")]
    fn test_test_each_failure() {
        #[derive(Debug)]
        struct Case {
            x: i32,
        }

        let cases = [Case { x: 1 }, Case { x: 2 }];
        cases.test_each(|case| {
            _ = case.x;
            panic!("oh no");
        })
    }

    #[test]
    fn test_encode_varint() {
        assert_eq!(encode_varint(0), [0x00]);
        assert_eq!(encode_varint(150), [0x96, 0x01]);
        assert_eq!(encode_varint(u64::MAX).len(), 10);
    }

    #[test]
    fn test_encoder() {
        // Examples from https://protobuf.dev/programming-guides/encoding/.
        assert_eq!(Encoder::new().varint(1, 150).finish(), [0x08, 0x96, 0x01]);
        assert_eq!(
            Encoder::new().string(2, "testing").finish(),
            [0x12, 0x07, 0x74, 0x65, 0x73, 0x74, 0x69, 0x6e, 0x67]
        );
        assert_eq!(
            Encoder::new()
                .message(3, Encoder::new().varint(1, 150))
                .finish(),
            [0x1a, 0x03, 0x08, 0x96, 0x01]
        );
        assert_eq!(Encoder::new().sint64(1, -2).finish(), [0x08, 0x03]);
        assert_eq!(
            Encoder::new().fixed32(1, 1).finish(),
            [0x0d, 0x01, 0x00, 0x00, 0x00]
        );
    }
}
