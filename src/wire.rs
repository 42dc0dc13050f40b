//! Decode primitive values from Protocol Buffers encoded bytes.
//!
//! Every value in an encoded message is built from four primitives: variable
//! length integers (_varints_), 32-bit and 64-bit little-endian words, and
//! length-delimited byte spans. The functions in this module decode one
//! primitive starting at a position in a byte slice and return the value
//! together with the position just after it.
//!
//! See <https://protobuf.dev/programming-guides/encoding/>.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Maximum number of bytes for an encoded varint.
///
/// A decoded varint is a u64 value. Each byte contains 7 value bits and one
/// continuation bit. Hence we need 9 "full" bytes plus one bit from the 10th byte.
pub const MAX_VARINT_LEN: usize = 10;

/// Wire type of a field, stored in the low 3 bits of its tag.
///
/// See <https://protobuf.dev/programming-guides/encoding/#structure>.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum WireType {
    /// Integer value encoded as a varint.
    Varint,
    /// 64-bit fixed-width value.
    I64,
    /// A variable-length value with a size specified in bytes.
    Len,
    /// 32-bit fixed-width value.
    I32,
}

impl WireType {
    /// Map the 3-bit wire type code to a supported wire type.
    ///
    /// Returns `None` for the deprecated group markers (3, 4) and the two
    /// unused codes.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Varint),
            1 => Some(Self::I64),
            2 => Some(Self::Len),
            5 => Some(Self::I32),
            _ => None,
        }
    }

    /// Return the 3-bit code for this wire type.
    pub fn code(self) -> u8 {
        match self {
            Self::Varint => 0,
            Self::I64 => 1,
            Self::Len => 2,
            Self::I32 => 5,
        }
    }
}

/// Errors reading a primitive value.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum WireError {
    /// The buffer ended before the value was complete.
    Truncated,
    /// The varint length exceeds 64-bits.
    InvalidVarint,
}

impl Display for WireError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Truncated => write!(f, "unexpected end of buffer"),
            Self::InvalidVarint => write!(f, "invalid varint"),
        }
    }
}

impl Error for WireError {}

/// Read a varint value of up to 64-bits starting at `pos`.
///
/// This will read between one and ten bytes from `buf`.
pub fn read_varint(buf: &[u8], pos: usize) -> Result<(u64, usize), WireError> {
    let mut value = 0;
    let tail = buf.get(pos..).ok_or(WireError::Truncated)?;

    for (index, byte) in tail.iter().copied().take(MAX_VARINT_LEN).enumerate() {
        // High bit is continuation bit. Low 7 bits are the payload.
        value |= ((byte & 0x7f) as u64) << (index * 7);
        if byte <= 0x7f {
            // Only one value bit from the last byte may be used.
            if index + 1 == MAX_VARINT_LEN && byte > 0x01 {
                return Err(WireError::InvalidVarint);
            }
            return Ok((value, pos + index + 1));
        }
    }

    if tail.len() >= MAX_VARINT_LEN {
        Err(WireError::InvalidVarint)
    } else {
        Err(WireError::Truncated)
    }
}

/// Read exactly `N` bytes starting at `pos`.
fn read_array<const N: usize>(buf: &[u8], pos: usize) -> Result<([u8; N], usize), WireError> {
    let end = pos.checked_add(N).ok_or(WireError::Truncated)?;
    let bytes = buf.get(pos..end).ok_or(WireError::Truncated)?;
    let mut array = [0; N];
    array.copy_from_slice(bytes);
    Ok((array, end))
}

/// Read a 4-byte little-endian word.
pub fn read_fixed32(buf: &[u8], pos: usize) -> Result<(u32, usize), WireError> {
    let (bytes, end) = read_array::<4>(buf, pos)?;
    Ok((u32::from_le_bytes(bytes), end))
}

/// Read an 8-byte little-endian word.
pub fn read_fixed64(buf: &[u8], pos: usize) -> Result<(u64, usize), WireError> {
    let (bytes, end) = read_array::<8>(buf, pos)?;
    Ok((u64::from_le_bytes(bytes), end))
}

/// Return the `len` bytes starting at `pos`.
///
/// `len` is the raw length prefix of a length-delimited field, so it may be
/// larger than the address space.
pub fn read_span(buf: &[u8], pos: usize, len: u64) -> Result<(&[u8], usize), WireError> {
    let len = usize::try_from(len).map_err(|_| WireError::Truncated)?;
    let end = pos.checked_add(len).ok_or(WireError::Truncated)?;
    let span = buf.get(pos..end).ok_or(WireError::Truncated)?;
    Ok((span, end))
}

/// Split a field tag into a field number and a wire type code.
pub fn split_tag(tag: u64) -> (u64, u8) {
    (tag >> 3, (tag & 0x7) as u8)
}

/// Reverse the ZigZag mapping used for `sint64` values.
///
/// See <https://protobuf.dev/programming-guides/encoding/#signed-ints>.
pub fn zigzag_decode64(val: u64) -> i64 {
    ((val >> 1) as i64) ^ -((val & 1) as i64)
}

/// Reverse the ZigZag mapping used for `sint32` values.
pub fn zigzag_decode32(val: u32) -> i32 {
    ((val >> 1) as i32) ^ -((val & 1) as i32)
}

#[cfg(test)]
mod tests {
    use picoproto_testing::{encode_varint, TestCases};

    use super::{
        read_fixed32, read_fixed64, read_span, read_varint, split_tag, zigzag_decode32,
        zigzag_decode64, WireError, WireType,
    };

    #[test]
    fn test_read_varint() {
        let mut values: Vec<u64> = (0..1024).collect();
        values.extend([u32::MAX as u64, 1 << 63, u64::MAX]);
        for val in values {
            let buf = encode_varint(val);
            let (decoded_val, pos) = read_varint(&buf, 0).unwrap();
            assert_eq!(decoded_val, val);
            assert_eq!(pos, buf.len());
        }
    }

    #[test]
    fn test_read_varint_sequence() {
        // Example from https://protobuf.dev/programming-guides/encoding/#simple.
        let buf = [0x08, 0x96, 0x01];
        let (val, pos) = read_varint(&buf, 0).unwrap();
        assert_eq!((val, pos), (8, 1));

        let (val, pos) = read_varint(&buf, pos).unwrap();
        assert_eq!((val, pos), (150, 3));

        assert_eq!(read_varint(&buf, pos), Err(WireError::Truncated));

        // Longer sequence of varints.
        let values = [0, 1, 150, u64::MAX, 2];
        let buf: Vec<u8> = values.iter().copied().flat_map(encode_varint).collect();

        let mut decoded_values = Vec::new();
        let mut pos = 0;
        while pos < buf.len() {
            let (val, next) = read_varint(&buf, pos).unwrap();
            decoded_values.push(val);
            pos = next;
        }
        assert_eq!(decoded_values, values);
    }

    #[test]
    fn test_invalid_varint() {
        #[derive(Debug)]
        struct Case {
            buf: Vec<u8>,
            expected: WireError,
        }

        let mut overflow = encode_varint(u64::MAX);
        assert_eq!(overflow.len(), 10);
        overflow[9] += 1;

        let cases = [
            // Empty input.
            Case {
                buf: Vec::new(),
                expected: WireError::Truncated,
            },
            // Buffer ends on a continuation byte.
            Case {
                buf: vec![0x96],
                expected: WireError::Truncated,
            },
            Case {
                buf: vec![0xff; 9],
                expected: WireError::Truncated,
            },
            // More than 10 bytes.
            Case {
                buf: vec![0xff; 11],
                expected: WireError::InvalidVarint,
            },
            // 10th byte uses more than one value bit.
            Case {
                buf: overflow,
                expected: WireError::InvalidVarint,
            },
        ];

        cases.test_each(|case| {
            assert_eq!(read_varint(&case.buf, 0), Err(case.expected));
        });
    }

    #[test]
    fn test_read_varint_past_end() {
        assert_eq!(read_varint(&[0x01], 5), Err(WireError::Truncated));
    }

    #[test]
    fn test_read_fixed() {
        let mut buf = Vec::new();
        buf.extend(42u32.to_le_bytes());
        buf.extend(84u64.to_le_bytes());

        let (val, pos) = read_fixed32(&buf, 0).unwrap();
        assert_eq!((val, pos), (42, 4));

        let (val, pos) = read_fixed64(&buf, pos).unwrap();
        assert_eq!((val, pos), (84, 12));

        assert_eq!(read_fixed32(&buf, 9), Err(WireError::Truncated));
        assert_eq!(read_fixed64(&buf, 5), Err(WireError::Truncated));
        assert_eq!(read_fixed64(&buf, usize::MAX), Err(WireError::Truncated));
    }

    #[test]
    fn test_read_span() {
        let buf = b"hello world";

        let (span, pos) = read_span(buf, 6, 5).unwrap();
        assert_eq!((span, pos), (&b"world"[..], 11));

        let (span, pos) = read_span(buf, 11, 0).unwrap();
        assert_eq!((span, pos), (&b""[..], 11));

        assert_eq!(read_span(buf, 6, 6), Err(WireError::Truncated));
        assert_eq!(read_span(buf, 1, u64::MAX), Err(WireError::Truncated));
    }

    #[test]
    fn test_split_tag() {
        assert_eq!(split_tag(0x08), (1, 0));
        assert_eq!(split_tag(0x12), (2, 2));
        assert_eq!(split_tag(0x0d), (1, 5));
        assert_eq!(WireType::from_code(5), Some(WireType::I32));
        assert_eq!(WireType::from_code(3), None);
        assert_eq!(WireType::Len.code(), 2);
    }

    #[test]
    fn test_zigzag_decode() {
        #[derive(Debug)]
        struct Case {
            raw: u64,
            expected: i64,
        }

        let cases = [
            Case { raw: 0, expected: 0 },
            Case { raw: 1, expected: -1 },
            Case { raw: 2, expected: 1 },
            Case { raw: 3, expected: -2 },
            Case {
                raw: 0xfffffffe,
                expected: 0x7fffffff,
            },
            Case {
                raw: u64::MAX - 1,
                expected: i64::MAX,
            },
            Case {
                raw: u64::MAX,
                expected: i64::MIN,
            },
        ];

        cases.test_each(|&Case { raw, expected }| {
            assert_eq!(zigzag_decode64(raw), expected);
        });

        assert_eq!(zigzag_decode32(3), -2);
        assert_eq!(zigzag_decode32(u32::MAX), i32::MIN);
    }
}
