//! Minimal schema-less decoder for [Protocol Buffers][protobuf] messages.
//!
//! This crate decodes Protocol Buffers wire format data into a generic tree
//! of fields, without requiring a compiled schema. Callers query the decoded
//! [`Message`] by field number and the logical type they expect the field to
//! have.
//!
//! # Usage
//!
//! ```
//! use picoproto::Message;
//!
//! // A `GraphDef`-like message with one node, `{ name: "add", op: "Add" }`.
//! let bytes = [
//!     0x0a, 0x0a, // field 1, 10 bytes
//!     0x0a, 0x03, b'a', b'd', b'd', // field 1 = "add"
//!     0x12, 0x03, b'A', b'd', b'd', // field 2 = "Add"
//! ];
//!
//! let mut graph = Message::new();
//! graph.parse_from_bytes(&bytes)?;
//!
//! for node in graph.get_message_array(1) {
//!     println!("{} ({})", node.get_string(1), node.get_string(2));
//! }
//! # Ok::<_, picoproto::DecodeError>(())
//! ```
//!
//! # Design
//!
//! Decoding makes a single pass over the input. Each field occurrence is
//! appended to the [`Field`] for its field number. Values are stored in one of
//! three representations, determined by the wire type of a field's first
//! occurrence (see [`FieldKind`]):
//!
//! - Varint and 64-bit values are stored as `u64`
//! - 32-bit values are stored as `u32`
//! - Length-delimited values are stored as byte spans
//!
//! Length-delimited values may be strings, bytes or embedded messages, which
//! cannot be distinguished without a schema. Embedded messages are therefore
//! only decoded when requested via [`Message::get_message`] or similar, and
//! the result is cached in the field.
//!
//! Spans are either copied into buffers owned by the message or borrowed from
//! the input buffer. See [`BufferMode`].
//!
//! Decoding stops at the first malformed or truncated value. Fields decoded
//! before that point remain available, which is useful for inspecting damaged
//! or truncated data.
//!
//! [protobuf]: https://protobuf.dev/

// This is a crate for parsing potentially untrusted data, so it is preferable
// to avoid unsafe code.
#![forbid(unsafe_code)]

mod access;
mod errors;
mod field;
mod message;
pub mod wire;

pub use errors::{DecodeError, ErrorKind};
pub use field::{Field, FieldKind};
pub use message::{BufferMode, DecodeOptions, KindConflict, Message};
