use picoproto::{BufferMode, DecodeOptions, ErrorKind, FieldKind, KindConflict, Message};
use picoproto_testing::{Encoder, TestCases};

fn borrow_options() -> DecodeOptions {
    DecodeOptions {
        mode: BufferMode::Borrow,
        ..Default::default()
    }
}

fn points_into(span: &[u8], buf: &[u8]) -> bool {
    let range = buf.as_ptr_range();
    range.contains(&span.as_ptr()) && span.as_ptr_range().end <= range.end
}

#[test]
fn test_varint_values() {
    #[derive(Debug)]
    struct Case {
        value: u64,
    }

    let cases = [0, 1, 127, 128, 150, 1 << 35, u32::MAX as u64, u64::MAX]
        .map(|value| Case { value });

    cases.test_each(|&Case { value }| {
        let bytes = Encoder::new().varint(7, value).finish();
        let message = Message::decode(&bytes, DecodeOptions::default()).unwrap();
        assert_eq!(message.get_uint64(7), value);
        assert_eq!(message.field_kind(7), Some(FieldKind::Uint64));
    })
}

#[test]
fn test_signed_and_unsigned_readings() {
    let bytes = Encoder::new().varint(1, 3).finish();
    let message = Message::decode(&bytes, DecodeOptions::default()).unwrap();
    assert_eq!(message.get_uint64(1), 3);
    assert_eq!(message.get_int64(1), -2);
    assert_eq!(message.get_int(1), 3);
}

#[test]
fn test_graph_like_message() {
    let node = |name: &str, op: &str, inputs: &[&str]| {
        inputs.iter().fold(
            Encoder::new().string(1, name).string(2, op),
            |enc, input| enc.string(3, input),
        )
    };
    let bytes = Encoder::new()
        .message(1, node("a", "Placeholder", &[]))
        .message(1, node("b", "Relu", &["a"]))
        .message(1, node("c", "Add", &["a", "b:0"]))
        .varint(2, 21)
        .finish();

    for mode in [BufferMode::Copy, BufferMode::Borrow] {
        let options = DecodeOptions {
            mode,
            ..Default::default()
        };
        let graph = Message::decode(&bytes, options).unwrap();

        let nodes = graph.get_message_array(1);
        let names: Vec<_> = nodes.iter().map(|n| n.get_string(1)).collect();
        assert_eq!(names, ["a", "b", "c"]);
        assert_eq!(nodes[2].get_string_array(3), ["a", "b:0"]);
        assert_eq!(graph.get_message(1).unwrap().get_string(2), "Placeholder");
        assert_eq!(graph.get_uint64(2), 21);
    }
}

#[test]
fn test_borrowed_spans_alias_input() {
    let bytes = Encoder::new()
        .string(1, "testing")
        .message(2, Encoder::new().string(1, "inner"))
        .finish();
    let message = Message::decode(&bytes, borrow_options()).unwrap();

    assert!(points_into(message.get_bytes(1), &bytes));
    let inner = message.get_message(2).unwrap();
    assert!(points_into(inner.get_bytes(1), &bytes));
}

#[test]
fn test_copied_message_outlives_input() {
    let message = {
        let mut bytes = Encoder::new()
            .string(1, "testing")
            .message(2, Encoder::new().varint(1, 150))
            .finish();
        let mut message = Message::new();
        message.parse_from_bytes_copied(&bytes).unwrap();
        assert!(!points_into(message.get_bytes(1), &bytes));

        bytes.fill(0);
        message
    };

    assert_eq!(message.get_string(1), "testing");
    assert_eq!(message.get_message(2).unwrap().get_uint64(1), 150);
}

#[test]
fn test_into_owned() {
    let message = {
        let bytes = Encoder::new().string(1, "testing").finish();
        let borrowed = Message::decode(&bytes, borrow_options()).unwrap();
        borrowed.into_owned()
    };
    assert_eq!(message.get_string(1), "testing");
}

#[test]
fn test_truncated_input_keeps_prefix() {
    let bytes = Encoder::new()
        .varint(1, 1)
        .string(2, "two")
        .string(3, "three")
        .finish();
    let truncated = &bytes[..bytes.len() - 2];

    let mut message = Message::new();
    let err = message.parse_from_bytes(truncated).unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::Truncated);
    assert_eq!(err.field(), Some(3));
    assert_eq!(message.decode_error(), Some(&err));

    assert_eq!(message.get_uint64(1), 1);
    assert_eq!(message.get_string(2), "two");
    assert!(!message.has_field(3));
}

#[test]
fn test_kind_conflicts() {
    let bytes = Encoder::new()
        .varint(1, 5)
        .fixed32(1, 6)
        .varint(1, 7)
        .finish();

    let message = Message::decode(&bytes, DecodeOptions::default()).unwrap();
    assert_eq!(message.get_uint64_array(1), [5, 7]);
    assert_eq!(message.get_uint32(1), 0);
    assert_eq!(message.ignored_occurrences(), 1);

    let options = DecodeOptions {
        on_kind_conflict: KindConflict::Fail,
        ..Default::default()
    };
    let err = Message::decode(&bytes, options).unwrap_err();
    assert_eq!(
        err.kind(),
        &ErrorKind::FieldKindConflict {
            expected: FieldKind::Uint64,
            actual: FieldKind::Uint32,
        }
    );
}

#[test]
fn test_float_and_double() {
    let bytes = Encoder::new()
        .float(1, -42.42)
        .double(2, 23.23)
        .finish();
    let message = Message::decode(&bytes, DecodeOptions::default()).unwrap();
    assert_eq!(message.get_float(1), -42.42);
    assert_eq!(message.get_double(2), 23.23);

    // Missing and mismatched fields return defaults.
    assert_eq!(message.get_double(1), 0.);
    assert_eq!(message.get_float(3), 0.);
}
