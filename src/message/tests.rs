use std::num::NonZeroU32;

use bstr::BStr;

use crate::error::ErrorKind;
use crate::proto::{Endianness, Flags, HeaderField, MessageType};
use crate::value::Value;
use crate::{Message, MessageKind, ObjectPath, Signature};

fn serial(n: u32) -> NonZeroU32 {
    NonZeroU32::new(n).expect("non-zero serial")
}

fn path(s: &str) -> ObjectPath {
    ObjectPath::new(s).expect("valid path")
}

/// The canonical `Hello` call, fields in the order the reference
/// implementation emits them.
fn hello() -> Message {
    let mut m = Message {
        message_type: MessageType::METHOD_CALL,
        flags: Flags::EMPTY,
        serial: None,
        fields: Vec::new(),
        body: Vec::new(),
    };

    m.set_field(
        HeaderField::PATH,
        Value::ObjectPath("/org/freedesktop/DBus".into()),
    );
    m.set_field(
        HeaderField::DESTINATION,
        Value::from("org.freedesktop.DBus"),
    );
    m.set_field(HeaderField::INTERFACE, Value::from("org.freedesktop.DBus"));
    m.set_field(HeaderField::MEMBER, Value::from("Hello"));
    m
}

#[test]
fn hello_header_prefix() {
    let bytes = hello().encode(serial(1), Endianness::LITTLE).expect("encode");

    #[rustfmt::skip]
    let expected: [u8; 16] = [
        // endianness, METHOD_CALL, no flags, version 1
        b'l', 0x01, 0x00, 0x01,
        // empty body
        0x00, 0x00, 0x00, 0x00,
        // serial 1
        0x01, 0x00, 0x00, 0x00,
        // 110 bytes of header fields
        0x6e, 0x00, 0x00, 0x00,
    ];

    assert_eq!(BStr::new(&bytes[..16]), BStr::new(&expected));

    // Field array plus the padding closing the header.
    assert_eq!(bytes.len(), 128);
}

#[test]
fn hello_round_trip() {
    let m = hello();
    let bytes = m.encode(serial(1), Endianness::LITTLE).expect("encode");
    let decoded = Message::decode(&bytes).expect("decode");

    assert_eq!(decoded.serial(), Some(serial(1)));
    assert_eq!(
        decoded.kind(),
        MessageKind::MethodCall {
            path: "/org/freedesktop/DBus",
            member: "Hello",
        }
    );
    assert_eq!(decoded.destination(), Some("org.freedesktop.DBus"));
    assert_eq!(decoded.interface(), Some("org.freedesktop.DBus"));
    assert_eq!(decoded.signature(), "");
    assert_eq!(decoded.body(), &[]);

    // Byte-exact re-encode under the same serial and endianness.
    let bytes2 = decoded
        .encode(serial(1), Endianness::LITTLE)
        .expect("encode");
    assert_eq!(bytes, bytes2);
}

#[test]
fn notify_round_trip() {
    let body = vec![
        Value::from("wirebus"),
        Value::UInt32(0),
        Value::from(""),
        Value::from("Hello from wirebus"),
        Value::from(""),
        Value::Array(vec![]),
        Value::Dict(vec![]),
        Value::Int32(5000),
    ];

    let m = Message::method_call(path("/org/freedesktop/Notifications"), "Notify")
        .with_destination("org.freedesktop.Notifications")
        .with_interface("org.freedesktop.Notifications")
        .with_body("susssasa{sv}i", body.clone())
        .expect("body");

    let bytes = m.encode(serial(2), Endianness::LITTLE).expect("encode");
    let decoded = Message::decode(&bytes).expect("decode");

    assert_eq!(decoded.signature(), "susssasa{sv}i");
    assert_eq!(decoded.body(), &body);
    assert_eq!(decoded.member(), Some("Notify"));

    let bytes2 = decoded
        .encode(serial(2), Endianness::LITTLE)
        .expect("encode");
    assert_eq!(bytes, bytes2);
}

#[test]
fn big_endian_round_trip() {
    let m = Message::method_call(path("/a"), "M")
        .with_body("ui", vec![Value::UInt32(7), Value::Int32(-7)])
        .expect("body");

    let bytes = m.encode(serial(3), Endianness::BIG).expect("encode");
    assert_eq!(bytes[0], b'B');

    let decoded = Message::decode(&bytes).expect("decode");
    assert_eq!(decoded.body(), &[Value::UInt32(7), Value::Int32(-7)]);

    let bytes2 = decoded.encode(serial(3), Endianness::BIG).expect("encode");
    assert_eq!(bytes, bytes2);
}

#[test]
fn body_alignment_invariants() {
    // Fixed values in the body land on offsets divisible by their size,
    // measured from the start of the message.
    let m = Message::method_call(path("/a"), "M")
        .with_body("yt", vec![Value::Byte(1), Value::UInt64(2)])
        .expect("body");

    let bytes = m.encode(serial(1), Endianness::LITTLE).expect("encode");
    let body_len = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);

    // One byte, then padding to the next 8-byte boundary, then the u64.
    assert_eq!(body_len, 16);
    assert_eq!(bytes.len() % 8, 0);
    assert_eq!(&bytes[bytes.len() - 8..], &[2, 0, 0, 0, 0, 0, 0, 0]);
}

#[test]
fn flags_round_trip() {
    let m = Message::signal(path("/org/example"), "org.example.Iface", "Changed")
        .with_flags(Flags::NO_REPLY_EXPECTED | Flags::NO_AUTO_START);

    let bytes = m.encode(serial(9), Endianness::LITTLE).expect("encode");
    let decoded = Message::decode(&bytes).expect("decode");

    assert!(decoded.flags() & Flags::NO_REPLY_EXPECTED);
    assert!(decoded.flags() & Flags::NO_AUTO_START);
    assert!(!(decoded.flags() & Flags::ALLOW_INTERACTIVE_AUTHORIZATION));
    assert_eq!(decoded.kind(), MessageKind::Signal { member: "Changed" });
}

#[test]
fn error_reply_round_trip() {
    let m = Message::error("org.freedesktop.DBus.Error.UnknownMethod", serial(5))
        .with_body("s", vec![Value::from("no such method")])
        .expect("body");

    let bytes = m.encode(serial(6), Endianness::LITTLE).expect("encode");
    let decoded = Message::decode(&bytes).expect("decode");

    assert_eq!(
        decoded.kind(),
        MessageKind::Error {
            error_name: "org.freedesktop.DBus.Error.UnknownMethod",
            reply_serial: serial(5),
        }
    );
}

#[test]
fn unknown_message_type_preserved() {
    let m = Message {
        message_type: MessageType(9),
        flags: Flags::EMPTY,
        serial: None,
        fields: Vec::new(),
        body: Vec::new(),
    };

    let bytes = m.encode(serial(4), Endianness::LITTLE).expect("encode");
    let decoded = Message::decode(&bytes).expect("decode");

    assert_eq!(decoded.message_type(), MessageType(9));
    assert_eq!(decoded.kind(), MessageKind::Unknown);

    let bytes2 = decoded.encode(serial(4), Endianness::LITTLE).expect("encode");
    assert_eq!(bytes, bytes2);
}

#[test]
fn rejects_bad_endianness_marker() {
    let err = Message::decode(&[b'x', 1, 0, 1]).expect_err("marker");
    assert!(matches!(err.kind(), ErrorKind::InvalidEndianness(b'x')));
}

#[test]
fn rejects_unsupported_version() {
    let mut bytes = hello().encode(serial(1), Endianness::LITTLE).expect("encode");
    bytes[3] = 2;

    let err = Message::decode(&bytes).expect_err("version");
    assert_eq!(err.to_string(), "unsupported protocol version 2, expected 1");
}

#[test]
fn rejects_zero_serial() {
    let mut bytes = hello().encode(serial(1), Endianness::LITTLE).expect("encode");
    bytes[8..12].fill(0);

    let err = Message::decode(&bytes).expect_err("serial");
    assert!(matches!(err.kind(), ErrorKind::ZeroSerial));
}

#[test]
fn rejects_bad_boolean_in_body() {
    let m = Message::method_call(path("/a"), "M")
        .with_body("b", vec![Value::Boolean(true)])
        .expect("body");

    let mut bytes = m.encode(serial(1), Endianness::LITTLE).expect("encode");
    let at = bytes.len() - 4;
    bytes[at] = 2;

    let err = Message::decode(&bytes).expect_err("boolean");
    assert!(matches!(err.kind(), ErrorKind::InvalidBoolean(2)));
}

#[test]
fn rejects_known_field_with_wrong_signature() {
    let mut bytes = hello().encode(serial(1), Endianness::LITTLE).expect("encode");

    // The PATH field opens the array at offset 16: code, then the variant
    // signature `01 6f 00`. Rewriting 'o' to 's' leaves the wire shape
    // intact but breaks the field's required type.
    assert_eq!(bytes[18], b'o');
    bytes[18] = b's';

    let err = Message::decode(&bytes).expect_err("wrong field signature");
    assert_eq!(
        err.to_string(),
        "header field PATH has signature 's', expected 'o'"
    );
}

#[test]
fn rejects_duplicate_header_field() {
    let mut m = hello();
    m.fields.push((HeaderField::MEMBER, Value::from("Hello")));

    let bytes = m.encode(serial(1), Endianness::LITTLE).expect("encode");
    let err = Message::decode(&bytes).expect_err("duplicate");
    assert!(matches!(
        err.kind(),
        ErrorKind::DuplicateHeaderField(HeaderField::MEMBER)
    ));
}

#[test]
fn rejects_missing_required_fields() {
    let m = Message {
        message_type: MessageType::METHOD_CALL,
        flags: Flags::EMPTY,
        serial: None,
        fields: vec![(HeaderField::MEMBER, Value::from("Hello"))],
        body: Vec::new(),
    };

    let bytes = m.encode(serial(1), Endianness::LITTLE).expect("encode");
    let err = Message::decode(&bytes).expect_err("missing path");
    assert_eq!(err.to_string(), "missing required PATH header field");
}

#[test]
fn body_requires_signature_field() {
    let m = Message {
        message_type: MessageType::METHOD_CALL,
        flags: Flags::EMPTY,
        serial: None,
        fields: Vec::new(),
        body: vec![Value::UInt32(1)],
    };

    let err = m.encode(serial(1), Endianness::LITTLE).expect_err("signature");
    assert!(matches!(
        err.kind(),
        ErrorKind::MissingHeaderField("SIGNATURE")
    ));
}

#[test]
fn variant_body_round_trip() {
    let m = Message::method_call(path("/a"), "M")
        .with_body(
            "v",
            vec![Value::variant(
                Signature::new("u").expect("valid"),
                Value::UInt32(42),
            )],
        )
        .expect("body");

    let bytes = m.encode(serial(1), Endianness::LITTLE).expect("encode");
    let decoded = Message::decode(&bytes).expect("decode");

    assert_eq!(
        decoded.body(),
        &[Value::variant(
            Signature::new("u").expect("valid"),
            Value::UInt32(42)
        )]
    );
}
