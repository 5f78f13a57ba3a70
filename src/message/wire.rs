//! Framing of whole messages: fixed header, header-field array, body.

use std::num::NonZeroU32;

use crate::body_buf::BodyBuf;
use crate::error::{Error, ErrorKind, Result};
use crate::proto::{
    Endianness, Flags, HeaderField, MessageType, MAX_ARRAY_LENGTH, MAX_BODY_LENGTH,
    MIN_MESSAGE_LEN,
};
use crate::read_buf::ReadBuf;
use crate::signature::{parse_many, parse_one};
use crate::value::Value;

use super::Message;

/// Encode one complete message.
pub(crate) fn encode(
    message: &Message,
    serial: NonZeroU32,
    endianness: Endianness,
) -> Result<Vec<u8>> {
    let mut buf = BodyBuf::with_endianness(endianness);

    buf.store(endianness.0);
    buf.store(message.message_type.0);
    buf.store(message.flags.0);
    buf.store(1u8);

    let body_len = buf.alloc::<u32>();
    buf.store(serial.get());

    // Header fields, an a(yv) in insertion order. Only known field codes
    // with their expected variant signature are emitted.
    let fields_len = buf.alloc::<u32>();
    buf.align(8);
    let fields_start = buf.pos();

    for (field, value) in &message.fields {
        let Some(signature) = field.expected_signature() else {
            continue;
        };

        buf.align(8);
        buf.store(field.0);
        buf.write_signature(signature)?;
        let ty = parse_one(signature)?;
        buf.write_value(&ty, value)?;
    }

    let size = buf.pos() - fields_start;

    if size > MAX_ARRAY_LENGTH as usize {
        return Err(Error::new(ErrorKind::ArrayTooLong(size)));
    }

    buf.store_at(fields_len, size as u32);

    // End of header.
    buf.align(8);

    let signature = message.signature();

    if !message.body.is_empty() && signature.is_empty() {
        return Err(Error::new(ErrorKind::MissingHeaderField("SIGNATURE")));
    }

    let types = parse_many(signature)?;

    if types.len() != message.body.len() {
        return Err(Error::new(ErrorKind::ArityMismatch {
            expected: types.len(),
            found: message.body.len(),
        }));
    }

    let body_start = buf.pos();

    for (ty, value) in types.iter().zip(&message.body) {
        buf.write_value(ty, value)?;
    }

    let size = buf.pos() - body_start;

    if size > MAX_BODY_LENGTH as usize {
        return Err(Error::new(ErrorKind::BodyTooLong(size)));
    }

    buf.store_at(body_len, size as u32);
    Ok(buf.into_vec())
}

/// Decode one complete message.
pub(crate) fn decode(bytes: &[u8]) -> Result<Message> {
    let endianness = match bytes.first() {
        Some(&b'l') => Endianness::LITTLE,
        Some(&b'B') => Endianness::BIG,
        Some(&b) => return Err(Error::new(ErrorKind::InvalidEndianness(b))),
        None => {
            return Err(Error::new(ErrorKind::BufferUnderflow {
                needed: MIN_MESSAGE_LEN,
                remaining: 0,
            }))
        }
    };

    let mut buf = ReadBuf::new(bytes, endianness);

    // Endianness marker, already inspected.
    buf.load::<u8>()?;

    let message_type = MessageType(buf.load::<u8>()?);
    let flags = Flags(buf.load::<u8>()?);
    let version = buf.load::<u8>()?;

    if version != 1 {
        return Err(Error::new(ErrorKind::UnsupportedVersion(version)));
    }

    let body_len = buf.load::<u32>()? as usize;

    if body_len > MAX_BODY_LENGTH as usize {
        return Err(Error::new(ErrorKind::BodyTooLong(body_len)));
    }

    let serial =
        NonZeroU32::new(buf.load::<u32>()?).ok_or_else(|| Error::new(ErrorKind::ZeroSerial))?;

    let fields_len = buf.load::<u32>()? as usize;

    if fields_len > MAX_ARRAY_LENGTH as usize {
        return Err(Error::new(ErrorKind::ArrayTooLong(fields_len)));
    }

    let fields_end = buf.pos() + fields_len;

    if fields_end > bytes.len() {
        return Err(Error::new(ErrorKind::BufferUnderflow {
            needed: fields_len,
            remaining: buf.len(),
        }));
    }

    let mut fields: Vec<(HeaderField, Value)> = Vec::new();

    while buf.pos() < fields_end {
        buf.skip_padding(8)?;
        let field = HeaderField(buf.load::<u8>()?);
        let signature = buf.read_signature()?;
        let expected = field.expected_signature();

        // A recognised field must carry its required variant signature.
        if let Some(expected) = expected {
            if expected != signature {
                return Err(Error::new(ErrorKind::InvalidHeaderField {
                    field,
                    expected,
                    found: signature.into(),
                }));
            }
        }

        let ty = parse_one(signature)?;
        let value = buf.read_value(&ty)?;

        if expected.is_none() {
            // Unknown field codes are skipped, not errors: they may be
            // defined by a future protocol revision.
            continue;
        }

        if fields.iter().any(|(f, _)| *f == field) {
            return Err(Error::new(ErrorKind::DuplicateHeaderField(field)));
        }

        fields.push((field, value));
    }

    if buf.pos() > fields_end {
        return Err(Error::new(ErrorKind::ArrayOverrun {
            at: buf.pos(),
            end: fields_end,
        }));
    }

    buf.skip_padding(8)?;

    let signature = match fields
        .iter()
        .find(|(f, _)| *f == HeaderField::SIGNATURE)
        .map(|(_, value)| value)
    {
        Some(Value::Signature(s)) => s.as_str(),
        _ => "",
    };

    let types = parse_many(signature)?;
    let body_start = buf.pos();
    let mut body = Vec::with_capacity(types.len());

    for ty in &types {
        body.push(buf.read_value(ty)?);
    }

    let consumed = buf.pos() - body_start;

    if consumed > body_len {
        return Err(Error::new(ErrorKind::ArrayOverrun {
            at: buf.pos(),
            end: body_start + body_len,
        }));
    }

    if consumed < body_len {
        return Err(Error::new(ErrorKind::TrailingBytes(body_len - consumed)));
    }

    validate_required_fields(message_type, &fields)?;

    Ok(Message {
        message_type,
        flags,
        serial: Some(serial),
        fields,
        body,
    })
}

/// Check the header fields the message type requires.
///
/// Unrecognised type codes carry no requirements; the message is preserved
/// as it came.
fn validate_required_fields(
    message_type: MessageType,
    fields: &[(HeaderField, Value)],
) -> Result<()> {
    let has = |field: HeaderField| fields.iter().any(|(f, _)| *f == field);

    let reply_serial = || -> Result<()> {
        match fields
            .iter()
            .find(|(f, _)| *f == HeaderField::REPLY_SERIAL)
            .map(|(_, value)| value)
        {
            Some(Value::UInt32(0)) => Err(Error::new(ErrorKind::ZeroReplySerial)),
            Some(..) => Ok(()),
            None => Err(Error::new(ErrorKind::MissingHeaderField("REPLY_SERIAL"))),
        }
    };

    match message_type {
        MessageType::METHOD_CALL => {
            if !has(HeaderField::PATH) {
                return Err(Error::new(ErrorKind::MissingHeaderField("PATH")));
            }

            if !has(HeaderField::MEMBER) {
                return Err(Error::new(ErrorKind::MissingHeaderField("MEMBER")));
            }
        }
        MessageType::METHOD_RETURN => reply_serial()?,
        MessageType::ERROR => {
            if !has(HeaderField::ERROR_NAME) {
                return Err(Error::new(ErrorKind::MissingHeaderField("ERROR_NAME")));
            }

            reply_serial()?;
        }
        MessageType::SIGNAL => {
            if !has(HeaderField::PATH) {
                return Err(Error::new(ErrorKind::MissingHeaderField("PATH")));
            }

            if !has(HeaderField::INTERFACE) {
                return Err(Error::new(ErrorKind::MissingHeaderField("INTERFACE")));
            }

            if !has(HeaderField::MEMBER) {
                return Err(Error::new(ErrorKind::MissingHeaderField("MEMBER")));
            }
        }
        _ => {}
    }

    Ok(())
}
