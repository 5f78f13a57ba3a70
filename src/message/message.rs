use std::num::NonZeroU32;

use crate::error::{Error, ErrorKind, Result};
use crate::proto::{Endianness, Flags, HeaderField, MessageType};
use crate::signature::parse_many;
use crate::value::Value;
use crate::ObjectPath;

use super::wire;

/// A D-Bus message: type, flags, serial, header fields, and body.
///
/// Header fields are kept as an insertion-ordered sequence with unique keys,
/// so a decoded message re-encodes to the same bytes under the same
/// endianness.
///
/// The serial is `None` until the message has been sent over a
/// [`Connection`] (which assigns the next one) or explicitly set; decoded
/// messages always carry one.
///
/// # Examples
///
/// ```
/// use wirebus::{Message, MessageKind, ObjectPath};
///
/// let m = Message::method_call(ObjectPath::new("/org/freedesktop/DBus")?, "Hello")
///     .with_destination("org.freedesktop.DBus")
///     .with_interface("org.freedesktop.DBus");
///
/// assert!(matches!(m.kind(), MessageKind::MethodCall { .. }));
/// assert_eq!(m.member(), Some("Hello"));
/// # Ok::<_, wirebus::Error>(())
/// ```
///
/// [`Connection`]: crate::Connection
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub(crate) message_type: MessageType,
    pub(crate) flags: Flags,
    pub(crate) serial: Option<NonZeroU32>,
    pub(crate) fields: Vec<(HeaderField, Value)>,
    pub(crate) body: Vec<Value>,
}

/// The kind of a [`Message`], derived from its type code and header fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind<'a> {
    /// A method call.
    MethodCall {
        /// The path of the object being called.
        path: &'a str,
        /// The method being called.
        member: &'a str,
    },
    /// A reply to a method call.
    MethodReturn {
        /// The serial of the call being replied to.
        reply_serial: NonZeroU32,
    },
    /// An error reply.
    Error {
        /// The name of the error, such as
        /// `org.freedesktop.DBus.Error.UnknownMethod`.
        error_name: &'a str,
        /// The serial of the call being replied to.
        reply_serial: NonZeroU32,
    },
    /// A signal emission.
    Signal {
        /// The name of the signal.
        member: &'a str,
    },
    /// A message of an unrecognised type code, preserved as-is.
    Unknown,
}

impl Message {
    fn new(message_type: MessageType) -> Self {
        Self {
            message_type,
            flags: Flags::EMPTY,
            serial: None,
            fields: Vec::new(),
            body: Vec::new(),
        }
    }

    /// Construct a method call to `member` on the object at `path`.
    pub fn method_call(path: ObjectPath, member: &str) -> Self {
        let mut m = Self::new(MessageType::METHOD_CALL);
        m.set_field(HeaderField::PATH, Value::ObjectPath(path.as_str().into()));
        m.set_field(HeaderField::MEMBER, Value::from(member));
        m
    }

    /// Construct a reply to the message with serial `reply_serial`.
    pub fn method_return(reply_serial: NonZeroU32) -> Self {
        let mut m = Self::new(MessageType::METHOD_RETURN);
        m.set_field(
            HeaderField::REPLY_SERIAL,
            Value::UInt32(reply_serial.get()),
        );
        m
    }

    /// Construct an error reply to the message with serial `reply_serial`.
    pub fn error(error_name: &str, reply_serial: NonZeroU32) -> Self {
        let mut m = Self::new(MessageType::ERROR);
        m.set_field(HeaderField::ERROR_NAME, Value::from(error_name));
        m.set_field(
            HeaderField::REPLY_SERIAL,
            Value::UInt32(reply_serial.get()),
        );
        m
    }

    /// Construct a signal emission.
    pub fn signal(path: ObjectPath, interface: &str, member: &str) -> Self {
        let mut m = Self::new(MessageType::SIGNAL);
        m.set_field(HeaderField::PATH, Value::ObjectPath(path.as_str().into()));
        m.set_field(HeaderField::INTERFACE, Value::from(interface));
        m.set_field(HeaderField::MEMBER, Value::from(member));
        m
    }

    /// Set the body signature and values.
    ///
    /// The signature must describe exactly the supplied values; the
    /// SIGNATURE header field is maintained as a side effect.
    pub fn with_body(mut self, signature: &str, body: Vec<Value>) -> Result<Self> {
        let types = parse_many(signature)?;

        if types.len() != body.len() {
            return Err(Error::new(ErrorKind::ArityMismatch {
                expected: types.len(),
                found: body.len(),
            }));
        }

        if signature.is_empty() {
            self.fields.retain(|(f, _)| *f != HeaderField::SIGNATURE);
        } else {
            self.set_field(HeaderField::SIGNATURE, Value::Signature(signature.into()));
        }

        self.body = body;
        Ok(self)
    }

    /// Modify the destination of the message.
    #[must_use]
    pub fn with_destination(mut self, destination: &str) -> Self {
        self.set_field(HeaderField::DESTINATION, Value::from(destination));
        self
    }

    /// Modify the interface of the message.
    #[must_use]
    pub fn with_interface(mut self, interface: &str) -> Self {
        self.set_field(HeaderField::INTERFACE, Value::from(interface));
        self
    }

    /// Modify the sender of the message. Normally filled in by the bus.
    #[must_use]
    pub fn with_sender(mut self, sender: &str) -> Self {
        self.set_field(HeaderField::SENDER, Value::from(sender));
        self
    }

    /// Modify the flags of the message.
    #[must_use]
    pub fn with_flags(mut self, flags: Flags) -> Self {
        self.flags = flags;
        self
    }

    /// Modify the serial of the message.
    #[must_use]
    pub fn with_serial(mut self, serial: NonZeroU32) -> Self {
        self.serial = Some(serial);
        self
    }

    /// Modify the UNIX_FDS header field.
    #[must_use]
    pub fn with_unix_fds(mut self, unix_fds: u32) -> Self {
        self.set_field(HeaderField::UNIX_FDS, Value::UInt32(unix_fds));
        self
    }

    /// Get the type of the message.
    pub fn message_type(&self) -> MessageType {
        self.message_type
    }

    /// Get the flags of the message.
    pub fn flags(&self) -> Flags {
        self.flags
    }

    /// Get the serial of the message, if one has been assigned.
    pub fn serial(&self) -> Option<NonZeroU32> {
        self.serial
    }

    /// Get a header field by its code.
    pub fn field(&self, field: HeaderField) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, value)| value)
    }

    /// Get the path of the message.
    pub fn path(&self) -> Option<&str> {
        self.field_str(HeaderField::PATH)
    }

    /// Get the interface of the message.
    pub fn interface(&self) -> Option<&str> {
        self.field_str(HeaderField::INTERFACE)
    }

    /// Get the member of the message.
    pub fn member(&self) -> Option<&str> {
        self.field_str(HeaderField::MEMBER)
    }

    /// Get the error name of the message.
    pub fn error_name(&self) -> Option<&str> {
        self.field_str(HeaderField::ERROR_NAME)
    }

    /// Get the serial this message replies to.
    pub fn reply_serial(&self) -> Option<NonZeroU32> {
        match self.field(HeaderField::REPLY_SERIAL) {
            Some(Value::UInt32(serial)) => NonZeroU32::new(*serial),
            _ => None,
        }
    }

    /// Get the destination of the message.
    pub fn destination(&self) -> Option<&str> {
        self.field_str(HeaderField::DESTINATION)
    }

    /// Get the sender of the message.
    pub fn sender(&self) -> Option<&str> {
        self.field_str(HeaderField::SENDER)
    }

    /// Get the signature of the body, empty for an empty body.
    pub fn signature(&self) -> &str {
        self.field_str(HeaderField::SIGNATURE).unwrap_or("")
    }

    /// Get the UNIX_FDS header field.
    pub fn unix_fds(&self) -> Option<u32> {
        match self.field(HeaderField::UNIX_FDS) {
            Some(Value::UInt32(n)) => Some(*n),
            _ => None,
        }
    }

    /// Get the values of the body.
    pub fn body(&self) -> &[Value] {
        &self.body
    }

    /// Get the kind of the message.
    ///
    /// Messages of an unrecognised type code, and messages whose required
    /// header fields are absent, are [`MessageKind::Unknown`].
    pub fn kind(&self) -> MessageKind<'_> {
        match self.message_type {
            MessageType::METHOD_CALL => match (self.path(), self.member()) {
                (Some(path), Some(member)) => MessageKind::MethodCall { path, member },
                _ => MessageKind::Unknown,
            },
            MessageType::METHOD_RETURN => match self.reply_serial() {
                Some(reply_serial) => MessageKind::MethodReturn { reply_serial },
                None => MessageKind::Unknown,
            },
            MessageType::ERROR => match (self.error_name(), self.reply_serial()) {
                (Some(error_name), Some(reply_serial)) => MessageKind::Error {
                    error_name,
                    reply_serial,
                },
                _ => MessageKind::Unknown,
            },
            MessageType::SIGNAL => match self.member() {
                Some(member) => MessageKind::Signal { member },
                None => MessageKind::Unknown,
            },
            _ => MessageKind::Unknown,
        }
    }

    /// Encode the message with the given serial and endianness.
    ///
    /// Returns the complete wire image: fixed header, header-field array,
    /// end-of-header padding, and body.
    pub fn encode(&self, serial: NonZeroU32, endianness: Endianness) -> Result<Vec<u8>> {
        wire::encode(self, serial, endianness)
    }

    /// Decode one complete message from its wire image.
    pub fn decode(bytes: &[u8]) -> Result<Message> {
        wire::decode(bytes)
    }

    /// Set a header field, replacing an existing entry for the same code in
    /// place.
    pub(crate) fn set_field(&mut self, field: HeaderField, value: Value) {
        for (f, v) in &mut self.fields {
            if *f == field {
                *v = value;
                return;
            }
        }

        self.fields.push((field, value));
    }

    fn field_str(&self, field: HeaderField) -> Option<&str> {
        match self.field(field) {
            Some(Value::String(s)) => Some(s),
            Some(Value::ObjectPath(s)) => Some(s),
            Some(Value::Signature(s)) => Some(s),
            _ => None,
        }
    }
}
