use std::error;
use std::fmt;
use std::io;
use std::str::Utf8Error;

use crate::proto::{HeaderField, MAX_ARRAY_LENGTH, MAX_BODY_LENGTH};
use crate::SignatureError;

/// Result alias using an [`Error`] as the error type by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// An error raised by this crate.
///
/// The kinds fall into the broad classes of failure the protocol admits:
/// signature errors from the parser, domain errors from the writer (range,
/// type, and arity mismatches), protocol errors from the reader (malformed
/// wire data), transport and authentication errors from the connection, and
/// error replies originated by the peer.
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
}

impl Error {
    #[inline]
    pub(crate) fn new(kind: ErrorKind) -> Error {
        Self { kind }
    }

    #[inline]
    pub(crate) fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// The D-Bus error name if this is an error reply from a peer, such as
    /// `org.freedesktop.DBus.Error.UnknownMethod`.
    pub fn error_name(&self) -> Option<&str> {
        match &self.kind {
            ErrorKind::MethodError { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Test if the error was caused by the connection shutting down.
    pub fn is_closed(&self) -> bool {
        matches!(self.kind, ErrorKind::ConnectionClosed)
    }
}

impl From<SignatureError> for Error {
    #[inline]
    fn from(error: SignatureError) -> Self {
        Self::new(ErrorKind::Signature(error))
    }
}

impl From<io::Error> for Error {
    #[inline]
    fn from(error: io::Error) -> Self {
        Self::new(ErrorKind::Io(error))
    }
}

impl From<Utf8Error> for Error {
    #[inline]
    fn from(error: Utf8Error) -> Self {
        Self::new(ErrorKind::InvalidUtf8(error))
    }
}

impl From<ErrorKind> for Error {
    #[inline]
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ErrorKind::Signature(error) => error.fmt(f),
            ErrorKind::Io(error) => error.fmt(f),
            ErrorKind::InvalidUtf8(error) => error.fmt(f),
            ErrorKind::UnexpectedEof { got, requested } => {
                write!(f, "unexpected end of stream: got {got} of {requested} bytes")
            }
            ErrorKind::ConnectionClosed => write!(f, "connection closed"),
            ErrorKind::MissingBus => write!(f, "missing session bus address"),
            ErrorKind::InvalidAddress(address) => {
                write!(f, "unsupported d-bus address `{address}`")
            }
            ErrorKind::InvalidObjectPath(path) => {
                write!(f, "invalid object path `{path}`")
            }
            ErrorKind::Auth(line) => write!(f, "authentication rejected: {line}"),
            ErrorKind::OutOfRange {
                value,
                min,
                max,
                code,
            } => {
                write!(f, "value {value} out of range {min}..={max} for type '{code}'")
            }
            ErrorKind::TypeMismatch { expected, found } => {
                write!(f, "expected value of type '{expected}', got {found}")
            }
            ErrorKind::ArityMismatch { expected, found } => {
                write!(f, "signature describes {expected} values, got {found}")
            }
            ErrorKind::SignatureTooLong(len) => {
                write!(f, "signature of length {len} is too long (max is 255)")
            }
            ErrorKind::MethodError { name, message } => match message {
                Some(message) => write!(f, "{name}: {message}"),
                None => write!(f, "{name}"),
            },
            ErrorKind::InvalidEndianness(byte) => {
                write!(f, "invalid endianness marker 0x{byte:02x}, expected 'l' or 'B'")
            }
            ErrorKind::UnsupportedVersion(version) => {
                write!(f, "unsupported protocol version {version}, expected 1")
            }
            ErrorKind::ZeroSerial => write!(f, "zero serial in message header"),
            ErrorKind::ZeroReplySerial => write!(f, "zero REPLY_SERIAL header field"),
            ErrorKind::InvalidBoolean(value) => {
                write!(f, "invalid boolean value {value}, expected 0 or 1")
            }
            ErrorKind::ArrayOverrun { at, end } => {
                write!(f, "array element read to position {at}, past the end of the array at {end}")
            }
            ErrorKind::DuplicateDictKey => write!(f, "duplicate key in dictionary"),
            ErrorKind::DuplicateHeaderField(field) => {
                write!(f, "duplicate header field {field:?}")
            }
            ErrorKind::InvalidHeaderField {
                field,
                expected,
                found,
            } => {
                write!(
                    f,
                    "header field {field:?} has signature '{found}', expected '{expected}'"
                )
            }
            ErrorKind::MissingHeaderField(name) => {
                write!(f, "missing required {name} header field")
            }
            ErrorKind::BufferUnderflow { needed, remaining } => {
                write!(f, "buffer underflow: needed {needed} bytes, {remaining} remaining")
            }
            ErrorKind::NotNulTerminated => write!(f, "string is not nul terminated"),
            ErrorKind::ArrayTooLong(len) => {
                write!(f, "array of length {len} is too long (max is {MAX_ARRAY_LENGTH})")
            }
            ErrorKind::BodyTooLong(len) => {
                write!(f, "body of length {len} is too long (max is {MAX_BODY_LENGTH})")
            }
            ErrorKind::TrailingBytes(len) => {
                write!(f, "{len} trailing bytes after the last value of the body")
            }
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match &self.kind {
            ErrorKind::Signature(error) => Some(error),
            ErrorKind::Io(error) => Some(error),
            ErrorKind::InvalidUtf8(error) => Some(error),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub(crate) enum ErrorKind {
    Signature(SignatureError),
    Io(io::Error),
    InvalidUtf8(Utf8Error),
    UnexpectedEof {
        got: usize,
        requested: usize,
    },
    ConnectionClosed,
    MissingBus,
    InvalidAddress(String),
    InvalidObjectPath(Box<str>),
    Auth(String),
    OutOfRange {
        value: i128,
        min: i128,
        max: i128,
        code: char,
    },
    TypeMismatch {
        expected: String,
        found: &'static str,
    },
    ArityMismatch {
        expected: usize,
        found: usize,
    },
    SignatureTooLong(usize),
    MethodError {
        name: String,
        message: Option<String>,
    },
    InvalidEndianness(u8),
    UnsupportedVersion(u8),
    ZeroSerial,
    ZeroReplySerial,
    InvalidBoolean(u32),
    ArrayOverrun {
        at: usize,
        end: usize,
    },
    DuplicateDictKey,
    DuplicateHeaderField(HeaderField),
    InvalidHeaderField {
        field: HeaderField,
        expected: &'static str,
        found: Box<str>,
    },
    MissingHeaderField(&'static str),
    BufferUnderflow {
        needed: usize,
        remaining: usize,
    },
    NotNulTerminated,
    ArrayTooLong(usize),
    BodyTooLong(usize),
    TrailingBytes(usize),
}
