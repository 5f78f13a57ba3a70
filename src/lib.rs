//! A pure Rust client implementation of the [D-Bus wire format], major
//! version 1.
//!
//! The crate is organised leaves first: the [`proto`] constants and the type
//! model drive a recursive, alignment-sensitive marshaller ([`BodyBuf`] /
//! [`ReadBuf`]), which in turn backs whole-message framing ([`Message`]) and
//! an asynchronous bus [`Connection`] with SASL authentication and
//! serial-correlated replies.
//!
//! [D-Bus wire format]: https://dbus.freedesktop.org/doc/dbus-specification.html

#[doc(inline)]
pub use self::error::{Error, Result};
mod error;

#[doc(inline)]
pub use self::proto::{Endianness, Flags, HeaderField, MessageType};
pub mod proto;

pub use self::frame::Frame;
mod frame;

#[doc(inline)]
pub use self::ty::{Ty, TypeCode};
mod ty;

#[doc(inline)]
pub use self::signature::{parse_many, parse_one, Signature, SignatureError};
mod signature;

#[doc(inline)]
pub use self::value::{Value, Variant};
mod value;

#[doc(inline)]
pub use self::body_buf::{ArrayWriter, BodyBuf, StructWriter};
mod body_buf;

#[doc(inline)]
pub use self::read_buf::ReadBuf;
mod read_buf;

#[doc(inline)]
pub use self::object_path::ObjectPath;
mod object_path;

pub mod sasl;

pub use self::message::{Message, MessageKind};
mod message;

#[cfg(feature = "tokio")]
pub use self::connection::Connection;
#[cfg(feature = "tokio")]
mod connection;
