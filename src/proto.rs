//! Low level constants of the D-Bus wire protocol.

use std::fmt;
use std::ops::{BitAnd, BitOr, BitXor};

/// Fixed message header length: endianness, type, flags, version, body
/// length, and serial.
pub(crate) const FIXED_HEADER_LEN: usize = 12;

/// The fixed header followed by the length prefix of the header-field array.
pub(crate) const MIN_MESSAGE_LEN: usize = FIXED_HEADER_LEN + 4;

/// The maximum length in bytes of an array body (2^26).
pub(crate) const MAX_ARRAY_LENGTH: u32 = 1 << 26;

/// The maximum length in bytes of a message body (2^27).
pub(crate) const MAX_BODY_LENGTH: u32 = 1 << 27;

macro_rules! raw_enum {
    (
        $(#[doc = $doc:literal])*
        #[repr($repr:ty)]
        $vis:vis enum $name:ident {
            $(
                $(#[$($variant_meta:meta)*])*
                $variant:ident = $value:expr
            ),* $(,)?
        }
    ) => {
        $(#[doc = $doc])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(transparent)]
        $vis struct $name(pub(crate) $repr);

        impl $name {
            $(
                $(#[$($variant_meta)*])*
                $vis const $variant: Self = Self($value);
            )*
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match *self {
                    $(Self::$variant => f.write_str(stringify!($variant)),)*
                    _ => write!(f, "UNKNOWN({})", self.0),
                }
            }
        }
    }
}

macro_rules! raw_set {
    (
        $(#[doc = $doc:literal])*
        #[repr($repr:ty)]
        $vis:vis enum $name:ident {
            $(
                $(#[$($variant_meta:meta)*])*
                $variant:ident = $value:expr
            ),* $(,)?
        }
    ) => {
        $(#[doc = $doc])*
        #[derive(Default, Clone, Copy, PartialEq, Eq)]
        #[repr(transparent)]
        $vis struct $name(pub(crate) $repr);

        impl $name {
            $(
                $(#[$($variant_meta)*])*
                $vis const $variant: Self = Self($value);
            )*
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let mut f = f.debug_set();
                let mut this = *self;

                $(
                    if Self::$variant.0 != 0 && this & Self::$variant {
                        f.entry(&stringify!($variant));
                        this = this ^ Self::$variant;
                    }
                )*

                if this.0 != 0 {
                    f.entry(&format_args!("{:b}", this.0));
                }

                f.finish()
            }
        }
    }
}

raw_enum! {
    /// The endianness marker of a message, the first byte on the wire.
    #[repr(u8)]
    pub enum Endianness {
        /// Little endian, marked by ASCII `l`.
        LITTLE = b'l',
        /// Big endian, marked by ASCII `B`.
        BIG = b'B',
    }
}

impl Endianness {
    /// Endianness of the current host.
    #[cfg(target_endian = "little")]
    pub const NATIVE: Self = Self::LITTLE;
    /// Endianness of the current host.
    #[cfg(target_endian = "big")]
    pub const NATIVE: Self = Self::BIG;
}

raw_enum! {
    /// The type of a message.
    ///
    /// Unknown type codes are representable so that messages defined by
    /// future protocol revisions survive a decode-encode round trip.
    #[repr(u8)]
    pub enum MessageType {
        /// Method call, may prompt a reply.
        METHOD_CALL = 1,
        /// Method reply with returned data.
        METHOD_RETURN = 2,
        /// Error reply.
        ERROR = 3,
        /// Signal emission.
        SIGNAL = 4,
    }
}

raw_set! {
    /// Flags inside of a D-Bus message.
    ///
    /// # Examples
    ///
    /// ```
    /// use wirebus::Flags;
    ///
    /// let flags = Flags::EMPTY | Flags::NO_REPLY_EXPECTED;
    /// assert!(flags & Flags::NO_REPLY_EXPECTED);
    /// assert!(!(flags & Flags::NO_AUTO_START));
    /// ```
    #[repr(u8)]
    pub enum Flags {
        /// An empty set of flags.
        EMPTY = 0,
        /// The message does not expect a method return or error reply.
        NO_REPLY_EXPECTED = 0x1,
        /// The bus must not launch an owner for the destination name.
        NO_AUTO_START = 0x2,
        /// The caller is prepared to wait for interactive authorization of
        /// the call, such as a polkit prompt.
        ALLOW_INTERACTIVE_AUTHORIZATION = 0x4,
    }
}

impl BitOr<Flags> for Flags {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Flags) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl BitAnd<Flags> for Flags {
    type Output = bool;

    #[inline]
    fn bitand(self, rhs: Flags) -> Self::Output {
        self.0 & rhs.0 != 0
    }
}

impl BitXor<Flags> for Flags {
    type Output = Self;

    #[inline]
    fn bitxor(self, rhs: Flags) -> Self::Output {
        Self(self.0 ^ rhs.0)
    }
}

raw_enum! {
    /// A header field code, the `y` in the `a(yv)` header-field array.
    #[repr(u8)]
    pub enum HeaderField {
        /// The object to send a call to, or that a signal is emitted from.
        PATH = 1,
        /// The interface to invoke a method call on, or that a signal is
        /// emitted from. Optional for method calls, required for signals.
        INTERFACE = 2,
        /// The member, either the method name or signal name.
        MEMBER = 3,
        /// The name of the error that occurred, for errors.
        ERROR_NAME = 4,
        /// The serial number of the message this message is a reply to.
        REPLY_SERIAL = 5,
        /// The name of the connection this message is intended for.
        DESTINATION = 6,
        /// Unique name of the sending connection, filled in by the bus.
        SENDER = 7,
        /// The signature of the message body. If omitted the body must be
        /// empty.
        SIGNATURE = 8,
        /// The number of unix file descriptors accompanying the message.
        UNIX_FDS = 9,
    }
}

impl HeaderField {
    /// The variant signature a well-formed message carries for this field.
    ///
    /// Returns `None` for field codes this implementation does not know,
    /// which are skipped on decode and never emitted on encode.
    pub(crate) fn expected_signature(self) -> Option<&'static str> {
        match self {
            HeaderField::PATH => Some("o"),
            HeaderField::INTERFACE => Some("s"),
            HeaderField::MEMBER => Some("s"),
            HeaderField::ERROR_NAME => Some("s"),
            HeaderField::REPLY_SERIAL => Some("u"),
            HeaderField::DESTINATION => Some("s"),
            HeaderField::SENDER => Some("s"),
            HeaderField::SIGNATURE => Some("g"),
            HeaderField::UNIX_FDS => Some("u"),
            _ => None,
        }
    }
}
