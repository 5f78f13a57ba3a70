use std::fmt;

use crate::Signature;

/// A dynamically typed D-Bus value.
///
/// This is the value-tree counterpart of [`Ty`]: the shape a value must take
/// is decided by the signature it is written or read under, not by the value
/// itself. An empty [`Value::Array`] can therefore be written under any
/// array signature.
///
/// Dictionaries are an ordered sequence of entries. Wire order is preserved
/// on decode because receivers are permitted to resolve duplicate-free
/// lookups by first match.
///
/// [`Ty`]: crate::Ty
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// `y`.
    Byte(u8),
    /// `b`.
    Boolean(bool),
    /// `n`.
    Int16(i16),
    /// `q`.
    UInt16(u16),
    /// `i`.
    Int32(i32),
    /// `u`.
    UInt32(u32),
    /// `x`.
    Int64(i64),
    /// `t`.
    UInt64(u64),
    /// `d`.
    Double(f64),
    /// `h`, an index into the out-of-band file descriptor array. The index
    /// is marshalled; transporting the descriptor itself is out of scope.
    UnixFd(u32),
    /// `s`.
    String(String),
    /// `o`.
    ObjectPath(String),
    /// `g`.
    Signature(String),
    /// `v`, a value tagged with its own signature.
    Variant(Box<Variant>),
    /// `a<T>` for non-dict element types.
    Array(Vec<Value>),
    /// `(..)`.
    Struct(Vec<Value>),
    /// `a{KV}`, an ordered sequence of key-value entries.
    Dict(Vec<(Value, Value)>),
}

/// The payload of a [`Value::Variant`]: an inner value together with the
/// signature it is marshalled under.
#[derive(Debug, Clone, PartialEq)]
pub struct Variant {
    /// The signature of the inner value, a single complete type.
    pub signature: Signature,
    /// The inner value.
    pub value: Value,
}

impl Value {
    /// Construct a variant value.
    pub fn variant(signature: Signature, value: Value) -> Self {
        Value::Variant(Box::new(Variant { signature, value }))
    }

    /// A short name for the shape of the value, used in error messages.
    pub(crate) fn kind_str(&self) -> &'static str {
        match self {
            Value::Byte(..) => "byte",
            Value::Boolean(..) => "boolean",
            Value::Int16(..) => "int16",
            Value::UInt16(..) => "uint16",
            Value::Int32(..) => "int32",
            Value::UInt32(..) => "uint32",
            Value::Int64(..) => "int64",
            Value::UInt64(..) => "uint64",
            Value::Double(..) => "double",
            Value::UnixFd(..) => "unix fd",
            Value::String(..) => "string",
            Value::ObjectPath(..) => "object path",
            Value::Signature(..) => "signature",
            Value::Variant(..) => "variant",
            Value::Array(..) => "array",
            Value::Struct(..) => "struct",
            Value::Dict(..) => "dict",
        }
    }

    /// The value as a widened integer, if it holds one of the integer
    /// shapes. Used by the writer to coerce between integer widths with a
    /// range check.
    pub(crate) fn as_integer(&self) -> Option<i128> {
        Some(match *self {
            Value::Byte(n) => i128::from(n),
            Value::Int16(n) => i128::from(n),
            Value::UInt16(n) => i128::from(n),
            Value::Int32(n) => i128::from(n),
            Value::UInt32(n) => i128::from(n),
            Value::Int64(n) => i128::from(n),
            Value::UInt64(n) => i128::from(n),
            Value::UnixFd(n) => i128::from(n),
            _ => return None,
        })
    }

    /// The value as a string slice, if it holds one of the string-like
    /// shapes.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) | Value::ObjectPath(s) | Value::Signature(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) | Value::ObjectPath(s) | Value::Signature(s) => {
                write!(f, "{s:?}")
            }
            Value::Byte(n) => write!(f, "{n}"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Int16(n) => write!(f, "{n}"),
            Value::UInt16(n) => write!(f, "{n}"),
            Value::Int32(n) => write!(f, "{n}"),
            Value::UInt32(n) => write!(f, "{n}"),
            Value::Int64(n) => write!(f, "{n}"),
            Value::UInt64(n) => write!(f, "{n}"),
            Value::Double(n) => write!(f, "{n}"),
            Value::UnixFd(n) => write!(f, "fd#{n}"),
            Value::Variant(v) => write!(f, "<{} {}>", v.signature, v.value),
            Value::Array(items) => {
                write!(f, "[")?;

                for (n, item) in items.iter().enumerate() {
                    if n > 0 {
                        write!(f, ", ")?;
                    }

                    write!(f, "{item}")?;
                }

                write!(f, "]")
            }
            Value::Struct(fields) => {
                write!(f, "(")?;

                for (n, field) in fields.iter().enumerate() {
                    if n > 0 {
                        write!(f, ", ")?;
                    }

                    write!(f, "{field}")?;
                }

                write!(f, ")")
            }
            Value::Dict(entries) => {
                write!(f, "{{")?;

                for (n, (key, value)) in entries.iter().enumerate() {
                    if n > 0 {
                        write!(f, ", ")?;
                    }

                    write!(f, "{key}: {value}")?;
                }

                write!(f, "}}")
            }
        }
    }
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                #[inline]
                fn from(value: $ty) -> Self {
                    Value::$variant(value)
                }
            }
        )*
    }
}

impl_from! {
    u8 => Byte,
    bool => Boolean,
    i16 => Int16,
    u16 => UInt16,
    i32 => Int32,
    u32 => UInt32,
    i64 => Int64,
    u64 => UInt64,
    f64 => Double,
    String => String,
}

impl From<&str> for Value {
    #[inline]
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}
