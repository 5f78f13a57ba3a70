use std::fmt;

/// A primitive D-Bus type code.
///
/// This is the closed set of single-character codes that denote a complete
/// type on their own: the fixed-size numerics plus the three string-like
/// types. Container codes (`a`, `v`, parentheses and braces) only appear in
/// composition and are represented by [`Ty`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeCode {
    /// `y`, unsigned 8-bit integer.
    Byte,
    /// `b`, boolean, marshalled as 32 bits carrying 0 or 1.
    Boolean,
    /// `n`, signed 16-bit integer.
    Int16,
    /// `q`, unsigned 16-bit integer.
    UInt16,
    /// `i`, signed 32-bit integer.
    Int32,
    /// `u`, unsigned 32-bit integer.
    UInt32,
    /// `x`, signed 64-bit integer.
    Int64,
    /// `t`, unsigned 64-bit integer.
    UInt64,
    /// `d`, IEEE-754 double.
    Double,
    /// `h`, index into the out-of-band file descriptor array.
    UnixFd,
    /// `s`, UTF-8 string.
    String,
    /// `o`, object path, marshalled like `s`.
    ObjectPath,
    /// `g`, signature, length-prefixed with a single byte.
    Signature,
}

impl TypeCode {
    /// Look up the type code denoted by `c`.
    pub fn from_char(c: char) -> Option<Self> {
        Some(match c {
            'y' => TypeCode::Byte,
            'b' => TypeCode::Boolean,
            'n' => TypeCode::Int16,
            'q' => TypeCode::UInt16,
            'i' => TypeCode::Int32,
            'u' => TypeCode::UInt32,
            'x' => TypeCode::Int64,
            't' => TypeCode::UInt64,
            'd' => TypeCode::Double,
            'h' => TypeCode::UnixFd,
            's' => TypeCode::String,
            'o' => TypeCode::ObjectPath,
            'g' => TypeCode::Signature,
            _ => return None,
        })
    }

    /// The character denoting this type in a signature.
    pub fn as_char(self) -> char {
        match self {
            TypeCode::Byte => 'y',
            TypeCode::Boolean => 'b',
            TypeCode::Int16 => 'n',
            TypeCode::UInt16 => 'q',
            TypeCode::Int32 => 'i',
            TypeCode::UInt32 => 'u',
            TypeCode::Int64 => 'x',
            TypeCode::UInt64 => 't',
            TypeCode::Double => 'd',
            TypeCode::UnixFd => 'h',
            TypeCode::String => 's',
            TypeCode::ObjectPath => 'o',
            TypeCode::Signature => 'g',
        }
    }

    /// The marshalled size of the type, or `None` for the string-like types
    /// whose size depends on their contents.
    pub fn fixed_size(self) -> Option<usize> {
        Some(match self {
            TypeCode::Byte => 1,
            TypeCode::Boolean => 4,
            TypeCode::Int16 | TypeCode::UInt16 => 2,
            TypeCode::Int32 | TypeCode::UInt32 | TypeCode::UnixFd => 4,
            TypeCode::Int64 | TypeCode::UInt64 | TypeCode::Double => 8,
            TypeCode::String | TypeCode::ObjectPath | TypeCode::Signature => return None,
        })
    }

    /// The natural alignment of the type.
    ///
    /// Fixed types align to their size. `s` and `o` align to their 32-bit
    /// length prefix, `g` to its single length byte.
    pub fn alignment(self) -> usize {
        match self.fixed_size() {
            Some(size) => size,
            None => match self {
                TypeCode::Signature => 1,
                _ => 4,
            },
        }
    }

    /// Test if the type has a fixed marshalled size.
    pub fn is_fixed(self) -> bool {
        self.fixed_size().is_some()
    }

    /// Test if the type is one of `s`, `o` or `g`.
    pub fn is_string_like(self) -> bool {
        matches!(
            self,
            TypeCode::String | TypeCode::ObjectPath | TypeCode::Signature
        )
    }
}

impl fmt::Display for TypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// A parsed type descriptor, the output of the signature parser.
///
/// Dict entries only appear as the element of an array; `a{sv}` parses to
/// `Array(DictEntry(Primitive(String), Variant))`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ty {
    /// One of the primitive type codes.
    Primitive(TypeCode),
    /// `v`, a value carrying its own signature.
    Variant,
    /// An array of a single element type.
    Array(Box<Ty>),
    /// A struct with one or more fields.
    Struct(Vec<Ty>),
    /// A key-value pair inside an array.
    DictEntry(Box<Ty>, Box<Ty>),
}

impl Ty {
    /// The alignment of the first marshalled byte of a value of this type.
    pub fn alignment(&self) -> usize {
        match self {
            Ty::Primitive(code) => code.alignment(),
            Ty::Variant => 1,
            Ty::Array(..) => 4,
            Ty::Struct(..) | Ty::DictEntry(..) => 8,
        }
    }

    /// The marshalled size if every value of this type occupies the same
    /// number of bytes.
    pub fn fixed_size(&self) -> Option<usize> {
        match self {
            Ty::Primitive(code) => code.fixed_size(),
            _ => None,
        }
    }

    /// Test if this is a basic type, permitted as a dictionary key.
    pub fn is_basic(&self) -> bool {
        matches!(self, Ty::Primitive(..))
    }

    fn write_signature(&self, out: &mut String) {
        match self {
            Ty::Primitive(code) => out.push(code.as_char()),
            Ty::Variant => out.push('v'),
            Ty::Array(elem) => {
                out.push('a');
                elem.write_signature(out);
            }
            Ty::Struct(fields) => {
                out.push('(');

                for field in fields {
                    field.write_signature(out);
                }

                out.push(')');
            }
            Ty::DictEntry(key, value) => {
                out.push('{');
                key.write_signature(out);
                value.write_signature(out);
                out.push('}');
            }
        }
    }
}

/// Renders the signature the descriptor was parsed from.
impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        self.write_signature(&mut out);
        f.write_str(&out)
    }
}
