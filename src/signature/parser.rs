use crate::ty::{Ty, TypeCode};

use super::{SignatureError, SignatureErrorKind};

/// The maximum length of a signature, bounded by its single-byte length
/// prefix on the wire.
pub(crate) const MAX_SIGNATURE_LEN: usize = 255;

/// Nesting limits of the D-Bus specification.
const MAX_ARRAY_DEPTH: usize = 32;
const MAX_STRUCT_DEPTH: usize = 32;

/// Parse a signature containing exactly one complete type.
///
/// # Examples
///
/// ```
/// use wirebus::{parse_one, Ty, TypeCode};
///
/// let ty = parse_one("ay")?;
/// assert_eq!(ty, Ty::Array(Box::new(Ty::Primitive(TypeCode::Byte))));
///
/// assert!(parse_one("ayy").is_err());
/// # Ok::<_, wirebus::SignatureError>(())
/// ```
pub fn parse_one(signature: &str) -> Result<Ty, SignatureError> {
    if signature.len() > MAX_SIGNATURE_LEN {
        return Err(SignatureError::new(SignatureErrorKind::TooLong(
            signature.len(),
        )));
    }

    let mut parser = Parser::new(signature);
    let ty = parser.parse_type()?;

    if !parser.is_eof() {
        return Err(SignatureError::new(SignatureErrorKind::TrailingCharacters(
            parser.rest().into(),
        )));
    }

    Ok(ty)
}

/// Parse a concatenation of complete types, in order.
///
/// The empty signature parses to an empty sequence; it is the signature of an
/// empty message body.
pub fn parse_many(signature: &str) -> Result<Vec<Ty>, SignatureError> {
    if signature.len() > MAX_SIGNATURE_LEN {
        return Err(SignatureError::new(SignatureErrorKind::TooLong(
            signature.len(),
        )));
    }

    let mut parser = Parser::new(signature);
    let mut types = Vec::new();

    while !parser.is_eof() {
        types.push(parser.parse_type()?);
    }

    Ok(types)
}

/// Single-pass recursive descent over a signature string.
struct Parser<'a> {
    signature: &'a str,
    at: usize,
    arrays: usize,
    structs: usize,
}

impl<'a> Parser<'a> {
    fn new(signature: &'a str) -> Self {
        Self {
            signature,
            at: 0,
            arrays: 0,
            structs: 0,
        }
    }

    fn is_eof(&self) -> bool {
        self.at == self.signature.len()
    }

    fn rest(&self) -> &'a str {
        &self.signature[self.at..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn next(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.at += c.len_utf8();
        Some(c)
    }

    fn parse_type(&mut self) -> Result<Ty, SignatureError> {
        let Some(c) = self.next() else {
            return Err(SignatureError::new(SignatureErrorKind::Empty));
        };

        match c {
            'a' => {
                self.arrays += 1;

                if self.arrays > MAX_ARRAY_DEPTH {
                    return Err(SignatureError::new(SignatureErrorKind::ArrayDepth));
                }

                let elem = if self.peek() == Some('{') {
                    self.next();
                    self.parse_dict_entry()?
                } else {
                    self.parse_type()?
                };

                self.arrays -= 1;
                Ok(Ty::Array(Box::new(elem)))
            }
            '(' => {
                self.structs += 1;

                if self.structs > MAX_STRUCT_DEPTH {
                    return Err(SignatureError::new(SignatureErrorKind::StructDepth));
                }

                let mut fields = Vec::new();

                loop {
                    match self.peek() {
                        None => {
                            return Err(SignatureError::new(SignatureErrorKind::UnexpectedEnd(
                                ')',
                            )))
                        }
                        Some(')') => {
                            self.next();
                            break;
                        }
                        Some(..) => fields.push(self.parse_type()?),
                    }
                }

                self.structs -= 1;

                if fields.is_empty() {
                    return Err(SignatureError::new(SignatureErrorKind::EmptyStruct));
                }

                Ok(Ty::Struct(fields))
            }
            '{' => Err(SignatureError::new(
                SignatureErrorKind::DictEntryOutsideArray,
            )),
            'v' => Ok(Ty::Variant),
            c => match TypeCode::from_char(c) {
                Some(code) => Ok(Ty::Primitive(code)),
                None => Err(SignatureError::new(SignatureErrorKind::UnknownType(c))),
            },
        }
    }

    /// Parse the interior of `a{..}`, with the opening brace consumed.
    fn parse_dict_entry(&mut self) -> Result<Ty, SignatureError> {
        self.structs += 1;

        if self.structs > MAX_STRUCT_DEPTH {
            return Err(SignatureError::new(SignatureErrorKind::StructDepth));
        }

        let mut inner = Vec::new();

        loop {
            match self.peek() {
                None => {
                    return Err(SignatureError::new(SignatureErrorKind::UnexpectedEnd('}')))
                }
                Some('}') => {
                    self.next();
                    break;
                }
                Some(..) => inner.push(self.parse_type()?),
            }
        }

        self.structs -= 1;

        if inner.len() != 2 {
            return Err(SignatureError::new(SignatureErrorKind::DictEntryArity(
                inner.len(),
            )));
        }

        let (Some(value), Some(key)) = (inner.pop(), inner.pop()) else {
            return Err(SignatureError::new(SignatureErrorKind::DictEntryArity(0)));
        };

        if !key.is_basic() {
            return Err(SignatureError::new(SignatureErrorKind::NonBasicDictKey(
                key.to_string().into(),
            )));
        }

        Ok(Ty::DictEntry(Box::new(key), Box::new(value)))
    }
}
