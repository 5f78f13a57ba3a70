use std::str;

use crate::error::{Error, ErrorKind, Result};
use crate::proto::{Endianness, MAX_ARRAY_LENGTH};
use crate::signature::{parse_many, parse_one, Signature, SignatureError, SignatureErrorKind};
use crate::ty::{Ty, TypeCode};
use crate::value::Value;
use crate::Frame;

/// A read cursor over the bytes of one marshalled message.
///
/// Offset zero of the underlying slice is the start of the message, which is
/// what padding is measured against; decoding a bare body works because a
/// message body always starts on an 8-byte boundary.
///
/// # Examples
///
/// ```
/// use wirebus::{Endianness, ReadBuf, Value};
///
/// let mut buf = ReadBuf::new(&[3, 0, 0, 0, b'f', b'o', b'o', 0], Endianness::LITTLE);
/// assert_eq!(buf.read("s")?, Value::from("foo"));
/// assert!(buf.is_empty());
/// # Ok::<_, wirebus::Error>(())
/// ```
pub struct ReadBuf<'a> {
    data: &'a [u8],
    at: usize,
    endianness: Endianness,
}

impl<'a> ReadBuf<'a> {
    /// Construct a new read buffer over `data`.
    pub fn new(data: &'a [u8], endianness: Endianness) -> Self {
        Self {
            data,
            at: 0,
            endianness,
        }
    }

    /// Get the endianness of the buffer.
    pub fn endianness(&self) -> Endianness {
        self.endianness
    }

    /// The current read position.
    pub fn pos(&self) -> usize {
        self.at
    }

    /// Number of bytes remaining.
    pub fn len(&self) -> usize {
        self.data.len() - self.at
    }

    /// Test if the buffer has been fully consumed.
    pub fn is_empty(&self) -> bool {
        self.at == self.data.len()
    }

    /// Take `n` bytes from the buffer.
    pub(crate) fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.len() < n {
            return Err(Error::new(ErrorKind::BufferUnderflow {
                needed: n,
                remaining: self.len(),
            }));
        }

        let bytes = &self.data[self.at..self.at + n];
        self.at += n;
        Ok(bytes)
    }

    /// Advance past padding to the next multiple of `alignment`.
    pub fn skip_padding(&mut self, alignment: usize) -> Result<()> {
        let padding = self.at.wrapping_neg() % alignment;

        if self.len() < padding {
            return Err(Error::new(ErrorKind::BufferUnderflow {
                needed: padding,
                remaining: self.len(),
            }));
        }

        self.at += padding;
        Ok(())
    }

    /// Align to and load a fixed-size value in the buffer endianness.
    pub fn load<T>(&mut self) -> Result<T>
    where
        T: Frame,
    {
        self.skip_padding(T::SIZE)?;
        let bytes = self.take(T::SIZE)?;
        Ok(T::get(bytes, self.endianness))
    }

    /// Read a string marshalled as `s` or `o`: 32-bit length, contents,
    /// NUL. Rejects invalid UTF-8 and a missing terminator.
    pub fn read_str(&mut self) -> Result<&'a str> {
        let len = self.load::<u32>()? as usize;
        let bytes = self.take(len)?;

        if self.take(1)? != [0] {
            return Err(Error::new(ErrorKind::NotNulTerminated));
        }

        Ok(str::from_utf8(bytes)?)
    }

    /// Read a signature marshalled as `g`: single length byte, contents,
    /// NUL.
    pub fn read_signature(&mut self) -> Result<&'a str> {
        let len = self.load::<u8>()? as usize;
        let bytes = self.take(len)?;

        if self.take(1)? != [0] {
            return Err(Error::new(ErrorKind::NotNulTerminated));
        }

        Ok(str::from_utf8(bytes)?)
    }

    /// Parse `signature` as a single complete type and read one value under
    /// it.
    pub fn read(&mut self, signature: &str) -> Result<Value> {
        let ty = parse_one(signature)?;
        self.read_value(&ty)
    }

    /// Parse `signature` as a sequence of complete types and read one value
    /// under each.
    pub fn read_many(&mut self, signature: &str) -> Result<Vec<Value>> {
        let types = parse_many(signature)?;
        let mut values = Vec::with_capacity(types.len());

        for ty in &types {
            values.push(self.read_value(ty)?);
        }

        Ok(values)
    }

    /// Read a value under an already-parsed type descriptor.
    pub(crate) fn read_value(&mut self, ty: &Ty) -> Result<Value> {
        match ty {
            Ty::Primitive(code) => self.read_primitive(*code),
            Ty::Variant => {
                let signature = self.read_signature()?;
                let inner = parse_one(signature)?;
                let signature = Signature::new(signature)?;
                let value = self.read_value(&inner)?;
                Ok(Value::variant(signature, value))
            }
            Ty::Array(elem) => {
                let len = self.load::<u32>()? as usize;

                if len > MAX_ARRAY_LENGTH as usize {
                    return Err(Error::new(ErrorKind::ArrayTooLong(len)));
                }

                self.skip_padding(elem.alignment())?;
                let end = self.at + len;

                if end > self.data.len() {
                    return Err(Error::new(ErrorKind::BufferUnderflow {
                        needed: len,
                        remaining: self.len(),
                    }));
                }

                match &**elem {
                    Ty::DictEntry(key_ty, value_ty) => {
                        let mut entries: Vec<(Value, Value)> = Vec::new();

                        while self.at < end {
                            self.skip_padding(8)?;
                            let key = self.read_value(key_ty)?;
                            let value = self.read_value(value_ty)?;

                            if entries.iter().any(|(k, _)| *k == key) {
                                return Err(Error::new(ErrorKind::DuplicateDictKey));
                            }

                            entries.push((key, value));
                        }

                        self.check_array_end(end)?;
                        Ok(Value::Dict(entries))
                    }
                    _ => {
                        let mut items = Vec::new();

                        while self.at < end {
                            items.push(self.read_value(elem)?);
                        }

                        self.check_array_end(end)?;
                        Ok(Value::Array(items))
                    }
                }
            }
            Ty::Struct(fields) => {
                self.skip_padding(8)?;
                let mut values = Vec::with_capacity(fields.len());

                for field in fields {
                    values.push(self.read_value(field)?);
                }

                Ok(Value::Struct(values))
            }
            Ty::DictEntry(..) => Err(Error::new(ErrorKind::Signature(SignatureError::new(
                SignatureErrorKind::DictEntryOutsideArray,
            )))),
        }
    }

    /// An element read past the declared end of its array is a protocol
    /// error, not a length rounding artifact.
    fn check_array_end(&self, end: usize) -> Result<()> {
        if self.at > end {
            return Err(Error::new(ErrorKind::ArrayOverrun { at: self.at, end }));
        }

        Ok(())
    }

    fn read_primitive(&mut self, code: TypeCode) -> Result<Value> {
        Ok(match code {
            TypeCode::Byte => Value::Byte(self.load::<u8>()?),
            TypeCode::Boolean => match self.load::<u32>()? {
                0 => Value::Boolean(false),
                1 => Value::Boolean(true),
                n => return Err(Error::new(ErrorKind::InvalidBoolean(n))),
            },
            TypeCode::Int16 => Value::Int16(self.load::<i16>()?),
            TypeCode::UInt16 => Value::UInt16(self.load::<u16>()?),
            TypeCode::Int32 => Value::Int32(self.load::<i32>()?),
            TypeCode::UInt32 => Value::UInt32(self.load::<u32>()?),
            TypeCode::Int64 => Value::Int64(self.load::<i64>()?),
            TypeCode::UInt64 => Value::UInt64(self.load::<u64>()?),
            TypeCode::Double => Value::Double(self.load::<f64>()?),
            TypeCode::UnixFd => Value::UnixFd(self.load::<u32>()?),
            TypeCode::String => Value::String(self.read_str()?.to_string()),
            TypeCode::ObjectPath => Value::ObjectPath(self.read_str()?.to_string()),
            TypeCode::Signature => Value::Signature(self.read_signature()?.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BodyBuf;

    fn round_trip(signature: &str, value: Value) {
        for endianness in [Endianness::LITTLE, Endianness::BIG] {
            let mut buf = BodyBuf::with_endianness(endianness);
            buf.write(signature, &value).expect("write");

            let mut read = ReadBuf::new(buf.get(), endianness);
            let decoded = read.read(signature).expect("read");

            assert_eq!(decoded, value, "round trip of '{signature}'");
            assert!(read.is_empty(), "no trailing bytes for '{signature}'");
        }
    }

    #[test]
    fn primitive_round_trips() {
        round_trip("y", Value::Byte(255));
        round_trip("b", Value::Boolean(true));
        round_trip("n", Value::Int16(-2));
        round_trip("q", Value::UInt16(65535));
        round_trip("i", Value::Int32(-42));
        round_trip("u", Value::UInt32(0xdead_beef));
        round_trip("x", Value::Int64(i64::MIN));
        round_trip("t", Value::UInt64(u64::MAX));
        round_trip("d", Value::Double(2.5));
        round_trip("h", Value::UnixFd(3));
        round_trip("s", Value::from("Hello World!"));
        round_trip("o", Value::ObjectPath("/org/freedesktop/DBus".to_string()));
        round_trip("g", Value::Signature("a{sv}".to_string()));
    }

    #[test]
    fn container_round_trips() {
        round_trip("ay", Value::Array(vec![Value::Byte(1), Value::Byte(2)]));
        round_trip("ay", Value::Array(vec![]));
        round_trip("as", Value::Array(vec![]));
        round_trip(
            "aas",
            Value::Array(vec![
                Value::Array(vec![Value::from("a"), Value::from("b")]),
                Value::Array(vec![]),
            ]),
        );
        round_trip(
            "(y(b(ss)b)y)",
            Value::Struct(vec![
                Value::Byte(1),
                Value::Struct(vec![
                    Value::Boolean(false),
                    Value::Struct(vec![Value::from("x"), Value::from("y")]),
                    Value::Boolean(true),
                ]),
                Value::Byte(2),
            ]),
        );
        round_trip(
            "a{sv}",
            Value::Dict(vec![
                (
                    Value::from("a"),
                    Value::variant(Signature::new("u").expect("valid"), Value::UInt32(1)),
                ),
                (
                    Value::from("b"),
                    Value::variant(Signature::new("ay").expect("valid"), Value::Array(vec![])),
                ),
            ]),
        );
        round_trip("a{sv}", Value::Dict(vec![]));
        round_trip(
            "v",
            Value::variant(
                Signature::new("(ii)").expect("valid"),
                Value::Struct(vec![Value::Int32(1), Value::Int32(2)]),
            ),
        );
    }

    #[test]
    fn invalid_boolean() {
        let mut read = ReadBuf::new(&[2, 0, 0, 0], Endianness::LITTLE);
        let err = read.read("b").expect_err("invalid boolean");
        assert_eq!(err.to_string(), "invalid boolean value 2, expected 0 or 1");
    }

    #[test]
    fn duplicate_dict_key() {
        let mut buf = BodyBuf::with_endianness(Endianness::LITTLE);
        buf.write(
            "a{yy}",
            &Value::Dict(vec![
                (Value::Byte(1), Value::Byte(2)),
                (Value::Byte(1), Value::Byte(3)),
            ]),
        )
        .expect("write time does not check");

        let mut read = ReadBuf::new(buf.get(), Endianness::LITTLE);
        let err = read.read("a{yy}").expect_err("duplicate key");
        assert_eq!(err.to_string(), "duplicate key in dictionary");
    }

    #[test]
    fn array_overrun() {
        // Array of u32 with a declared length of 3 bytes: the element read
        // crosses the boundary.
        let bytes = [3, 0, 0, 0, 1, 0, 0, 0];
        let mut read = ReadBuf::new(&bytes, Endianness::LITTLE);
        let err = read.read("au").expect_err("overrun");
        assert!(matches!(err.kind(), ErrorKind::ArrayOverrun { .. }));
    }

    #[test]
    fn dict_preserves_order() {
        let entries = vec![
            (Value::from("z"), Value::Byte(1)),
            (Value::from("a"), Value::Byte(2)),
            (Value::from("m"), Value::Byte(3)),
        ];

        let mut buf = BodyBuf::with_endianness(Endianness::LITTLE);
        buf.write("a{sy}", &Value::Dict(entries.clone())).expect("write");

        let mut read = ReadBuf::new(buf.get(), Endianness::LITTLE);
        assert_eq!(read.read("a{sy}").expect("read"), Value::Dict(entries));
    }

    #[test]
    fn truncated_string() {
        let bytes = [5, 0, 0, 0, b'a'];
        let mut read = ReadBuf::new(&bytes, Endianness::LITTLE);
        let err = read.read("s").expect_err("underflow");
        assert!(matches!(err.kind(), ErrorKind::BufferUnderflow { .. }));
    }

    #[test]
    fn invalid_utf8_rejected() {
        let bytes = [2, 0, 0, 0, 0xff, 0xfe, 0];
        let mut read = ReadBuf::new(&bytes, Endianness::LITTLE);
        let err = read.read("s").expect_err("utf-8");
        assert!(matches!(err.kind(), ErrorKind::InvalidUtf8(..)));
    }
}
