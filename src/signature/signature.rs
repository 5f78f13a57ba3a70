use std::fmt;
use std::ops::Deref;
use std::str::FromStr;

use super::{parse_many, SignatureError};

/// A validated D-Bus signature string.
///
/// A `Signature` holds any concatenation of complete types, including the
/// empty one. Construction parses the string, so every held signature is
/// well-formed.
///
/// # Examples
///
/// ```
/// use wirebus::Signature;
///
/// let sig = Signature::new("a{sv}")?;
/// assert_eq!(sig.as_str(), "a{sv}");
/// assert!(Signature::new("a{sss}").is_err());
/// # Ok::<_, wirebus::SignatureError>(())
/// ```
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Signature {
    inner: Box<str>,
}

impl Signature {
    /// Construct a new signature, validating it.
    pub fn new(signature: &str) -> Result<Self, SignatureError> {
        parse_many(signature)?;

        Ok(Self {
            inner: signature.into(),
        })
    }

    /// The empty signature.
    pub fn empty() -> Self {
        Self { inner: "".into() }
    }

    /// Access the signature as a string.
    pub fn as_str(&self) -> &str {
        &self.inner
    }

    /// Test if the signature is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl Deref for Signature {
    type Target = str;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl Default for Signature {
    #[inline]
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Display for Signature {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner)
    }
}

impl fmt::Debug for Signature {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({:?})", &*self.inner)
    }
}

impl FromStr for Signature {
    type Err = SignatureError;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<&str> for Signature {
    type Error = SignatureError;

    #[inline]
    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl PartialEq<str> for Signature {
    #[inline]
    fn eq(&self, other: &str) -> bool {
        *self.inner == *other
    }
}

impl PartialEq<&str> for Signature {
    #[inline]
    fn eq(&self, other: &&str) -> bool {
        *self.inner == **other
    }
}
