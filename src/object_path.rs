use std::fmt;
use std::ops::Deref;
use std::str::FromStr;

use crate::error::{Error, ErrorKind, Result};

/// A validated D-Bus object path.
///
/// A path is a sequence of `/`-separated components of ASCII alphanumerics
/// and underscores, starting with `/` and with no empty or trailing
/// component. The root path `/` is valid.
///
/// Typed message constructors take an `ObjectPath`; the dynamic marshaller
/// deliberately accepts any UTF-8 string under `o` so that decoding foreign
/// messages is not stricter than the bus itself.
///
/// # Examples
///
/// ```
/// use wirebus::ObjectPath;
///
/// let path: ObjectPath = "/org/freedesktop/DBus".parse()?;
/// assert_eq!(path.as_str(), "/org/freedesktop/DBus");
///
/// assert!("/ends/with/".parse::<ObjectPath>().is_err());
/// assert!("relative".parse::<ObjectPath>().is_err());
/// # Ok::<_, wirebus::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectPath {
    inner: Box<str>,
}

impl ObjectPath {
    /// Construct a new object path, validating it.
    pub fn new(path: &str) -> Result<Self> {
        if !is_valid(path) {
            return Err(Error::new(ErrorKind::InvalidObjectPath(path.into())));
        }

        Ok(Self { inner: path.into() })
    }

    /// Access the path as a string.
    pub fn as_str(&self) -> &str {
        &self.inner
    }
}

/// The root path is valid on its own; anything else is the root followed by
/// non-empty components of ASCII alphanumerics and underscores.
fn is_valid(path: &str) -> bool {
    match path.strip_prefix('/') {
        None => false,
        Some("") => true,
        Some(rest) => rest.split('/').all(|component| {
            !component.is_empty()
                && component
                    .bytes()
                    .all(|b| b.is_ascii_alphanumeric() || b == b'_')
        }),
    }
}

impl Deref for ObjectPath {
    type Target = str;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl fmt::Display for ObjectPath {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner)
    }
}

impl FromStr for ObjectPath {
    type Err = Error;

    #[inline]
    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<&str> for ObjectPath {
    type Error = Error;

    #[inline]
    fn try_from(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::is_valid;

    #[test]
    fn object_path_validation() {
        assert!(is_valid("/"));
        assert!(is_valid("/org"));
        assert!(is_valid("/org/freedesktop/DBus"));
        assert!(is_valid("/org/freedesktop/D_Bus1"));

        assert!(!is_valid(""));
        assert!(!is_valid("org"));
        assert!(!is_valid("/org/"));
        assert!(!is_valid("//org"));
        assert!(!is_valid("/org//freedesktop"));
        assert!(!is_valid("/org/free-desktop"));
        assert!(!is_valid("/org/free desktop"));
        assert!(!is_valid("/org/fr\u{e9}edesktop"));
    }
}
