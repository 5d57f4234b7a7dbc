//! Borrowed-or-owned UTF-8 text
//!
//! Names, messages and member keys move through the engine as `Text`:
//! - Borrowed text points at a region that outlives it (static strings,
//!   keys inside the document being validated)
//! - Owned text holds its own copy and frees it on drop
//! - Equality, ordering and hashing look only at the bytes

use std::borrow::{Borrow, Cow};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;

use serde::{Serialize, Serializer};

/// How a `Text` is constructed from a byte region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextMode {
    /// Point at the caller's region
    Borrow,
    /// Take a private copy
    Copy,
}

/// A UTF-8 string that is either borrowed or owned.
pub struct Text<'a> {
    inner: Cow<'a, str>,
}

impl<'a> Text<'a> {
    /// Creates a text over `value` using the given mode.
    pub fn new(value: &'a str, mode: TextMode) -> Self {
        match mode {
            TextMode::Borrow => Self::borrowed(value),
            TextMode::Copy => Self::owned(value.to_owned()),
        }
    }

    /// Borrows `value` without copying.
    pub const fn borrowed(value: &'a str) -> Self {
        Self {
            inner: Cow::Borrowed(value),
        }
    }

    /// Takes ownership of `value`.
    pub fn owned(value: String) -> Self {
        Self {
            inner: Cow::Owned(value),
        }
    }

    /// The empty text. Never allocates.
    pub const fn no_text() -> Self {
        Self::borrowed("")
    }

    /// Returns a borrowed view of this text.
    pub fn view(&self) -> Text<'_> {
        Text::borrowed(&self.inner)
    }

    /// Detaches from any borrowed region, copying if needed.
    pub fn into_owned(self) -> Text<'static> {
        Text {
            inner: Cow::Owned(self.inner.into_owned()),
        }
    }

    /// Returns true when this text owns its bytes.
    pub fn is_owned(&self) -> bool {
        matches!(self.inner, Cow::Owned(_))
    }

    pub fn as_str(&self) -> &str {
        &self.inner
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.inner.as_bytes()
    }

    /// Byte-wise lexicographic comparison.
    pub fn compare(&self, other: &Text<'_>) -> Ordering {
        self.as_bytes().cmp(other.as_bytes())
    }
}

impl Clone for Text<'_> {
    /// Cloning always copies, so the clone never depends on the source region.
    fn clone(&self) -> Self {
        Text::owned(self.inner.to_string())
    }
}

impl Default for Text<'_> {
    fn default() -> Self {
        Self::no_text()
    }
}

impl Deref for Text<'_> {
    type Target = str;

    fn deref(&self) -> &str {
        &self.inner
    }
}

impl AsRef<str> for Text<'_> {
    fn as_ref(&self) -> &str {
        &self.inner
    }
}

impl Borrow<str> for Text<'_> {
    fn borrow(&self) -> &str {
        &self.inner
    }
}

impl PartialEq for Text<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Eq for Text<'_> {}

impl PartialEq<str> for Text<'_> {
    fn eq(&self, other: &str) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl PartialEq<&str> for Text<'_> {
    fn eq(&self, other: &&str) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl PartialOrd for Text<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Text<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(other)
    }
}

impl Hash for Text<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Must agree with `str`'s hash so `Borrow<str>` lookups work.
        self.as_str().hash(state)
    }
}

impl fmt::Debug for Text<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_str(), f)
    }
}

impl fmt::Display for Text<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'a> From<&'a str> for Text<'a> {
    fn from(value: &'a str) -> Self {
        Text::borrowed(value)
    }
}

impl From<String> for Text<'_> {
    fn from(value: String) -> Self {
        Text::owned(value)
    }
}

impl Serialize for Text<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;
    use std::collections::HashSet;

    fn hash_of<T: Hash + ?Sized>(value: &T) -> u64 {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_borrow_and_copy_modes() {
        let source = String::from("garlic");
        let borrowed = Text::new(&source, TextMode::Borrow);
        let copied = Text::new(&source, TextMode::Copy);

        assert!(!borrowed.is_owned());
        assert!(copied.is_owned());
        assert_eq!(borrowed, copied);
    }

    #[test]
    fn test_clone_always_copies() {
        let text = Text::borrowed("static");
        let clone = text.clone();
        assert!(clone.is_owned());
        assert_eq!(clone, "static");
    }

    #[test]
    fn test_view_borrows() {
        let text = Text::owned("owned".to_string());
        let view = text.view();
        assert!(!view.is_owned());
        assert_eq!(view.as_ptr(), text.as_ptr());
    }

    #[test]
    fn test_compare_is_bytewise() {
        let a = Text::borrowed("abc");
        let b = Text::borrowed("abd");
        assert_eq!(a.compare(&b), Ordering::Less);
        assert_eq!(b.compare(&a), Ordering::Greater);
        assert_eq!(a.compare(&a.clone()), Ordering::Equal);
    }

    #[test]
    fn test_hash_matches_str() {
        let text = Text::owned("key".to_string());
        assert_eq!(hash_of(&text), hash_of("key"));

        let mut set = HashSet::new();
        set.insert(Text::borrowed("key"));
        assert!(set.contains("key"));
    }

    #[test]
    fn test_no_text_is_empty() {
        let text = Text::no_text();
        assert!(text.is_empty());
        assert!(!text.is_owned());
    }
}
