use std::fmt;

/// One primitive component of a [`QueryKey`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyPart {
    Str(String),
    Int(i64),
    Bool(bool),
}

impl fmt::Display for KeyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(value) => f.write_str(value),
            Self::Int(value) => write!(f, "{value}"),
            Self::Bool(value) => write!(f, "{value}"),
        }
    }
}

impl From<&str> for KeyPart {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for KeyPart {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<bool> for KeyPart {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

macro_rules! int_key_part {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for KeyPart {
                fn from(value: $ty) -> Self {
                    Self::Int(i64::from(value))
                }
            }
        )*
    };
}

int_key_part!(i8, i16, i32, i64, u8, u16, u32);

/// Identifies a cached read result.
///
/// A key is an ordered tuple of primitive parts. The first part is the
/// collection tag (`"links"`), followed by the read kind and its parameters.
/// Invalidation works on prefixes: invalidating `["links"]` reaches
/// `["links", "list", ...]` and `["links", "detail", 3]` alike.
///
/// # Example
///
/// ```
/// use lexdesk::query::QueryKey;
///
/// let list = QueryKey::from("links").with("list").with(1u32);
/// assert!(list.starts_with(&QueryKey::from("links")));
/// assert_eq!(list.to_string(), "links/list/1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct QueryKey(Vec<KeyPart>);

impl QueryKey {
    /// Creates a key with the given collection tag.
    pub fn new(tag: impl Into<KeyPart>) -> Self {
        Self(vec![tag.into()])
    }

    /// Appends a part to the key.
    #[must_use]
    pub fn with(mut self, part: impl Into<KeyPart>) -> Self {
        self.0.push(part.into());
        self
    }

    /// Returns `true` if `prefix` equals this key or is a leading subsequence of it.
    pub fn starts_with(&self, prefix: &Self) -> bool {
        self.0.starts_with(&prefix.0)
    }

    pub fn parts(&self) -> &[KeyPart] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, part) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str("/")?;
            }
            write!(f, "{part}")?;
        }
        Ok(())
    }
}

impl From<&str> for QueryKey {
    fn from(tag: &str) -> Self {
        Self::new(tag)
    }
}

impl From<String> for QueryKey {
    fn from(tag: String) -> Self {
        Self::new(tag)
    }
}

impl FromIterator<KeyPart> for QueryKey {
    fn from_iter<I: IntoIterator<Item = KeyPart>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<KeyPart> for QueryKey {
    fn extend<I: IntoIterator<Item = KeyPart>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_matching() {
        let tag = QueryKey::from("links");
        let list = QueryKey::from("links").with("list").with(1u32);
        let other = QueryKey::from("employees").with("list");

        assert!(list.starts_with(&tag));
        assert!(tag.starts_with(&tag));
        assert!(!tag.starts_with(&list));
        assert!(!other.starts_with(&tag));
    }

    #[test]
    fn test_parts_are_typed() {
        let a = QueryKey::from("links").with(1u32);
        let b = QueryKey::from("links").with("1");
        assert_ne!(a, b);
        assert_eq!(a.to_string(), b.to_string());
    }

    #[test]
    fn test_tag_prefix_does_not_match_partial_strings() {
        let key = QueryKey::from("links-archive");
        assert!(!key.starts_with(&QueryKey::from("links")));
    }

    #[test]
    fn test_collect_and_extend() {
        let mut key: QueryKey = vec![KeyPart::from("links"), KeyPart::from(true)]
            .into_iter()
            .collect();
        key.extend([KeyPart::from(7i64)]);
        assert_eq!(key.len(), 3);
        assert_eq!(key.to_string(), "links/true/7");
    }
}
