mod entity_path_part;

use std::sync::Arc;

use itertools::Itertools as _;

pub use self::entity_path_part::EntityPathPart;

/// The unique identifier of an entity, e.g. `camera/3/points`
///
/// The entity path is a list of [parts][EntityPathPart] separated by slashes.
/// Each part is a non-empty string, that can contain any character.
/// When written as a string, some characters in the parts need to be escaped with a `\`
/// (only character, numbers, `.`, `-`, `_` does not need escaping).
///
/// Cheap to clone: the parts are shared.
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct EntityPath(Arc<Vec<EntityPathPart>>);

impl EntityPath {
    #[inline]
    pub fn root() -> Self {
        Self::default()
    }

    #[inline]
    pub fn new(parts: Vec<EntityPathPart>) -> Self {
        Self(Arc::new(parts))
    }

    /// Parses an escaped entity path, splitting on unescaped slashes.
    ///
    /// Leading, trailing and repeated slashes are ignored.
    /// Never fails: bad escape sequences are kept as-is, with a warning.
    pub fn parse_forgiving(input: &str) -> Self {
        let mut parts = Vec::new();
        let mut current = String::new();
        let mut escaped = false;

        for c in input.chars() {
            if escaped {
                current.push('\\');
                current.push(c);
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '/' {
                if !current.is_empty() {
                    parts.push(EntityPathPart::parse_forgiving(&current));
                    current.clear();
                }
            } else {
                current.push(c);
            }
        }

        if escaped {
            current.push('\\');
        }
        if !current.is_empty() {
            parts.push(EntityPathPart::parse_forgiving(&current));
        }

        Self::new(parts)
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn parts(&self) -> impl ExactSizeIterator<Item = &EntityPathPart> {
        self.0.iter()
    }

    /// Number of parts.
    #[inline]
    #[expect(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn join(&self, other: &Self) -> Self {
        self.parts().chain(other.parts()).cloned().collect()
    }

    /// Return [`None`] if root.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        let (_, parent) = self.0.split_last()?;
        Some(Self::new(parent.to_vec()))
    }
}

impl FromIterator<EntityPathPart> for EntityPath {
    fn from_iter<T: IntoIterator<Item = EntityPathPart>>(parts: T) -> Self {
        Self::new(parts.into_iter().collect())
    }
}

impl From<&str> for EntityPath {
    #[inline]
    fn from(path: &str) -> Self {
        Self::parse_forgiving(path)
    }
}

impl From<String> for EntityPath {
    #[inline]
    fn from(path: String) -> Self {
        Self::parse_forgiving(&path)
    }
}

impl From<&String> for EntityPath {
    #[inline]
    fn from(path: &String) -> Self {
        Self::parse_forgiving(path)
    }
}

impl std::fmt::Display for EntityPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_root() {
            f.write_str("/")
        } else {
            // no leading nor trailing slash
            let escaped = self.parts().map(EntityPathPart::escaped_string).join("/");
            f.write_str(&escaped)
        }
    }
}

impl std::fmt::Debug for EntityPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EntityPath({self})")
    }
}
