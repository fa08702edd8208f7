/// The different parts that make up an [`EntityPath`][crate::EntityPath].
///
/// A non-empty string.
///
/// Note that the contents of the string is NOT escaped,
/// so escaping needs to be done when printing this
/// using [`Self::escaped_string`].
///
/// Because of this, `EntityPathPart` does NOT implement `Display`:
/// you must explicitly chose either the escaped or the unescaped version of it.
#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct EntityPathPart(String);

impl EntityPathPart {
    /// The given string is expected to be unescaped, i.e. any `\` is treated as a normal character.
    #[inline]
    pub fn new(unescaped_string: impl Into<String>) -> Self {
        Self(unescaped_string.into())
    }

    /// Unescape the string, forgiving any syntax error with a best-effort approach.
    pub fn parse_forgiving(input: &str) -> Self {
        let mut output = String::with_capacity(input.len());
        let mut chars = input.chars();

        while let Some(c) = chars.next() {
            if c != '\\' {
                output.push(c);
                continue;
            }

            match chars.next() {
                Some('n') => output.push('\n'),
                Some('r') => output.push('\r'),
                Some('t') => output.push('\t'),
                Some(c) if c.is_ascii_punctuation() || c == ' ' => output.push(c),
                Some(c) => {
                    // Could be a serious mistake, like passing a windows file path
                    // (`C:\Users\image.jpg`) as an entity path.
                    re_log::warn_once!("Unknown escape sequence in entity path: '\\{c}'");
                    output.push(c);
                }
                // Trailing escape: treat it as a (escaped) backslash
                None => output.push('\\'),
            }
        }

        Self::new(output)
    }

    /// The unescaped string.
    ///
    /// Use [`Self::escaped_string`] to escape it.
    #[inline]
    pub fn unescaped_str(&self) -> &str {
        &self.0
    }

    /// Use this when it is part of a full entity path.
    pub fn escaped_string(&self) -> String {
        let mut s = String::with_capacity(self.0.len());
        for c in self.0.chars() {
            // Note: we print all unicode character (e.g. `åäö`) as is.
            if c.is_alphanumeric() || matches!(c, '_' | '-' | '.') {
                s.push(c);
                continue;
            }
            match c {
                '\n' => s.push_str("\\n"),
                '\r' => s.push_str("\\r"),
                '\t' => s.push_str("\\t"),
                c => {
                    s.push('\\');
                    s.push(c);
                }
            }
        }
        s
    }
}

impl From<&str> for EntityPathPart {
    #[inline]
    fn from(part: &str) -> Self {
        Self::new(part)
    }
}

impl From<String> for EntityPathPart {
    #[inline]
    fn from(part: String) -> Self {
        Self::new(part)
    }
}
