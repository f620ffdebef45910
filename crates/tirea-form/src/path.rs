//! Field path representation for addressing the value tree.
//!
//! Paths are sequences of segments that describe a location in a form's value
//! tree. Each segment is either a key (for objects) or an index (for arrays).
//! Dotted field names such as `"users.2.email"` parse into paths, with purely
//! numeric segments becoming array indices.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A single segment in a field path.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Seg {
    /// Object key access: `{"key": value}`
    Key(String),
    /// Array index access: `[index]`
    Index(usize),
}

impl Seg {
    /// Create a key segment.
    #[inline]
    pub fn key(k: impl Into<String>) -> Self {
        Seg::Key(k.into())
    }

    /// Create an index segment.
    #[inline]
    pub fn index(i: usize) -> Self {
        Seg::Index(i)
    }

    /// Parse one dotted-name component. All-digit components are indices.
    pub fn parse(raw: &str) -> Self {
        if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(i) = raw.parse::<usize>() {
                return Seg::Index(i);
            }
        }
        Seg::Key(raw.to_owned())
    }

    /// Get the key if this is a key segment.
    #[inline]
    pub fn as_key(&self) -> Option<&str> {
        match self {
            Seg::Key(k) => Some(k),
            Seg::Index(_) => None,
        }
    }

    /// Get the index if this is an index segment.
    #[inline]
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Seg::Key(_) => None,
            Seg::Index(i) => Some(*i),
        }
    }
}

impl fmt::Display for Seg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Seg::Key(k) => f.write_str(k),
            Seg::Index(i) => write!(f, "{}", i),
        }
    }
}

impl From<String> for Seg {
    fn from(s: String) -> Self {
        Seg::Key(s)
    }
}

impl From<&str> for Seg {
    fn from(s: &str) -> Self {
        Seg::Key(s.to_owned())
    }
}

impl From<usize> for Seg {
    fn from(i: usize) -> Self {
        Seg::Index(i)
    }
}

/// A complete path into the value tree.
///
/// The empty path is the tree root, which owns a field record like any other
/// path. Every prefix of a path (an "ascendant") is itself addressable.
///
/// # Examples
///
/// ```
/// use tirea_form::{Path, Seg};
///
/// let path = Path::parse("users.2.email");
/// assert_eq!(path.len(), 3);
/// assert_eq!(path[1], Seg::Index(2));
/// assert_eq!(path.to_string(), "users.2.email");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Path(Vec<Seg>);

impl Path {
    /// Create an empty path (root).
    #[inline]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Create a path from a vector of segments.
    #[inline]
    pub fn from_segments(segments: Vec<Seg>) -> Self {
        Self(segments)
    }

    /// Parse a dotted field name. The empty string is the root.
    pub fn parse(raw: &str) -> Self {
        raw.split('.')
            .filter(|s| !s.is_empty())
            .map(Seg::parse)
            .collect()
    }

    /// Append a key segment and return self (builder pattern).
    #[inline]
    pub fn key(mut self, k: impl Into<String>) -> Self {
        self.0.push(Seg::Key(k.into()));
        self
    }

    /// Append an index segment and return self (builder pattern).
    #[inline]
    pub fn index(mut self, i: usize) -> Self {
        self.0.push(Seg::Index(i));
        self
    }

    /// Push a segment onto the path (mutating).
    #[inline]
    pub fn push(&mut self, seg: Seg) {
        self.0.push(seg);
    }

    /// Pop the last segment from the path.
    #[inline]
    pub fn pop(&mut self) -> Option<Seg> {
        self.0.pop()
    }

    #[inline]
    pub fn segments(&self) -> &[Seg] {
        &self.0
    }

    /// Check if this path is empty (root).
    #[inline]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn last(&self) -> Option<&Seg> {
        self.0.last()
    }

    /// Join this path with another path.
    #[inline]
    pub fn join(&self, other: &Path) -> Path {
        let mut result = self.clone();
        result.0.extend(other.0.iter().cloned());
        result
    }

    /// Append a segment and return a new path (non-mutating builder).
    #[inline]
    pub fn with_segment(&self, seg: Seg) -> Path {
        let mut result = self.clone();
        result.0.push(seg);
        result
    }

    /// Check if this path is a prefix of another path.
    ///
    /// A path is a prefix of itself.
    #[inline]
    pub fn is_prefix_of(&self, other: &Path) -> bool {
        other.0.starts_with(&self.0)
    }

    /// Check if this path lies strictly below `ancestor`.
    #[inline]
    pub fn is_descendant_of(&self, ancestor: &Path) -> bool {
        self.len() > ancestor.len() && ancestor.is_prefix_of(self)
    }

    /// Get the parent path (path without the last segment).
    #[inline]
    pub fn parent(&self) -> Option<Path> {
        if self.0.is_empty() {
            None
        } else {
            let mut p = self.clone();
            p.pop();
            Some(p)
        }
    }

    /// Every prefix of this path, root first, the path itself last.
    ///
    /// ```
    /// use tirea_form::Path;
    ///
    /// let chain: Vec<String> = Path::parse("a.b")
    ///     .ascendants()
    ///     .iter()
    ///     .map(ToString::to_string)
    ///     .collect();
    /// assert_eq!(chain, ["", "a", "a.b"]);
    /// ```
    pub fn ascendants(&self) -> Vec<Path> {
        (0..=self.0.len())
            .map(|n| Path(self.0[..n].to_vec()))
            .collect()
    }

    /// Replace the segment at `depth`, keeping everything before and after it.
    pub(crate) fn with_segment_at(&self, depth: usize, seg: Seg) -> Path {
        let mut segments = self.0.clone();
        segments[depth] = seg;
        Path(segments)
    }

    /// Iterate over the segments.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Seg> {
        self.0.iter()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, seg) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{}", seg)?;
        }
        Ok(())
    }
}

impl FromStr for Path {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Path::parse(s))
    }
}

impl From<&str> for Path {
    fn from(s: &str) -> Self {
        Path::parse(s)
    }
}

impl From<String> for Path {
    fn from(s: String) -> Self {
        Path::parse(&s)
    }
}

impl From<&Path> for Path {
    fn from(p: &Path) -> Self {
        p.clone()
    }
}

impl From<Vec<Seg>> for Path {
    fn from(segments: Vec<Seg>) -> Self {
        Path(segments)
    }
}

impl FromIterator<Seg> for Path {
    fn from_iter<I: IntoIterator<Item = Seg>>(iter: I) -> Self {
        Path(iter.into_iter().collect())
    }
}

impl IntoIterator for Path {
    type Item = Seg;
    type IntoIter = std::vec::IntoIter<Seg>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Path {
    type Item = &'a Seg;
    type IntoIter = std::slice::Iter<'a, Seg>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl std::ops::Index<usize> for Path {
    type Output = Seg;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

/// Construct a `Path` from a sequence of segments.
///
/// # Examples
///
/// ```
/// use tirea_form::path;
///
/// // String literals become Key segments, numbers become Index segments
/// let p = path!("items", 0, "name");
/// assert_eq!(p.to_string(), "items.0.name");
/// ```
#[macro_export]
macro_rules! path {
    () => {
        $crate::Path::root()
    };
    ($($seg:expr),+ $(,)?) => {{
        let mut p = $crate::Path::root();
        $(
            p.push($crate::path!(@seg $seg));
        )+
        p
    }};
    (@seg $seg:expr) => {
        $crate::Seg::from($seg)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_numeric_segments_as_indices() {
        let path = Path::parse("a.b.2.c");
        assert_eq!(path.len(), 4);
        assert_eq!(path[0], Seg::Key("a".into()));
        assert_eq!(path[2], Seg::Index(2));
        assert_eq!(path[3], Seg::Key("c".into()));
    }

    #[test]
    fn test_parse_empty_is_root() {
        assert!(Path::parse("").is_root());
        assert!(Path::parse("..").is_root());
    }

    #[test]
    fn test_parse_keeps_signed_or_mixed_as_keys() {
        assert_eq!(Path::parse("-1")[0], Seg::Key("-1".into()));
        assert_eq!(Path::parse("2a")[0], Seg::Key("2a".into()));
    }

    #[test]
    fn test_display_round_trips() {
        let path = Path::root().key("users").index(0).key("email");
        assert_eq!(path.to_string(), "users.0.email");
        assert_eq!(Path::parse(&path.to_string()), path);
    }

    #[test]
    fn test_path_macro() {
        let p = path!("users", 0, "name");
        assert_eq!(p.len(), 3);
        assert_eq!(p[1], Seg::Index(0));
    }

    #[test]
    fn test_ascendants_root_to_leaf() {
        let chain = Path::parse("a.0.b").ascendants();
        assert_eq!(chain.len(), 4);
        assert!(chain[0].is_root());
        assert_eq!(chain[3], Path::parse("a.0.b"));
        assert_eq!(Path::root().ascendants(), vec![Path::root()]);
    }

    #[test]
    fn test_descendant_relation() {
        let parent = path!("nested");
        let child = path!("nested", "value");
        assert!(child.is_descendant_of(&parent));
        assert!(!parent.is_descendant_of(&parent));
        assert!(parent.is_prefix_of(&parent));
        assert!(!path!("nestedx").is_descendant_of(&parent));
    }

    #[test]
    fn test_path_serde() {
        let path = Path::root().key("users").index(0);
        let json = serde_json::to_string(&path).unwrap();
        assert_eq!(json, r#"["users",0]"#);
        let parsed: Path = serde_json::from_str(&json).unwrap();
        assert_eq!(path, parsed);
    }
}
