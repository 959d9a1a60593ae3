//! Dotted path expressions
//!
//! A path such as `server.host` is split on every `.` into the segments
//! `["server", "host"]`. There is no escape syntax, so a mapping key that
//! itself contains a dot cannot be addressed. The empty expression addresses
//! the root of the tree.

use std::fmt;

/// An ordered list of segments addressing a node in a config tree
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Path {
    segments: Vec<String>,
}

impl Path {
    /// The path addressing the root itself
    pub fn root() -> Self {
        Self::default()
    }

    /// Split a dotted expression into a path
    pub fn parse(expr: &str) -> Self {
        if expr.is_empty() {
            return Self::root();
        }
        Self {
            segments: expr.split('.').map(str::to_string).collect(),
        }
    }

    /// Build a path from pre-split segments
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Path of a child entry below this one
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        Self { segments }
    }

    /// The first `len` segments of this path
    pub fn prefix(&self, len: usize) -> Self {
        Self {
            segments: self.segments[..len.min(self.segments.len())].to_vec(),
        }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            return write!(f, "<root>");
        }
        write!(f, "{}", self.segments.join("."))
    }
}

impl From<&str> for Path {
    fn from(expr: &str) -> Self {
        Path::parse(expr)
    }
}

impl From<String> for Path {
    fn from(expr: String) -> Self {
        Path::parse(&expr)
    }
}

impl From<&Path> for Path {
    fn from(path: &Path) -> Self {
        path.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_path() {
        assert_eq!(Path::parse("database").segments(), ["database"]);
    }

    #[test]
    fn test_parse_dotted_path() {
        assert_eq!(Path::parse("server.host").segments(), ["server", "host"]);
    }

    #[test]
    fn test_empty_expression_is_root() {
        assert!(Path::parse("").is_root());
        assert_eq!(Path::root().to_string(), "<root>");
    }

    #[test]
    fn test_no_escaping_of_dots() {
        // "a\.b" is not an escape: the backslash stays in the first segment
        assert_eq!(Path::parse("a\\.b").segments(), ["a\\", "b"]);
        // Doubled dots produce an empty segment rather than being collapsed
        assert_eq!(Path::parse("a..b").segments(), ["a", "", "b"]);
    }

    #[test]
    fn test_child_and_prefix() {
        let path = Path::parse("server");
        let child = path.child("host");
        assert_eq!(child.to_string(), "server.host");
        assert_eq!(child.prefix(1), path);
        assert_eq!(child.prefix(10), child);
    }
}
