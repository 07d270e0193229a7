use std::fmt;

/// Cache key for one image resource: `directory + "/" + filename`
///
/// The same string is used as the Redis key and as the path relative to the
/// image root. Segments are taken verbatim from the request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    joined: String,
    separator: usize,
}

impl CacheKey {
    pub fn new(directory: &str, filename: &str) -> Self {
        let mut joined = String::with_capacity(directory.len() + 1 + filename.len());
        joined.push_str(directory);
        joined.push('/');
        joined.push_str(filename);

        Self {
            joined,
            separator: directory.len(),
        }
    }

    pub fn directory(&self) -> &str {
        &self.joined[..self.separator]
    }

    pub fn filename(&self) -> &str {
        &self.joined[self.separator + 1..]
    }

    pub fn as_str(&self) -> &str {
        &self.joined
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.joined)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.joined
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("a", "b.png", "a/b.png")]
    #[case("logos", "acme.png", "logos/acme.png")]
    #[case("", "b.png", "/b.png")]
    #[case("a", "", "a/")]
    #[case("dir.with.dots", "file name.gif", "dir.with.dots/file name.gif")]
    fn test_joins_with_single_separator(
        #[case] directory: &str,
        #[case] filename: &str,
        #[case] expected: &str,
    ) {
        let key = CacheKey::new(directory, filename);
        assert_eq!(key.as_str(), expected);
        assert_eq!(key.to_string(), expected);
    }

    #[test]
    fn test_segments_are_recoverable() {
        let key = CacheKey::new("a/b", "c.png");
        assert_eq!(key.directory(), "a/b");
        assert_eq!(key.filename(), "c.png");
        assert_eq!(key.as_str(), "a/b/c.png");
    }
}
