use std::fmt;
use std::path::Path;

use crate::CoreResult;

/// An absolute, filesystem-normalized source path, used as the key of the
/// breakpoint index.
///
/// Two `CanonicalPath`s compare equal iff their canonical forms are
/// byte-equal: resolved to an absolute path and, on a case-insensitive
/// filesystem, lowercased.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CanonicalPath(String);

impl CanonicalPath {
    /// Canonicalize `raw` relative to the current working directory.
    ///
    /// Fails if the path cannot be resolved (it does not exist, or a
    /// component is not accessible) — callers surface this as the
    /// protocol's `Invalid path!` semantic error.
    pub fn canonicalize(raw: &str) -> CoreResult<Self> {
        let resolved = Path::new(raw)
            .canonicalize()
            .map_err(|e| crate::CoreError::protocol(format!("cannot canonicalize '{raw}': {e}")))?;
        let mut s = resolved.to_string_lossy().into_owned();
        if cfg!(windows) {
            s = s.to_lowercase();
        }
        Ok(Self(s))
    }

    /// Build a `CanonicalPath` from an already-canonical string, trusting
    /// the caller. Used when re-hydrating a path that was already produced
    /// by [`CanonicalPath::canonicalize`] (e.g. read back off the wire).
    pub fn from_trusted(already_canonical: impl Into<String>) -> Self {
        Self(already_canonical.into())
    }

    /// The canonical form as a plain string, e.g. for wire transmission.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CanonicalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn equal_paths_canonicalize_equal() {
        let dir = tempfile_dir();
        let file = dir.join("a.lua");
        std::fs::File::create(&file).unwrap().write_all(b"-- x").unwrap();

        let a = CanonicalPath::canonicalize(file.to_str().unwrap()).unwrap();
        let b = CanonicalPath::canonicalize(file.to_str().unwrap()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn missing_file_fails() {
        assert!(CanonicalPath::canonicalize("/no/such/path/definitely-not-here.lua").is_err());
    }

    fn tempfile_dir() -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("rdbg-core-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }
}
