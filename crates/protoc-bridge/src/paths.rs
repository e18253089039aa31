/// Path normalization for staging dependency archives
///
/// Archive paths are rebased against the local artifact repository so that
/// each archive gets its own directory under the staging area.

use std::path::{Path, MAIN_SEPARATOR};

/// Rebases archive paths relative to a known root directory.
#[derive(Debug, Clone, Default)]
pub struct PathSanitizer {
    base: Option<String>,
}

impl PathSanitizer {
    /// Create a sanitizer rooted at `base` (usually the local artifact cache).
    ///
    /// The base is canonicalized when it exists so it lines up with the
    /// canonical archive paths handed to [`PathSanitizer::sanitize`].
    pub fn new(base: impl AsRef<Path>) -> Self {
        let base = base.as_ref();
        let base = base.canonicalize().unwrap_or_else(|_| base.to_path_buf());
        Self {
            base: Some(base.to_string_lossy().into_owned()),
        }
    }

    /// A sanitizer with no known root: only separators and drive prefixes are handled
    pub fn without_base() -> Self {
        Self { base: None }
    }

    pub fn sanitize(&self, path: impl AsRef<Path>) -> String {
        let path = path.as_ref().to_string_lossy();
        truncate_path(&path, self.base.as_deref())
    }
}

fn normalize_separators(path: &str) -> String {
    let path = path.replace('\\', "/");
    let path = if MAIN_SEPARATOR == '/' {
        path
    } else {
        path.replace(MAIN_SEPARATOR, "/")
    };
    // verbatim prefix produced by canonicalize on Windows
    match path.strip_prefix("//?/") {
        Some(rest) => rest.to_string(),
        None => path,
    }
}

/// Truncate `path` so it is relative to `base`, or to the root of its drive.
///
/// The base gets a trailing `/` before the search so `/repo` never matches
/// `/repository/...`. The match is a plain substring search, not anchored at
/// the start of `path`. `.` and `..` segments are dropped from the result so
/// it never climbs out of the directory it is joined onto.
pub fn truncate_path(path: &str, base: Option<&str>) -> String {
    let mut path = normalize_separators(path);

    if let Some(base) = base {
        let mut base = normalize_separators(base);
        if !base.ends_with('/') {
            base.push('/');
        }
        if let Some(index) = path.find(&base) {
            path = path[index + base.len()..].to_string();
        }
    }

    let bytes = path.as_bytes();
    if bytes.len() >= 3 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' && bytes[2] == b'/' {
        path = path[3..].to_string();
    }

    path.split('/')
        .filter(|segment| !matches!(*segment, "" | "." | ".."))
        .collect::<Vec<_>>()
        .join("/")
}
