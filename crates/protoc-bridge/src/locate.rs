/// Discovery of .proto sources under include/exclude glob patterns

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use walkdir::WalkDir;

use crate::error::{BuildError, Result};

/// Suffix identifying schema files, both on disk and inside archives
pub const PROTO_FILE_SUFFIX: &str = ".proto";

/// Include pattern used when none is configured
pub const DEFAULT_INCLUDES: &str = "**/*.proto";

/// Finds schema files below a directory.
///
/// Patterns are matched against `/`-separated paths relative to the searched
/// directory. `*` stays within one path segment and `**` spans any depth,
/// including none, so `**/*.proto` also matches top-level files.
#[derive(Debug, Clone)]
pub struct SchemaFileLocator {
    includes: GlobSet,
    excludes: GlobSet,
}

impl SchemaFileLocator {
    pub fn new<I, E>(includes: I, excludes: E) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
        E: IntoIterator,
        E::Item: AsRef<str>,
    {
        let mut includes: Vec<String> = includes.into_iter().map(|p| p.as_ref().to_string()).collect();
        if includes.is_empty() {
            includes.push(DEFAULT_INCLUDES.to_string());
        }
        Ok(Self {
            includes: build_glob_set(&includes)?,
            excludes: build_glob_set(excludes)?,
        })
    }

    /// Locator using the default include pattern and no excludes
    pub fn with_defaults() -> Result<Self> {
        Self::new([DEFAULT_INCLUDES], std::iter::empty::<&str>())
    }

    /// Locate all matching files below `directory`.
    ///
    /// Fails with `InvalidInput` when `directory` is not a directory.
    pub fn locate(&self, directory: &Path) -> Result<BTreeSet<PathBuf>> {
        if !directory.is_dir() {
            return Err(BuildError::invalid_input(directory, "is not a directory"));
        }
        let root = directory
            .canonicalize()
            .map_err(|e| BuildError::io(format!("resolving {}", directory.display()), e))?;

        let mut found = BTreeSet::new();
        for entry in WalkDir::new(&root).min_depth(1) {
            let entry = entry.map_err(|e| {
                let context = format!("walking {}", root.display());
                match e.into_io_error() {
                    Some(io) => BuildError::io(context, io),
                    None => BuildError::invalid_input(&root, "filesystem loop detected"),
                }
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&root) else {
                continue;
            };
            let relative = relative.to_string_lossy().replace('\\', "/");
            if self.includes.is_match(&relative) && !self.excludes.is_match(&relative) {
                found.insert(entry.into_path());
            }
        }

        tracing::debug!("Located {} proto files in {}", found.len(), root.display());
        Ok(found)
    }

    /// Locate over several directories, deduplicating by canonical path
    pub fn locate_all<'a>(
        &self,
        directories: impl IntoIterator<Item = &'a Path>,
    ) -> Result<BTreeSet<PathBuf>> {
        let mut found = BTreeSet::new();
        for directory in directories {
            found.extend(self.locate(directory)?);
        }
        Ok(found)
    }
}

fn build_glob_set<I>(patterns: I) -> Result<GlobSet>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let pattern = pattern.as_ref().trim().replace('\\', "/");
        if pattern.is_empty() {
            continue;
        }
        // a trailing separator means "everything below"
        let pattern = if pattern.ends_with('/') {
            format!("{}**", pattern)
        } else {
            pattern
        };
        let glob = GlobBuilder::new(&pattern)
            .literal_separator(true)
            .build()
            .map_err(|e| BuildError::configuration(format!("invalid pattern '{}': {}", pattern, e)))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| BuildError::configuration(format!("invalid pattern set: {}", e)))
}
