/// Staging of .proto files shipped inside dependency archives
///
/// protoc cannot read inside archives, so every .proto entry of a dependency
/// archive is copied out to the staging directory. Each archive gets its own
/// subdirectory, derived from the archive path, so two archives shipping the
/// same relative file never overwrite each other. Plain directories are
/// referenced in place.

use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use zip::ZipArchive;
use zip::result::ZipError;

use crate::cleanup;
use crate::error::{BuildError, Result};
use crate::locate::PROTO_FILE_SUFFIX;
use crate::paths::PathSanitizer;

/// Extracts dependency protos into a staging directory
#[derive(Debug, Clone, Default)]
pub struct ArchiveExtractor {
    sanitizer: PathSanitizer,
}

impl ArchiveExtractor {
    pub fn new(sanitizer: PathSanitizer) -> Self {
        Self { sanitizer }
    }

    /// Stage the protos of every artifact and return the directories protoc
    /// should search.
    ///
    /// The staging directory is emptied first. Artifacts are processed in
    /// the order given and the first unreadable archive aborts the run.
    pub fn extract<I>(&self, staging_dir: &Path, artifacts: I) -> Result<BTreeSet<PathBuf>>
    where
        I: IntoIterator,
        I::Item: AsRef<Path>,
    {
        clean_directory(staging_dir)?;

        let mut proto_dirs = BTreeSet::new();
        for artifact in artifacts {
            let artifact = artifact.as_ref();
            if artifact.is_file() {
                self.extract_archive(staging_dir, artifact, &mut proto_dirs)?;
            } else if artifact.is_dir() {
                if contains_proto_files(artifact)? {
                    tracing::debug!("Using {} in place", artifact.display());
                    proto_dirs.insert(artifact.to_path_buf());
                }
            } else {
                tracing::debug!("Skipping {}: no file payload", artifact.display());
            }
        }

        cleanup::schedule_removal(staging_dir);
        Ok(proto_dirs)
    }

    fn extract_archive(
        &self,
        staging_dir: &Path,
        archive_path: &Path,
        proto_dirs: &mut BTreeSet<PathBuf>,
    ) -> Result<()> {
        let not_readable = || BuildError::invalid_input(archive_path, "was not a readable artifact");

        let file = File::open(archive_path).map_err(|_| not_readable())?;
        let mut archive = ZipArchive::new(file).map_err(|_| not_readable())?;
        // canonical, so `a.jar`, `./a.jar` and `/abs/a.jar` share one staging dir
        let canonical = archive_path.canonicalize().map_err(|_| not_readable())?;
        let archive_dir = staging_dir.join(self.sanitizer.sanitize(&canonical));

        for index in 0..archive.len() {
            let mut entry = archive.by_index(index).map_err(|e| match e {
                ZipError::Io(io) => {
                    BuildError::io(format!("reading {}", archive_path.display()), io)
                }
                other => BuildError::invalid_input(archive_path, other.to_string()),
            })?;
            if entry.is_dir() || !entry.name().ends_with(PROTO_FILE_SUFFIX) {
                continue;
            }
            let Some(relative) = entry.enclosed_name() else {
                tracing::warn!(
                    "Skipping entry '{}' of {}: unsafe path",
                    entry.name(),
                    archive_path.display()
                );
                continue;
            };

            let destination = archive_dir.join(relative);
            let Some(parent) = destination.parent().map(Path::to_path_buf) else {
                continue;
            };
            fs::create_dir_all(&parent)
                .map_err(|e| BuildError::io(format!("creating {}", parent.display()), e))?;
            let mut out = File::create(&destination)
                .map_err(|e| BuildError::io(format!("creating {}", destination.display()), e))?;
            io::copy(&mut entry, &mut out).map_err(|e| {
                BuildError::io(
                    format!("extracting {} from {}", entry.name(), archive_path.display()),
                    e,
                )
            })?;

            tracing::debug!("Staged {}", destination.display());
            proto_dirs.insert(parent);
        }

        Ok(())
    }
}

/// Remove every entry of `dir`, keeping the directory itself.
fn clean_directory(dir: &Path) -> Result<()> {
    if !dir.exists() {
        return Ok(());
    }
    if !dir.is_dir() {
        return Err(BuildError::invalid_input(dir, "is a file, not a directory"));
    }
    let context = || format!("cleaning {}", dir.display());
    for entry in fs::read_dir(dir).map_err(|e| BuildError::io(context(), e))? {
        let entry = entry.map_err(|e| BuildError::io(context(), e))?;
        let path = entry.path();
        let removed = if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        removed.map_err(|e| BuildError::io(context(), e))?;
    }
    Ok(())
}

fn contains_proto_files(dir: &Path) -> Result<bool> {
    let entries =
        fs::read_dir(dir).map_err(|e| BuildError::io(format!("listing {}", dir.display()), e))?;
    for entry in entries {
        let entry = entry.map_err(|e| BuildError::io(format!("listing {}", dir.display()), e))?;
        if entry.file_name().to_string_lossy().ends_with(PROTO_FILE_SUFFIX) {
            return Ok(true);
        }
    }
    Ok(false)
}
