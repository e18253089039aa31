/// Build configuration: defaults per scope and TOML loading

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{BuildError, Result};
use crate::locate::DEFAULT_INCLUDES;
use crate::protoc::{DEFAULT_EXECUTABLE, DEFAULT_LANGUAGE};

/// Which set of sources is being compiled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    #[default]
    Main,
    Test,
}

impl Scope {
    pub fn default_source_root(self, base: &Path) -> PathBuf {
        match self {
            Scope::Main => base.join("src/main/proto"),
            Scope::Test => base.join("src/test/proto"),
        }
    }

    pub fn default_output_directory(self, base: &Path) -> PathBuf {
        match self {
            Scope::Main => base.join("target/generated-sources/protoc"),
            Scope::Test => base.join("target/generated-test-sources/protoc"),
        }
    }

    pub fn default_staging_directory(self, base: &Path) -> PathBuf {
        base.join("target/protoc-dependencies")
    }
}

/// Everything one run needs to know
#[derive(Debug, Clone, PartialEq)]
pub struct BuildConfig {
    pub scope: Scope,
    pub source_root: PathBuf,
    pub output_directory: PathBuf,
    pub staging_directory: PathBuf,
    pub protoc_executable: String,
    pub language: String,
    pub additional_protopath: Vec<PathBuf>,
    pub includes: Vec<String>,
    pub excludes: Vec<String>,
    /// Root that archive paths are made relative to when staging
    pub local_repository: Option<PathBuf>,
    pub dependencies: Vec<PathBuf>,
}

/// On-disk form; every field is optional
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    scope: Option<Scope>,
    base_directory: Option<PathBuf>,
    source_root: Option<PathBuf>,
    output_directory: Option<PathBuf>,
    staging_directory: Option<PathBuf>,
    protoc_executable: Option<String>,
    language: Option<String>,
    #[serde(default)]
    additional_protopath: Vec<PathBuf>,
    includes: Option<Vec<String>>,
    #[serde(default)]
    excludes: Vec<String>,
    local_repository: Option<PathBuf>,
    #[serde(default)]
    dependencies: Vec<PathBuf>,
}

impl BuildConfig {
    /// Defaults for a project rooted at `base`
    pub fn for_scope(base: impl AsRef<Path>, scope: Scope) -> Self {
        let base = base.as_ref();
        Self {
            scope,
            source_root: scope.default_source_root(base),
            output_directory: scope.default_output_directory(base),
            staging_directory: scope.default_staging_directory(base),
            protoc_executable: DEFAULT_EXECUTABLE.to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
            additional_protopath: Vec::new(),
            includes: vec![DEFAULT_INCLUDES.to_string()],
            excludes: Vec::new(),
            local_repository: None,
            dependencies: Vec::new(),
        }
    }

    /// Load a TOML file. Relative paths resolve against the file's directory.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| BuildError::io(format!("reading {}", path.display()), e))?;
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_toml_str(&text, dir)
    }

    pub fn from_toml_str(text: &str, relative_to: &Path) -> Result<Self> {
        let file: ConfigFile = toml::from_str(text)
            .map_err(|e| BuildError::configuration(format!("invalid config: {}", e)))?;

        let resolve = |p: PathBuf| if p.is_absolute() { p } else { relative_to.join(p) };
        let base = match file.base_directory {
            Some(dir) => resolve(dir),
            None => relative_to.to_path_buf(),
        };
        let scope = file.scope.unwrap_or_default();
        let defaults = Self::for_scope(&base, scope);

        Ok(Self {
            scope,
            source_root: file.source_root.map(resolve).unwrap_or(defaults.source_root),
            output_directory: file
                .output_directory
                .map(resolve)
                .unwrap_or(defaults.output_directory),
            staging_directory: file
                .staging_directory
                .map(resolve)
                .unwrap_or(defaults.staging_directory),
            protoc_executable: file.protoc_executable.unwrap_or(defaults.protoc_executable),
            language: file.language.unwrap_or(defaults.language),
            additional_protopath: file.additional_protopath.into_iter().map(resolve).collect(),
            includes: file.includes.unwrap_or(defaults.includes),
            excludes: file.excludes,
            local_repository: file.local_repository.map(resolve),
            dependencies: file.dependencies.into_iter().map(resolve).collect(),
        })
    }

    /// Check the values a run cannot start without.
    pub fn validate(&self) -> Result<()> {
        if self.protoc_executable.trim().is_empty() {
            return Err(BuildError::configuration("protoc_executable is required"));
        }
        if self.language.trim().is_empty() {
            return Err(BuildError::configuration("language is required"));
        }
        let required = [
            ("source_root", &self.source_root),
            ("staging_directory", &self.staging_directory),
            ("output_directory", &self.output_directory),
        ];
        for (name, path) in required {
            if path.as_os_str().is_empty() {
                return Err(BuildError::configuration(format!("{} is required", name)));
            }
            if path.is_file() {
                return Err(BuildError::configuration(format!(
                    "{} {} is a file, not a directory",
                    name,
                    path.display()
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_defaults() {
        let main = BuildConfig::for_scope("/project", Scope::Main);
        assert_eq!(main.source_root, PathBuf::from("/project/src/main/proto"));
        assert_eq!(
            main.output_directory,
            PathBuf::from("/project/target/generated-sources/protoc")
        );
        assert_eq!(main.includes, vec!["**/*.proto".to_string()]);

        let test = BuildConfig::for_scope("/project", Scope::Test);
        assert_eq!(test.source_root, PathBuf::from("/project/src/test/proto"));
        assert_eq!(test.staging_directory, main.staging_directory);
    }

    #[test]
    fn test_toml_paths_resolve_against_config_dir() {
        let config = BuildConfig::from_toml_str(
            r#"
scope = "test"
protoc_executable = "/opt/protobuf/bin/protoc"
language = "python"
additional_protopath = ["third_party/protos"]
excludes = ["**/internal/*.proto"]
dependencies = ["/deps/common.jar", "libs/extra.zip"]
"#,
            Path::new("/work/app"),
        )
        .unwrap();

        assert_eq!(config.scope, Scope::Test);
        assert_eq!(config.source_root, PathBuf::from("/work/app/src/test/proto"));
        assert_eq!(config.protoc_executable, "/opt/protobuf/bin/protoc");
        assert_eq!(config.additional_protopath, vec![PathBuf::from("/work/app/third_party/protos")]);
        assert_eq!(
            config.dependencies,
            vec![PathBuf::from("/deps/common.jar"), PathBuf::from("/work/app/libs/extra.zip")]
        );
        assert_eq!(config.includes, vec!["**/*.proto".to_string()]);
    }

    #[test]
    fn test_unknown_key_is_configuration_error() {
        let err = BuildConfig::from_toml_str("protoc = \"x\"", Path::new("/")).unwrap_err();
        assert!(matches!(err, BuildError::Configuration(_)));
    }

    #[test]
    fn test_validate_rejects_file_source_root() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = BuildConfig::for_scope(dir.path(), Scope::Main);
        std::fs::write(dir.path().join("root.proto"), "").unwrap();
        config.source_root = dir.path().join("root.proto");
        assert!(matches!(config.validate(), Err(BuildError::Configuration(_))));
    }

    #[test]
    fn test_validate_rejects_empty_executable() {
        let mut config = BuildConfig::for_scope("/project", Scope::Main);
        config.protoc_executable = String::new();
        assert!(matches!(config.validate(), Err(BuildError::Configuration(_))));
    }
}
