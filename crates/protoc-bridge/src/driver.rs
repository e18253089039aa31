/// Orchestrator that drives one protoc run end to end

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::config::{BuildConfig, Scope};
use crate::error::{BuildError, Result};
use crate::extract::ArchiveExtractor;
use crate::locate::SchemaFileLocator;
use crate::paths::PathSanitizer;
use crate::protoc::{CompileResult, ProtocBuilder};

/// Supplies the build's resolved dependency artifacts (archives or directories)
pub trait DependencyResolver {
    fn dependency_artifacts(&self) -> Vec<PathBuf>;
}

/// A fixed list of artifacts
#[derive(Debug, Clone, Default)]
pub struct StaticDependencies(pub Vec<PathBuf>);

impl DependencyResolver for StaticDependencies {
    fn dependency_artifacts(&self) -> Vec<PathBuf> {
        self.0.clone()
    }
}

/// Registers generated output with the surrounding build
pub trait OutputRegistrar {
    fn attach(&mut self, output_directory: &Path, scope: Scope);
}

/// Where a run currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Validated,
    Located,
    Extracted,
    Invoked,
    Succeeded,
    Failed,
}

/// Why a run finished without invoking protoc
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    SourceRootMissing(PathBuf),
    NoProtoFiles,
}

/// Result of a successful run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Skipped(SkipReason),
    Compiled {
        output_directory: PathBuf,
        proto_files: usize,
        result: CompileResult,
    },
}

/// Drives location, extraction and compilation for one configuration
pub struct Orchestrator<D, R> {
    config: BuildConfig,
    dependencies: D,
    registrar: R,
    stage: Stage,
}

impl<D: DependencyResolver, R: OutputRegistrar> Orchestrator<D, R> {
    pub fn new(config: BuildConfig, dependencies: D, registrar: R) -> Self {
        Self {
            config,
            dependencies,
            registrar,
            stage: Stage::Idle,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    pub fn registrar(&self) -> &R {
        &self.registrar
    }

    /// Run the whole pipeline. Any error leaves the orchestrator in
    /// [`Stage::Failed`].
    pub fn execute(&mut self) -> Result<Outcome> {
        self.stage = Stage::Idle;
        match self.run_stages() {
            Ok(outcome) => {
                self.stage = Stage::Succeeded;
                Ok(outcome)
            }
            Err(e) => {
                self.stage = Stage::Failed;
                Err(e)
            }
        }
    }

    fn run_stages(&mut self) -> Result<Outcome> {
        self.config.validate()?;
        self.stage = Stage::Validated;

        let source_root = self.config.source_root.clone();
        if !source_root.exists() {
            tracing::info!(
                "{} does not exist. Review the configuration or consider disabling protoc for this scope.",
                source_root.display()
            );
            return Ok(Outcome::Skipped(SkipReason::SourceRootMissing(source_root)));
        }
        // protoc only accepts files whose path starts with a --proto_path
        // entry, and located files are canonical
        let source_root = source_root
            .canonicalize()
            .map_err(|e| BuildError::io(format!("resolving {}", source_root.display()), e))?;

        let locator = SchemaFileLocator::new(&self.config.includes, &self.config.excludes)?;
        let proto_files = locator.locate(&source_root)?;
        self.stage = Stage::Located;
        if proto_files.is_empty() {
            tracing::info!("No proto files to compile.");
            return Ok(Outcome::Skipped(SkipReason::NoProtoFiles));
        }
        tracing::info!("Found {} proto files in {}", proto_files.len(), source_root.display());

        let sanitizer = match &self.config.local_repository {
            Some(repository) => PathSanitizer::new(repository),
            None => PathSanitizer::without_base(),
        };
        let artifacts = dedup_preserving_order(self.dependencies.dependency_artifacts());
        let derived = ArchiveExtractor::new(sanitizer)
            .extract(&self.config.staging_directory, &artifacts)?;
        self.stage = Stage::Extracted;
        tracing::info!(
            "Derived {} protopath elements from {} dependencies",
            derived.len(),
            artifacts.len()
        );

        let request = ProtocBuilder::new(
            self.config.protoc_executable.clone(),
            self.config.output_directory.clone(),
        )
        .language(self.config.language.clone())
        .add_protopath_element(source_root)
        .add_protopath_elements(derived)
        .add_protopath_elements(self.config.additional_protopath.iter().cloned())
        .add_proto_files(proto_files)
        .build()?;
        for element in request.protopath() {
            tracing::debug!("protopath: {}", element.display());
        }

        let result = request.run()?;
        self.stage = Stage::Invoked;

        if !result.success() {
            tracing::error!("protoc failed output: {}", result.stdout);
            tracing::error!("protoc failed error: {}", result.stderr);
        }
        let result = result.into_result()?;

        let output_directory = request.output_directory().to_path_buf();
        self.registrar.attach(&output_directory, self.config.scope);

        Ok(Outcome::Compiled {
            output_directory,
            proto_files: request.proto_files().len(),
            result,
        })
    }
}

fn dedup_preserving_order(paths: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    paths.into_iter().filter(|p| seen.insert(p.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder(Vec<PathBuf>);

    impl OutputRegistrar for Recorder {
        fn attach(&mut self, output_directory: &Path, _scope: Scope) {
            self.0.push(output_directory.to_path_buf());
        }
    }

    #[test]
    fn test_dedup_preserves_first_position() {
        let deduped = dedup_preserving_order(vec![
            PathBuf::from("b.jar"),
            PathBuf::from("a.jar"),
            PathBuf::from("b.jar"),
        ]);
        assert_eq!(deduped, vec![PathBuf::from("b.jar"), PathBuf::from("a.jar")]);
    }

    #[test]
    fn test_invalid_configuration_fails_before_work() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = BuildConfig::for_scope(dir.path(), Scope::Main);
        std::fs::create_dir_all(dir.path().join("target")).unwrap();
        std::fs::write(&config.staging_directory, "").unwrap();
        config.source_root = dir.path().to_path_buf();

        let mut orchestrator =
            Orchestrator::new(config, StaticDependencies::default(), Recorder::default());
        let err = orchestrator.execute().unwrap_err();

        assert!(matches!(err, BuildError::Configuration(_)));
        assert_eq!(orchestrator.stage(), Stage::Failed);
        assert!(orchestrator.registrar().0.is_empty());
    }
}
