/// protoc bridge CLI

use std::path::{Path, PathBuf};
use std::process;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use protoc_bridge::cleanup::CleanupOnExit;
use protoc_bridge::{
    BuildConfig, Orchestrator, Outcome, OutputRegistrar, Scope, SkipReason,
    StaticDependencies,
};

#[derive(Parser, Debug)]
#[command(name = "protoc-bridge")]
#[command(about = "Compile .proto sources with protoc, including protos shipped in dependency archives")]
#[command(version)]
struct Args {
    /// TOML configuration file; flags below override its values
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Project directory used to derive default paths
    #[arg(long, value_name = "DIR", default_value = ".")]
    base_dir: PathBuf,

    /// Compile main or test sources
    #[arg(long, value_enum)]
    scope: Option<ScopeArg>,

    /// Directory searched for .proto sources
    #[arg(long, value_name = "DIR")]
    source_root: Option<PathBuf>,

    /// Directory protoc writes generated code to
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Scratch directory for protos extracted from archives (cleaned on every run)
    #[arg(long, value_name = "DIR")]
    staging_dir: Option<PathBuf>,

    /// protoc executable; looked up on PATH unless a path is given
    #[arg(long, value_name = "PATH")]
    protoc: Option<String>,

    /// Generator language, used as --<LANG>_out
    #[arg(long, value_name = "LANG")]
    lang: Option<String>,

    /// Extra protopath directory (repeatable)
    #[arg(short = 'I', long = "proto-path", value_name = "DIR")]
    proto_path: Vec<PathBuf>,

    /// Include pattern (repeatable, replaces the configured includes)
    #[arg(long, value_name = "GLOB")]
    include: Vec<String>,

    /// Exclude pattern (repeatable, added to the configured excludes)
    #[arg(long, value_name = "GLOB")]
    exclude: Vec<String>,

    /// Root of the local artifact repository holding the dependency archives
    #[arg(long, value_name = "DIR")]
    local_repository: Option<PathBuf>,

    /// Dependency archive or directory (repeatable)
    #[arg(short, long = "dependency", value_name = "PATH")]
    dependencies: Vec<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ScopeArg {
    Main,
    Test,
}

impl From<ScopeArg> for Scope {
    fn from(scope: ScopeArg) -> Self {
        match scope {
            ScopeArg::Main => Scope::Main,
            ScopeArg::Test => Scope::Test,
        }
    }
}

/// Reports the generated directory so the calling build can add it as a source root
struct ReportingRegistrar;

impl OutputRegistrar for ReportingRegistrar {
    fn attach(&mut self, output_directory: &Path, scope: Scope) {
        tracing::info!("Attaching {:?} generated sources at {}", scope, output_directory.display());
        println!("{}", output_directory.display());
    }
}

fn build_config(args: Args) -> anyhow::Result<BuildConfig> {
    let mut config = match &args.config {
        Some(path) => BuildConfig::from_toml_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => BuildConfig::for_scope(&args.base_dir, args.scope.map(Scope::from).unwrap_or_default()),
    };

    if let Some(scope) = args.scope {
        config.scope = scope.into();
    }
    if let Some(source_root) = args.source_root {
        config.source_root = source_root;
    }
    if let Some(output) = args.output {
        config.output_directory = output;
    }
    if let Some(staging_dir) = args.staging_dir {
        config.staging_directory = staging_dir;
    }
    if let Some(protoc) = args.protoc {
        config.protoc_executable = protoc;
    }
    if let Some(lang) = args.lang {
        config.language = lang;
    }
    if !args.include.is_empty() {
        config.includes = args.include;
    }
    if let Some(local_repository) = args.local_repository {
        config.local_repository = Some(local_repository);
    }
    config.excludes.extend(args.exclude);
    config.additional_protopath.extend(args.proto_path);
    config.dependencies.extend(args.dependencies);

    Ok(config)
}

fn run(args: Args) -> anyhow::Result<()> {
    let config = build_config(args)?;
    let dependencies = StaticDependencies(config.dependencies.clone());
    let mut orchestrator = Orchestrator::new(config, dependencies, ReportingRegistrar);

    match orchestrator.execute()? {
        Outcome::Skipped(SkipReason::SourceRootMissing(root)) => {
            tracing::info!("Nothing to do: {} does not exist", root.display());
        }
        Outcome::Skipped(SkipReason::NoProtoFiles) => {
            tracing::info!("Nothing to do: no proto files matched");
        }
        Outcome::Compiled { proto_files, result, .. } => {
            tracing::info!("Compiled {} proto files", proto_files);
            if !result.stderr.is_empty() {
                eprint!("{}", result.stderr);
            }
        }
    }
    Ok(())
}

fn main() {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let code = {
        // dropped before process::exit so the staging directory is removed
        let _cleanup = CleanupOnExit::install();
        match run(args) {
            Ok(()) => 0,
            Err(e) => {
                // protoc's own streams were already logged by the orchestrator
                eprintln!("protoc-bridge failed: {:#}", e);
                1
            }
        }
    };
    process::exit(code);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("protoc-bridge").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults_follow_base_dir_and_scope() {
        let config = build_config(parse(&["--base-dir", "/proj", "--scope", "test"])).unwrap();
        assert_eq!(config.scope, Scope::Test);
        assert_eq!(config.source_root, PathBuf::from("/proj/src/test/proto"));
        assert_eq!(
            config.output_directory,
            PathBuf::from("/proj/target/generated-test-sources/protoc")
        );
        assert_eq!(config.protoc_executable, "protoc");
    }

    #[test]
    fn test_flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("protoc.toml");
        std::fs::write(
            &file,
            r#"
source_root = "protos"
language = "python"
includes = ["a/**/*.proto"]
excludes = ["**/x.proto"]
additional_protopath = ["p1"]
dependencies = ["d1.jar"]
"#,
        )
        .unwrap();
        let file_arg = file.to_string_lossy().into_owned();

        let config = build_config(parse(&[
            "-c", &file_arg,
            "--source-root", "/override",
            "--lang", "cpp",
            "--include", "b/*.proto",
            "--exclude", "**/y.proto",
            "-I", "/p2",
            "-d", "/d2.jar",
        ]))
        .unwrap();

        assert_eq!(config.source_root, PathBuf::from("/override"));
        assert_eq!(config.language, "cpp");
        assert_eq!(config.includes, vec!["b/*.proto".to_string()]);
        assert_eq!(config.excludes, vec!["**/x.proto".to_string(), "**/y.proto".to_string()]);
        assert_eq!(
            config.additional_protopath,
            vec![dir.path().join("p1"), PathBuf::from("/p2")]
        );
        assert_eq!(
            config.dependencies,
            vec![dir.path().join("d1.jar"), PathBuf::from("/d2.jar")]
        );
    }

    #[test]
    fn test_config_file_values_kept_without_flags() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("protoc.toml");
        std::fs::write(&file, "includes = [\"a/**/*.proto\"]\nprotoc_executable = \"/opt/protoc\"\n").unwrap();
        let file_arg = file.to_string_lossy().into_owned();

        let config = build_config(parse(&["--config", &file_arg])).unwrap();
        assert_eq!(config.includes, vec!["a/**/*.proto".to_string()]);
        assert_eq!(config.protoc_executable, "/opt/protoc");
        assert_eq!(config.source_root, dir.path().join("src/main/proto"));
    }
}
