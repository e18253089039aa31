/// Building and running a protoc command line

use std::collections::BTreeSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{BuildError, Result};

/// Executable used when none is configured; resolved through `PATH`
pub const DEFAULT_EXECUTABLE: &str = "protoc";

/// Output language used when none is configured
pub const DEFAULT_LANGUAGE: &str = "java";

/// Builder for a [`CompileRequest`]
#[derive(Debug, Clone)]
pub struct ProtocBuilder {
    executable: String,
    output_directory: PathBuf,
    language: String,
    protopath: Vec<PathBuf>,
    proto_files: BTreeSet<PathBuf>,
}

impl ProtocBuilder {
    pub fn new(executable: impl Into<String>, output_directory: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            output_directory: output_directory.into(),
            language: DEFAULT_LANGUAGE.to_string(),
            protopath: Vec::new(),
            proto_files: BTreeSet::new(),
        }
    }

    /// Select the generator, i.e. the `--<language>_out` flag
    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Append a search path element. Elements keep insertion order and a
    /// repeated element keeps its first position.
    pub fn add_protopath_element(mut self, element: impl Into<PathBuf>) -> Self {
        let element = element.into();
        if !self.protopath.contains(&element) {
            self.protopath.push(element);
        }
        self
    }

    pub fn add_protopath_elements<I>(self, elements: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<PathBuf>,
    {
        elements
            .into_iter()
            .fold(self, |builder, element| builder.add_protopath_element(element))
    }

    pub fn add_proto_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.proto_files.insert(file.into());
        self
    }

    pub fn add_proto_files<I>(self, files: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<PathBuf>,
    {
        files
            .into_iter()
            .fold(self, |builder, file| builder.add_proto_file(file))
    }

    /// Validate the request and create the output directory.
    pub fn build(self) -> Result<CompileRequest> {
        if self.executable.trim().is_empty() {
            return Err(BuildError::configuration("protoc executable is empty"));
        }
        if self.language.trim().is_empty() {
            return Err(BuildError::configuration("output language is empty"));
        }
        if self.proto_files.is_empty() {
            return Err(BuildError::invalid_input(
                &self.output_directory,
                "no proto files to compile",
            ));
        }
        std::fs::create_dir_all(&self.output_directory).map_err(|e| {
            BuildError::invalid_input(
                &self.output_directory,
                format!("output directory could not be created: {}", e),
            )
        })?;

        Ok(CompileRequest {
            executable: self.executable,
            output_directory: self.output_directory,
            language: self.language,
            protopath: self.protopath,
            proto_files: self.proto_files,
        })
    }
}

/// A validated protoc invocation
#[derive(Debug, Clone)]
pub struct CompileRequest {
    executable: String,
    output_directory: PathBuf,
    language: String,
    protopath: Vec<PathBuf>,
    proto_files: BTreeSet<PathBuf>,
}

impl CompileRequest {
    pub fn executable(&self) -> &str {
        &self.executable
    }

    pub fn output_directory(&self) -> &Path {
        &self.output_directory
    }

    pub fn protopath(&self) -> &[PathBuf] {
        &self.protopath
    }

    pub fn proto_files(&self) -> &BTreeSet<PathBuf> {
        &self.proto_files
    }

    /// The argument vector passed to protoc: one `--proto_path` per element
    /// in order, the output flag, then every proto file.
    pub fn arguments(&self) -> Vec<OsString> {
        let mut args = Vec::with_capacity(self.protopath.len() + self.proto_files.len() + 1);
        for element in &self.protopath {
            let mut arg = OsString::from("--proto_path=");
            arg.push(element);
            args.push(arg);
        }
        let mut out = OsString::from(format!("--{}_out=", self.language));
        out.push(&self.output_directory);
        args.push(out);
        args.extend(self.proto_files.iter().map(|f| f.clone().into_os_string()));
        args
    }

    /// Human readable command line, for logging
    pub fn command_line(&self) -> String {
        std::iter::once(self.executable.clone())
            .chain(self.arguments().iter().map(|a| a.to_string_lossy().into_owned()))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Run protoc and wait for it to exit.
    ///
    /// A non-zero exit is reported in the result, not as an error. Only a
    /// failure to launch the process is an error here.
    pub fn run(&self) -> Result<CompileResult> {
        tracing::debug!("Running {}", self.command_line());
        let output = Command::new(&self.executable)
            .args(self.arguments())
            .output()
            .map_err(|source| BuildError::Spawn {
                executable: self.executable.clone(),
                source,
            })?;

        Ok(CompileResult {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Exit status and captured output of one protoc run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileResult {
    /// `None` when the process was terminated by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CompileResult {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Convert a failed run into a [`BuildError::Compilation`]
    pub fn into_result(self) -> Result<CompileResult> {
        if self.success() {
            Ok(self)
        } else {
            Err(BuildError::Compilation {
                exit_code: self.exit_code,
                stdout: self.stdout,
                stderr: self.stderr,
            })
        }
    }
}
