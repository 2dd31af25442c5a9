//! Generated file model and sinks that persist it.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use crate::error::SchemaGenError;
use crate::stubs::compiler::CompilerInvocation;

/// One generated artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedFile {
    /// Path relative to the output root.
    pub path: String,
    pub content: String,
    /// Free-form provenance: `format`, `group`, `artifact`.
    pub metadata: BTreeMap<String, String>,
}

impl GeneratedFile {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn meta(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }
}

/// Everything a generation run produced, in emission order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GeneratedOutput {
    pub files: Vec<GeneratedFile>,
    /// Whether the schema was emitted as a single unit.
    pub single_file: bool,
    /// Schema compiler run the synthesized adapters depend on.
    pub compiler_invocation: Option<CompilerInvocation>,
}

impl GeneratedOutput {
    pub fn file(&self, path: &str) -> Option<&GeneratedFile> {
        self.files.iter().find(|f| f.path == path)
    }

    pub fn paths(&self) -> Vec<&str> {
        self.files.iter().map(|f| f.path.as_str()).collect()
    }

    /// Files whose `format` metadata matches.
    pub fn by_format<'a>(&'a self, format: &'a str) -> impl Iterator<Item = &'a GeneratedFile> + 'a {
        self.files.iter().filter(move |f| f.meta("format") == Some(format))
    }

    /// Appends `file` unless a file with the same path is already present.
    pub fn push_unique(&mut self, file: GeneratedFile) -> bool {
        if self.file(&file.path).is_some() {
            debug!(path = %file.path, "skipping duplicate output path");
            return false;
        }
        self.files.push(file);
        true
    }
}

/// Destination for generated files.
pub trait OutputSink {
    fn write_file(&mut self, file: &GeneratedFile) -> Result<(), SchemaGenError>;
}

/// Writes files below a root directory, creating parents as needed.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    root: PathBuf,
}

impl DirectorySink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn target(&self, relative: &str) -> Result<PathBuf, SchemaGenError> {
        let path = Path::new(relative);
        let escapes = path.components().any(|c| {
            matches!(
                c,
                Component::ParentDir | Component::RootDir | Component::Prefix(_)
            )
        });
        if escapes || relative.is_empty() {
            return Err(SchemaGenError::GenerationError(format!(
                "refusing to write outside the output directory: '{relative}'"
            )));
        }
        Ok(self.root.join(path))
    }
}

impl OutputSink for DirectorySink {
    fn write_file(&mut self, file: &GeneratedFile) -> Result<(), SchemaGenError> {
        let target = self.target(&file.path)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&target, &file.content)?;
        debug!(path = %target.display(), bytes = file.content.len(), "wrote file");
        Ok(())
    }
}

/// Writes every file to `sink`, stopping at the first failure. Files written
/// before the failure stay on disk.
pub fn write_all(output: &GeneratedOutput, sink: &mut dyn OutputSink) -> Result<usize, SchemaGenError> {
    for file in &output.files {
        sink.write_file(file)?;
    }
    Ok(output.files.len())
}
