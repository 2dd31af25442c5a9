//! Delegation to the external schema compiler.
//!
//! Generated adapters expect compiled message and service code under
//! [`StubConfig::compiler_output_dir`]. The invocation is described as data so
//! callers can run it, print it or hand it to a build script.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Serialize;
use tracing::{debug, info};

use crate::config::StubConfig;
use crate::error::SchemaGenError;

/// A fully described compiler run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompilerInvocation {
    pub program: String,
    pub args: Vec<String>,
    /// Schema files relative to the working directory.
    pub schema_files: Vec<String>,
    pub output_dir: String,
    /// Rust module the compiled code is expected at.
    pub module_path: String,
}

impl CompilerInvocation {
    /// Arguments followed by the schema files.
    pub fn command_line(&self) -> Vec<String> {
        self.args
            .iter()
            .chain(self.schema_files.iter())
            .cloned()
            .collect()
    }
}

pub fn compiler_invocation(config: &StubConfig, schema_files: Vec<String>) -> CompilerInvocation {
    let output_dir = config.compiler_output_dir.clone();
    CompilerInvocation {
        program: "protoc".to_string(),
        args: vec![
            "-I".to_string(),
            ".".to_string(),
            format!("--prost_out={output_dir}"),
            format!("--tonic_out={output_dir}"),
        ],
        schema_files,
        output_dir,
        module_path: config.templates.proto_module.clone(),
    }
}

/// Every `.proto` file below `root`, sorted, relative to `root`.
pub fn discover_schema_files(root: &Path) -> Result<Vec<String>, SchemaGenError> {
    let mut out = Vec::new();
    walk(root, root, &mut out)?;
    out.sort();
    Ok(out)
}

fn walk(root: &Path, dir: &Path, out: &mut Vec<String>) -> Result<(), SchemaGenError> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            walk(root, &path, out)?;
        } else if path.extension().is_some_and(|ext| ext == "proto") {
            let relative = path.strip_prefix(root).unwrap_or(&path);
            out.push(relative.to_string_lossy().replace('\\', "/"));
        }
    }
    Ok(())
}

/// Runs a [`CompilerInvocation`].
pub trait CompilerDelegate {
    fn compile(&self, invocation: &CompilerInvocation, working_dir: &Path) -> Result<(), SchemaGenError>;
}

/// Spawns the compiler as a child process.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessCompiler;

impl CompilerDelegate for ProcessCompiler {
    fn compile(&self, invocation: &CompilerInvocation, working_dir: &Path) -> Result<(), SchemaGenError> {
        if invocation.schema_files.is_empty() {
            debug!("no schema files to compile");
            return Ok(());
        }
        let out_dir: PathBuf = working_dir.join(&invocation.output_dir);
        fs::create_dir_all(&out_dir)?;

        info!(program = %invocation.program, files = invocation.schema_files.len(), "running schema compiler");
        let output = Command::new(&invocation.program)
            .args(invocation.command_line())
            .current_dir(working_dir)
            .output()
            .map_err(|e| SchemaGenError::ExternalToolError {
                program: invocation.program.clone(),
                output: e.to_string(),
            })?;
        if !output.status.success() {
            let mut text = String::from_utf8_lossy(&output.stderr).into_owned();
            text.push_str(&String::from_utf8_lossy(&output.stdout));
            return Err(SchemaGenError::ExternalToolError {
                program: invocation.program.clone(),
                output: text.trim().to_string(),
            });
        }
        Ok(())
    }
}
