//! Template loading and rendering for the stub synthesizer.

use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

use serde::Serialize;
use tera::{Context, Tera};
use tracing::{debug, warn};

use super::Artifact;
use crate::config::{TemplateConfig, TemplateSourceKind};
use crate::error::SchemaGenError;

const TYPES: &str = include_str!("../../templates/types.tera");
const SERVICE: &str = include_str!("../../templates/service.tera");
const ADAPTER: &str = include_str!("../../templates/adapter.tera");
const CLIENT: &str = include_str!("../../templates/client.tera");
const BRIDGE: &str = include_str!("../../templates/bridge.tera");
const REGISTRATION: &str = include_str!("../../templates/registration.tera");

/// Supplies template text for an artifact.
pub trait TemplateSource {
    fn load(&self, artifact: Artifact, name: &str) -> Result<String, SchemaGenError>;
}

/// Templates compiled into the crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinTemplates;

impl BuiltinTemplates {
    pub fn text(artifact: Artifact) -> &'static str {
        match artifact {
            Artifact::Types => TYPES,
            Artifact::Service => SERVICE,
            Artifact::Adapter => ADAPTER,
            Artifact::Client => CLIENT,
            Artifact::Bridge => BRIDGE,
            Artifact::Registration => REGISTRATION,
        }
    }
}

impl TemplateSource for BuiltinTemplates {
    fn load(&self, artifact: Artifact, _name: &str) -> Result<String, SchemaGenError> {
        Ok(Self::text(artifact).to_string())
    }
}

/// Templates read from `<root>/<name>.tera`; missing files fall back to the
/// builtin text.
#[derive(Debug, Clone)]
pub struct DirectoryTemplates {
    root: PathBuf,
}

impl DirectoryTemplates {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl TemplateSource for DirectoryTemplates {
    fn load(&self, artifact: Artifact, name: &str) -> Result<String, SchemaGenError> {
        let path = self.root.join(format!("{name}.tera"));
        if !path.is_file() {
            debug!(path = %path.display(), "template not found, using builtin");
            return Ok(BuiltinTemplates::text(artifact).to_string());
        }
        fs::read_to_string(&path).map_err(|e| {
            SchemaGenError::TemplateError(format!("cannot read {}: {e}", path.display()))
        })
    }
}

/// Loads each template once and renders it against serialized data.
pub struct TemplateManager {
    source: Box<dyn TemplateSource>,
    tera: Tera,
    loaded: HashSet<String>,
}

impl TemplateManager {
    pub fn new(source: Box<dyn TemplateSource>) -> Self {
        let mut tera = Tera::default();
        // generated Rust, not HTML
        tera.autoescape_on(Vec::new());
        Self {
            source,
            tera,
            loaded: HashSet::new(),
        }
    }

    pub fn from_config(config: &TemplateConfig) -> Result<Self, SchemaGenError> {
        config.check()?;
        let source: Box<dyn TemplateSource> = match config.source {
            TemplateSourceKind::Builtin => Box::new(BuiltinTemplates),
            TemplateSourceKind::Directory => {
                let root = config.base_path.clone().unwrap_or_default();
                if !PathBuf::from(&root).is_dir() {
                    warn!(path = %root, "template directory does not exist");
                }
                Box::new(DirectoryTemplates::new(root))
            }
        };
        Ok(Self::new(source))
    }

    pub fn render<T: Serialize>(
        &mut self,
        artifact: Artifact,
        name: &str,
        data: &T,
    ) -> Result<String, SchemaGenError> {
        if !self.loaded.contains(name) {
            let text = self.source.load(artifact, name)?;
            self.tera.add_raw_template(name, &text)?;
            self.loaded.insert(name.to_string());
        }
        let context = Context::from_serialize(data)?;
        Ok(self.tera.render(name, &context)?)
    }
}
