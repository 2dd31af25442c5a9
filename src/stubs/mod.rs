//! Rust adapter synthesis over prost/tonic generated code.
//!
//! For every message the synthesizer renders conversion functions between the
//! domain type and the compiled type; for every service it renders a tonic
//! server adapter delegating to a domain trait, a domain-typed client, and
//! optional registration helpers. Rendering goes through Tera templates that
//! can be replaced from a directory.

pub mod compiler;
pub mod conversions;
pub mod data;
pub mod templates;

use std::fmt;

use tracing::{debug, info};

use crate::config::{GeneratorConfig, StubConfig, TemplateNames};
use crate::error::SchemaGenError;
use crate::ir::GenerationContext;
use crate::output::GeneratedFile;
use crate::proto_codegen::SchemaGenerator;
use templates::TemplateManager;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Artifact {
    Types,
    Service,
    Adapter,
    Client,
    Bridge,
    Registration,
}

impl Artifact {
    pub const ALL: [Artifact; 6] = [
        Artifact::Types,
        Artifact::Service,
        Artifact::Adapter,
        Artifact::Client,
        Artifact::Bridge,
        Artifact::Registration,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Artifact::Types => "types",
            Artifact::Service => "service",
            Artifact::Adapter => "adapter",
            Artifact::Client => "client",
            Artifact::Bridge => "bridge",
            Artifact::Registration => "registration",
        }
    }

    pub fn file_name(self) -> String {
        format!("{}.rs", self.name())
    }

    fn template_name(self, names: &TemplateNames) -> &str {
        match self {
            Artifact::Types => &names.types,
            Artifact::Service => &names.service,
            Artifact::Adapter => &names.adapter,
            Artifact::Client => &names.client,
            Artifact::Bridge => &names.bridge,
            Artifact::Registration => &names.registration,
        }
    }

    fn enabled(self, stubs: &StubConfig) -> bool {
        match self {
            Artifact::Service => stubs.original_service_interface,
            Artifact::Registration => stubs.registration_helpers,
            _ => true,
        }
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// True when `content` holds nothing but comments, imports, inner
/// attributes and blank lines.
pub fn is_effectively_empty(content: &str) -> bool {
    content.lines().map(str::trim).all(|line| {
        line.is_empty() || line.starts_with("//") || line.starts_with("use ") || line.starts_with("#![")
    })
}

/// Renders adapter sources for one context.
pub struct StubSynthesizer<'a> {
    config: &'a GeneratorConfig,
    stubs: &'a StubConfig,
    templates: TemplateManager,
}

impl<'a> StubSynthesizer<'a> {
    pub fn new(config: &'a GeneratorConfig, stubs: &'a StubConfig) -> Result<Self, SchemaGenError> {
        Ok(Self {
            config,
            stubs,
            templates: TemplateManager::from_config(&stubs.templates)?,
        })
    }

    /// Uses a caller-supplied template manager.
    pub fn with_templates(
        config: &'a GeneratorConfig,
        stubs: &'a StubConfig,
        templates: TemplateManager,
    ) -> Self {
        Self {
            config,
            stubs,
            templates,
        }
    }

    /// Renders every enabled artifact, skipping files with no definitions.
    /// A `mod.rs` declaring the produced modules is added when anything was
    /// produced.
    pub fn synthesize(&mut self, ctx: &GenerationContext) -> Result<Vec<GeneratedFile>, SchemaGenError> {
        let generator = SchemaGenerator::new(ctx, self.config);
        let data = data::build(generator.resolver(), self.config, self.stubs, generator.package_name());

        let mut files = Vec::new();
        let mut modules = Vec::new();
        for artifact in Artifact::ALL {
            if !artifact.enabled(self.stubs) {
                continue;
            }
            let name = artifact.template_name(&self.stubs.templates.names).to_string();
            let content = self.templates.render(artifact, &name, &data)?;
            if is_effectively_empty(&content) {
                debug!(artifact = %artifact, "skipping empty artifact");
                continue;
            }
            modules.push(artifact.name());
            files.push(
                GeneratedFile::new(self.path(&artifact.file_name()), content)
                    .with_meta("format", "stub")
                    .with_meta("artifact", artifact.name()),
            );
        }

        if !modules.is_empty() {
            let mut module = String::from("// Generated by proto_schemagen. DO NOT EDIT.\n\n");
            for name in &modules {
                module.push_str(&format!("pub mod {name};\n"));
            }
            files.push(
                GeneratedFile::new(self.path("mod.rs"), module)
                    .with_meta("format", "stub")
                    .with_meta("artifact", "mod"),
            );
        }
        info!(files = files.len(), output_dir = %self.stubs.output_dir, "synthesized adapters");
        Ok(files)
    }

    fn path(&self, file: &str) -> String {
        let dir = self.stubs.output_dir.trim_end_matches('/');
        if dir.is_empty() {
            file.to_string()
        } else {
            format!("{dir}/{file}")
        }
    }
}

/// Synthesizes adapters with the stub settings from `config`; nothing is
/// produced when stubs are disabled.
pub fn synthesize(
    ctx: &GenerationContext,
    config: &GeneratorConfig,
) -> Result<Vec<GeneratedFile>, SchemaGenError> {
    let Some(stubs) = config.stubs.as_ref().filter(|s| s.enabled) else {
        return Ok(Vec::new());
    };
    StubSynthesizer::new(config, stubs)?.synthesize(ctx)
}
