//! Error types for template loading and rendering

use std::path::PathBuf;

use thiserror::Error;

/// A template could not be loaded. Fatal: no engine is produced.
#[derive(Debug, Error)]
pub enum CompileError {
    /// Template source could not be read from disk
    #[error("failed to read {template} template from {path}: {source}")]
    Read {
        template: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Template source is not valid handlebars
    #[error("failed to compile {template} template: {source}")]
    Syntax {
        template: String,
        #[source]
        source: handlebars::TemplateError,
    },

    /// Template calls a function that is not part of the helper set
    #[error("{template} template calls undefined function '{function}'")]
    UnknownFunction { template: String, function: String },
}

impl CompileError {
    /// Name of the template that failed to load
    pub fn template(&self) -> &str {
        match self {
            CompileError::Read { template, .. }
            | CompileError::Syntax { template, .. }
            | CompileError::UnknownFunction { template, .. } => template,
        }
    }
}

/// A single render failed. Earlier renders and registry allocations are unaffected.
#[derive(Debug, Error)]
#[error("failed to render {template} template: {source}")]
pub struct RenderError {
    pub template: String,
    #[source]
    pub source: handlebars::RenderError,
}
