//! Compiled templates and the render entry point

use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use handlebars::Handlebars;
use serde::Serialize;
use tracing::debug;

use super::helpers::{self, BUILTIN_HELPERS};
use super::validate::find_unknown_function;
use crate::error::{CompileError, RenderError};
use crate::registry::ProtocolRegistry;

/// The four templates every bundle provides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateKind {
    /// One BIRD file per peer
    Peer,
    /// The main BIRD configuration
    Global,
    /// Status page listing allocated protocols
    Ui,
    /// keepalived configuration
    Vrrp,
}

impl TemplateKind {
    pub const ALL: [TemplateKind; 4] = [
        TemplateKind::Peer,
        TemplateKind::Global,
        TemplateKind::Ui,
        TemplateKind::Vrrp,
    ];

    /// Fixed resource name of the template
    pub fn name(self) -> &'static str {
        match self {
            TemplateKind::Peer => "peer",
            TemplateKind::Global => "global",
            TemplateKind::Ui => "ui",
            TemplateKind::Vrrp => "vrrp",
        }
    }

    fn file_name(self) -> String {
        format!("{}.hbs", self.name())
    }
}

impl fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Sources for the four templates
#[derive(Debug, Clone)]
pub struct TemplateBundle {
    peer: String,
    global: String,
    ui: String,
    vrrp: String,
}

impl TemplateBundle {
    pub fn new(
        peer: impl Into<String>,
        global: impl Into<String>,
        ui: impl Into<String>,
        vrrp: impl Into<String>,
    ) -> Self {
        Self {
            peer: peer.into(),
            global: global.into(),
            ui: ui.into(),
            vrrp: vrrp.into(),
        }
    }

    /// The templates compiled into the binary
    pub fn embedded() -> Self {
        Self::new(
            include_str!("../../templates/peer.hbs"),
            include_str!("../../templates/global.hbs"),
            include_str!("../../templates/ui.hbs"),
            include_str!("../../templates/vrrp.hbs"),
        )
    }

    /// Read `peer.hbs`, `global.hbs`, `ui.hbs` and `vrrp.hbs` from a directory
    pub fn from_dir(dir: &Path) -> Result<Self, CompileError> {
        let read = |kind: TemplateKind| {
            let path = dir.join(kind.file_name());
            std::fs::read_to_string(&path).map_err(|source| CompileError::Read {
                template: kind.name().to_string(),
                path,
                source,
            })
        };

        Ok(Self {
            peer: read(TemplateKind::Peer)?,
            global: read(TemplateKind::Global)?,
            ui: read(TemplateKind::Ui)?,
            vrrp: read(TemplateKind::Vrrp)?,
        })
    }

    pub fn source(&self, kind: TemplateKind) -> &str {
        match kind {
            TemplateKind::Peer => &self.peer,
            TemplateKind::Global => &self.global,
            TemplateKind::Ui => &self.ui,
            TemplateKind::Vrrp => &self.vrrp,
        }
    }
}

impl Default for TemplateBundle {
    fn default() -> Self {
        Self::embedded()
    }
}

/// A loaded set of templates bound to a protocol name registry
///
/// Only a successful [`TemplateEngine::load`] produces an engine, so holding
/// one means every template compiled. Rendering takes `&self` and the engine
/// can be shared across threads.
pub struct TemplateEngine {
    handlebars: Handlebars<'static>,
    registry: Arc<ProtocolRegistry>,
}

impl TemplateEngine {
    /// Compile all four templates of `bundle`
    ///
    /// The first template that fails aborts the whole load.
    pub fn load(bundle: &TemplateBundle, registry: Arc<ProtocolRegistry>) -> Result<Self, CompileError> {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(true);
        handlebars.register_escape_fn(handlebars::no_escape);

        let functions = helpers::register(&mut handlebars, &registry);
        let known: HashSet<&str> = functions
            .iter()
            .chain(BUILTIN_HELPERS)
            .copied()
            .collect();

        for kind in TemplateKind::ALL {
            handlebars
                .register_template_string(kind.name(), bundle.source(kind))
                .map_err(|source| CompileError::Syntax {
                    template: kind.name().to_string(),
                    source,
                })?;

            if let Some(function) = handlebars
                .get_template(kind.name())
                .and_then(|template| find_unknown_function(template, &known))
            {
                return Err(CompileError::UnknownFunction {
                    template: kind.name().to_string(),
                    function,
                });
            }
            debug!(template = %kind, "compiled template");
        }

        Ok(Self {
            handlebars,
            registry,
        })
    }

    /// Render one template against `context`
    pub fn render<T: Serialize>(&self, kind: TemplateKind, context: &T) -> Result<String, RenderError> {
        debug!(template = %kind, "rendering");
        self.handlebars
            .render(kind.name(), context)
            .map_err(|source| RenderError {
                template: kind.name().to_string(),
                source,
            })
    }

    /// The registry protocol names are allocated from
    pub fn registry(&self) -> &Arc<ProtocolRegistry> {
        &self.registry
    }
}

impl fmt::Debug for TemplateEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateEngine")
            .field("protocols", &self.registry.len())
            .finish_non_exhaustive()
    }
}
