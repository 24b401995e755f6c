//! pathgen - render router daemon configuration from a declarative peering config
//!
//! This library turns a [`Config`] into BIRD configuration (one global file
//! plus one file per peer), a status page, and a keepalived configuration.
//!
//! # Example
//!
//! ```rust
//! use pathgen::{generate, Config};
//!
//! let config = Config::from_str(r#"
//!     asn = 65530
//!     router_id = "192.0.2.1"
//!
//!     [peers.Example]
//!     asn = 64500
//!     neighbors = ["203.0.113.1"]
//! "#).unwrap();
//!
//! let generated = generate(&config).unwrap();
//! assert!(generated.artifacts.iter().any(|a| a.text.contains("EXAMPLE_AS64500_v4")));
//! ```

pub mod config;
pub mod error;
pub mod filter;
pub mod format;
pub mod output;
pub mod registry;
pub mod template;

pub use config::{Config, ConfigError, Peer, VrrpInstance};
pub use error::{CompileError, RenderError};
pub use output::{Artifact, OutputError};
pub use registry::{Protocol, ProtocolRegistry};
pub use template::{TemplateBundle, TemplateEngine, TemplateKind};

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors that can occur during a generation run
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("template error: {0}")]
    Compile(#[from] CompileError),

    #[error("{0}")]
    Render(#[from] RenderError),

    #[error("output error: {0}")]
    Output(#[from] OutputError),
}

/// What to do when one template fails to render
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Stop at the first failure
    #[default]
    Abort,
    /// Record the failure and render the remaining artifacts
    Continue,
}

/// Options for a generation run
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    /// Template sources
    pub templates: TemplateBundle,
    pub failure_policy: FailurePolicy,
}

impl GenerateOptions {
    /// Create options with the embedded templates
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different template bundle
    pub fn with_templates(mut self, templates: TemplateBundle) -> Self {
        self.templates = templates;
        self
    }

    /// Set the failure policy
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }
}

/// Result of a generation run
#[derive(Debug, Default)]
pub struct Generated {
    pub artifacts: Vec<Artifact>,
    /// Renders that failed under [`FailurePolicy::Continue`]
    pub failures: Vec<RenderError>,
}

impl Generated {
    /// Write every artifact to its path
    pub fn write(&self) -> Result<(), GenerateError> {
        output::write_artifacts(&self.artifacts)?;
        Ok(())
    }

    fn record(
        &mut self,
        kind: TemplateKind,
        path: PathBuf,
        rendered: Result<String, RenderError>,
        policy: FailurePolicy,
    ) -> Result<(), RenderError> {
        match rendered {
            Ok(text) => {
                self.artifacts.push(Artifact { kind, path, text });
                Ok(())
            }
            Err(err) if policy == FailurePolicy::Continue => {
                warn!(path = %path.display(), error = %err, "skipping artifact");
                self.failures.push(err);
                Ok(())
            }
            Err(err) => Err(err),
        }
    }
}

#[derive(Serialize)]
struct Neighbor<'a> {
    address: &'a str,
    af: &'static str,
}

/// Render context of the `peer` template
#[derive(Serialize)]
struct PeerContext<'a> {
    name: &'a str,
    protocol_name: String,
    peer: &'a Peer,
    neighbors: Vec<Neighbor<'a>>,
    config: &'a Config,
}

impl<'a> PeerContext<'a> {
    fn new(name: &'a str, peer: &'a Peer, config: &'a Config) -> Self {
        let neighbors = peer
            .neighbors
            .iter()
            .map(|address| Neighbor {
                address,
                af: Peer::address_family(address),
            })
            .collect();

        Self {
            name,
            protocol_name: crate::config::sanitize(name),
            peer,
            neighbors,
            config,
        }
    }
}

/// Render context of the `global` template: the config plus originated
/// prefixes split by address family
#[derive(Serialize)]
struct GlobalContext<'a> {
    #[serde(flatten)]
    config: &'a Config,
    prefixes4: Vec<&'a str>,
    prefixes6: Vec<&'a str>,
}

impl<'a> GlobalContext<'a> {
    fn new(config: &'a Config) -> Self {
        let (prefixes6, prefixes4): (Vec<&str>, Vec<&str>) = config
            .prefixes
            .iter()
            .map(String::as_str)
            .partition(|prefix| Peer::address_family(prefix) == "6");

        Self {
            config,
            prefixes4,
            prefixes6,
        }
    }
}

/// Render context of the `ui` template
#[derive(Serialize)]
struct UiContext<'a> {
    config: &'a Config,
    protocols: BTreeMap<String, Protocol>,
}

/// Generate all artifacts with the embedded templates and default options
pub fn generate(config: &Config) -> Result<Generated, GenerateError> {
    generate_with_options(config, &GenerateOptions::default())
}

/// Load a TOML config file and generate all artifacts
pub fn generate_from_file(path: &Path, options: &GenerateOptions) -> Result<Generated, GenerateError> {
    let config = Config::from_file(path)?;
    generate_with_options(&config, options)
}

/// Generate all artifacts with a fresh protocol registry
pub fn generate_with_options(config: &Config, options: &GenerateOptions) -> Result<Generated, GenerateError> {
    let registry = Arc::new(ProtocolRegistry::new());
    let engine = TemplateEngine::load(&options.templates, registry)?;
    Ok(render_all(config, &engine, options.failure_policy)?)
}

/// Render every artifact of `config` with an already loaded engine
///
/// Peers are rendered in name order, then the global file, the status page,
/// and the keepalived config (only if VRRP instances are declared). Peer
/// renders are sequential so protocol names are allocated deterministically.
pub fn render_all(
    config: &Config,
    engine: &TemplateEngine,
    policy: FailurePolicy,
) -> Result<Generated, RenderError> {
    let mut generated = Generated::default();
    let bird_directory = &config.output.bird_directory;

    for (name, peer) in &config.peers {
        let context = PeerContext::new(name, peer, config);
        let path = bird_directory
            .join("peers")
            .join(format!("{}.conf", context.protocol_name));
        let rendered = engine.render(TemplateKind::Peer, &context);
        generated.record(TemplateKind::Peer, path, rendered, policy)?;
    }

    let rendered = engine.render(TemplateKind::Global, &GlobalContext::new(config));
    generated.record(TemplateKind::Global, bird_directory.join("bird.conf"), rendered, policy)?;

    let ui = UiContext {
        config,
        protocols: engine.registry().lookup(),
    };
    let rendered = engine.render(TemplateKind::Ui, &ui);
    generated.record(TemplateKind::Ui, config.output.ui_file.clone(), rendered, policy)?;

    if config.vrrp.is_empty() {
        debug!("no VRRP instances are defined, not rendering keepalived config");
    } else {
        let rendered = engine.render(TemplateKind::Vrrp, &config.vrrp);
        generated.record(
            TemplateKind::Vrrp,
            config.output.keepalived_config.clone(),
            rendered,
            policy,
        )?;
    }

    Ok(generated)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
asn = 65530
router_id = "192.0.2.1"
prefixes = ["192.0.2.0/24", "2001:db8::/48"]

[output]
bird_directory = "/tmp/bird"
ui_file = "/tmp/ui.html"
keepalived_config = "/tmp/keepalived.conf"

[peers.Example]
asn = 64500
neighbors = ["203.0.113.1", "2001:db8:1::1"]
"#;

    fn config() -> Config {
        Config::from_str(CONFIG).expect("Should parse")
    }

    #[test]
    fn test_generate_paths() {
        let generated = generate(&config()).expect("Should generate");
        let paths: Vec<PathBuf> = generated.artifacts.iter().map(|a| a.path.clone()).collect();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("/tmp/bird/peers/EXAMPLE.conf"),
                PathBuf::from("/tmp/bird/bird.conf"),
                PathBuf::from("/tmp/ui.html"),
            ]
        );
        assert!(generated.failures.is_empty());
    }

    #[test]
    fn test_vrrp_skipped_without_instances() {
        let generated = generate(&config()).expect("Should generate");
        assert!(!generated.artifacts.iter().any(|a| a.kind == TemplateKind::Vrrp));
    }

    #[test]
    fn test_peer_context_address_families() {
        let config = config();
        let context = PeerContext::new("Example", &config.peers["Example"], &config);
        let families: Vec<&str> = context.neighbors.iter().map(|n| n.af).collect();
        assert_eq!(families, vec!["4", "6"]);
        assert_eq!(context.protocol_name, "EXAMPLE");
    }

    #[test]
    fn test_global_context_splits_prefixes() {
        let config = config();
        let context = GlobalContext::new(&config);
        assert_eq!(context.prefixes4, vec!["192.0.2.0/24"]);
        assert_eq!(context.prefixes6, vec!["2001:db8::/48"]);

        let json = serde_json::to_value(&context).expect("serializable");
        assert_eq!(json["asn"], 65530);
        assert!(json.get("peers").is_some());
    }

    #[test]
    fn test_abort_policy_stops_at_first_failure() {
        let templates = TemplateBundle::new("{{missing.field}}", "global", "ui", "vrrp");
        let options = GenerateOptions::new().with_templates(templates);
        let result = generate_with_options(&config(), &options);
        assert!(matches!(result, Err(GenerateError::Render(_))));
    }

    #[test]
    fn test_continue_policy_collects_failures() {
        let templates = TemplateBundle::new("peer", "global", "{{missing.field}}", "vrrp");
        let options = GenerateOptions::new()
            .with_templates(templates)
            .with_failure_policy(FailurePolicy::Continue);
        let generated = generate_with_options(&config(), &options).expect("Should continue");

        assert_eq!(generated.failures.len(), 1);
        assert_eq!(generated.failures[0].template, "ui");
        let kinds: Vec<TemplateKind> = generated.artifacts.iter().map(|a| a.kind).collect();
        assert_eq!(kinds, vec![TemplateKind::Peer, TemplateKind::Global]);
    }

    #[test]
    fn test_compile_error_surfaces() {
        let templates = TemplateBundle::new("peer", "{{Unknown x}}", "ui", "vrrp");
        let options = GenerateOptions::new().with_templates(templates);
        let result = generate_with_options(&config(), &options);
        assert!(matches!(result, Err(GenerateError::Compile(CompileError::UnknownFunction { .. }))));
    }
}
