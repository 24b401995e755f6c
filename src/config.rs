//! Peering configuration model
//!
//! The configuration is a TOML document. Optional peer settings are kept as
//! `Option` and serialize as `null`, so templates always find the key and can
//! fall back to a zero value with the deref helpers.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Errors that can occur when loading or validating a configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("invalid config: {reason}")]
    Invalid { reason: String },
}

/// Global router configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Local AS number
    pub asn: u32,
    pub router_id: String,
    /// Prefixes originated by this router
    #[serde(default)]
    pub prefixes: Vec<String>,
    #[serde(default)]
    pub hostname: Option<String>,
    /// ASPA provider authorizations: customer ASN -> authorized provider ASNs
    #[serde(default, deserialize_with = "deserialize_asn_map")]
    pub authorized_providers: BTreeMap<u32, Vec<u32>>,
    #[serde(default)]
    pub peers: BTreeMap<String, Peer>,
    /// VRRP instances by name
    #[serde(default)]
    pub vrrp: BTreeMap<String, VrrpInstance>,
    #[serde(default)]
    pub output: OutputConfig,
}

/// A BGP peer, possibly reached over several neighbor addresses
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Peer {
    pub asn: u32,
    /// Neighbor addresses; the address family of each is derived from its syntax
    pub neighbors: Vec<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    /// Prefixes accepted from this peer
    pub prefixes: Option<Vec<String>>,
    /// Origin ASNs accepted from this peer
    pub as_set: Option<Vec<u32>>,
    pub import_limit4: Option<u32>,
    pub import_limit6: Option<u32>,
    pub local_pref: Option<u32>,
    pub password: Option<String>,
    pub multihop: Option<bool>,
    pub enforce_first_as: Option<bool>,
    pub enforce_peer_nexthop: Option<bool>,
    /// Reject routes whose path violates the peer's ASPA record
    pub filter_aspa: Option<bool>,
    pub disabled: Option<bool>,
    /// Large communities to attach on import, keyed by name
    pub communities: Option<BTreeMap<String, String>>,
}

/// A keepalived VRRP instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VrrpInstance {
    /// `primary` or `backup`
    pub state: String,
    pub interface: String,
    pub vrid: u32,
    pub priority: u32,
    /// Virtual addresses in CIDR notation
    #[serde(default)]
    pub vips: Vec<String>,
}

/// Where generated files are written
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory receiving `bird.conf` and one file per peer
    pub bird_directory: PathBuf,
    pub ui_file: PathBuf,
    pub keepalived_config: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            bird_directory: PathBuf::from("/etc/bird"),
            ui_file: PathBuf::from("/run/pathgen/ui.html"),
            keepalived_config: PathBuf::from("/etc/keepalived/keepalived.conf"),
        }
    }
}

impl Config {
    /// Load and validate a configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load and validate a configuration from a TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the preconditions the templates rely on
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.asn == 0 {
            return Err(ConfigError::Invalid {
                reason: "asn must be non-zero".to_string(),
            });
        }

        for (name, peer) in &self.peers {
            if peer.asn == 0 {
                return Err(ConfigError::Invalid {
                    reason: format!("peer {} has no asn", name),
                });
            }
            if peer.neighbors.is_empty() {
                return Err(ConfigError::Invalid {
                    reason: format!("peer {} has no neighbors", name),
                });
            }
            if peer.filter_aspa == Some(true) && !self.authorized_providers.contains_key(&peer.asn) {
                return Err(ConfigError::Invalid {
                    reason: format!(
                        "peer {} filters ASPA but AS{} has no authorized providers",
                        name, peer.asn
                    ),
                });
            }
        }

        // Peer files and protocol names are keyed by the sanitized name
        let mut sanitized: HashMap<String, &str> = HashMap::new();
        for name in self.peers.keys() {
            if let Some(other) = sanitized.insert(sanitize(name), name) {
                return Err(ConfigError::Invalid {
                    reason: format!("peers {} and {} have the same sanitized name {}", other, name, sanitize(name)),
                });
            }
        }

        for (name, instance) in &self.vrrp {
            if instance.vips.is_empty() {
                return Err(ConfigError::Invalid {
                    reason: format!("VRRP instance {} has no vips", name),
                });
            }
        }

        Ok(())
    }
}

impl Peer {
    /// Address family tag (`"4"` or `"6"`) for a neighbor address
    pub fn address_family(neighbor: &str) -> &'static str {
        if neighbor.contains(':') {
            "6"
        } else {
            "4"
        }
    }
}

/// TOML keys are always strings, so ASN keys are parsed by hand.
/// Both `64500` and `AS64500` are accepted.
fn deserialize_asn_map<'de, D>(deserializer: D) -> Result<BTreeMap<u32, Vec<u32>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, Vec<u32>>::deserialize(deserializer)?;
    raw.into_iter()
        .map(|(key, providers)| {
            let asn = key
                .strip_prefix("AS")
                .unwrap_or(&key)
                .parse::<u32>()
                .map_err(|_| serde::de::Error::custom(format!("invalid ASN key '{}'", key)))?;
            Ok((asn, providers))
        })
        .collect()
}

/// Turn a peer name into a string usable inside a BIRD protocol identifier
///
/// Letters are uppercased, everything that is not ASCII alphanumeric becomes
/// `_`, and a leading digit is prefixed with `PEER_`.
pub fn sanitize(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();

    match sanitized.chars().next() {
        Some(c) if c.is_ascii_digit() => format!("PEER_{}", sanitized),
        None => "PEER".to_string(),
        _ => sanitized,
    }
}
