//! Template engine for generated daemon configuration
//!
//! Four handlebars templates are compiled once per run: `peer` (one BIRD file
//! per peer), `global` (the main BIRD file), `ui` (status page) and `vrrp`
//! (keepalived). Templates may only call the functions registered in
//! [`helpers`]; anything else is rejected when the engine is loaded.
//!
//! # Example
//!
//! ```text
//! protocol bgp {{unique_protocol_name protocol_name name "4" peer.asn peer.tags}} {
//!     neighbor {{address}} as {{peer.asn}};
//! }
//! ```

mod engine;
pub mod helpers;
mod validate;

pub use engine::{TemplateBundle, TemplateEngine, TemplateKind};
