//! Subgen - on-demand Clash configuration generator
//!
//! On a single trigger path it:
//! - Fetches a newline-delimited `address[#label]` list (optionally a second one)
//! - Turns every line into a named trojan-over-websocket proxy
//! - Renders the full client document (DNS, proxies, groups, rules)
//!
//! Every other path answers with an empty body.

pub mod config;
pub mod entry;
pub mod error;
pub mod fetch;
pub mod logging;
pub mod render;
pub mod server;

pub use config::{ConfigArgs, GeneratorConfig, ServerConfig};
pub use entry::{parse_entries, random_port, split_lines, LabelCounter, ProxyEntry, DEFAULT_PORTS};
pub use error::{ConfigError, FetchError, GenerateError};
pub use fetch::{HttpListSource, ListSource};
pub use render::{render_document, RenderParams, RenderStyle};
pub use server::ConfigServer;
