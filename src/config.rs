//! Deployment configuration
//! One value describes a whole deployment variant: trigger path, TLS host,
//! password, upstream lists and output style

use crate::entry::DEFAULT_PORTS;
use crate::error::ConfigError;
use crate::render::{RenderParams, RenderStyle};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

/// Listening socket configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub http_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { http_port: 8080 }
    }
}

/// Everything the generation pipeline needs for one deployment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Exact request path that triggers generation
    pub trigger_path: String,
    /// SNI and websocket Host value
    pub hostname: String,
    /// Shared trojan password
    pub password: String,
    /// Client mixed port written into the document
    pub listen_port: u16,
    /// Pool a portless address draws its port from
    pub default_ports: Vec<u16>,
    /// Primary address list
    pub list_url: String,
    /// Optional second list appended after the primary one
    pub domain_list_url: Option<String>,
    pub style: RenderStyle,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            trigger_path: "/auto".to_string(),
            hostname: "ygtr.zxkjd.icu".to_string(),
            password: "auto".to_string(),
            listen_port: 7890,
            default_ports: DEFAULT_PORTS.to_vec(),
            list_url: "https://raw.githubusercontent.com/9333936/newip/refs/heads/main/newip.txt".to_string(),
            domain_list_url: None,
            style: RenderStyle::Singular,
        }
    }
}

impl GeneratorConfig {
    /// Load a JSON config file; missing fields keep their defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().display().to_string();

        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path_str.clone(),
            source,
        })?;

        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path_str,
            source,
        })
    }

    /// Check the values the pipeline relies on
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.trigger_path.starts_with('/') {
            return Err(ConfigError::Invalid(format!(
                "trigger path must start with '/': {}",
                self.trigger_path
            )));
        }

        if self.hostname.trim().is_empty() {
            return Err(ConfigError::Invalid("hostname is empty".to_string()));
        }

        if self.password.is_empty() {
            return Err(ConfigError::Invalid("password is empty".to_string()));
        }

        if self.default_ports.is_empty() {
            return Err(ConfigError::Invalid("default port pool is empty".to_string()));
        }

        if self.default_ports.contains(&0) {
            return Err(ConfigError::Invalid("default port pool contains port 0".to_string()));
        }

        for url in self.list_urls() {
            validate_list_url(url)?;
        }

        Ok(())
    }

    /// Lists to fetch, primary first
    pub fn list_urls(&self) -> Vec<&str> {
        let mut urls = vec![self.list_url.as_str()];
        if let Some(ref secondary) = self.domain_list_url {
            urls.push(secondary.as_str());
        }
        urls
    }

    /// Renderer parameters for this deployment
    pub fn render_params(&self) -> RenderParams {
        RenderParams {
            hostname: self.hostname.clone(),
            password: self.password.clone(),
            listen_port: self.listen_port,
            style: self.style,
        }
    }
}

/// Command-line and environment overrides shared by the binaries
#[derive(clap::Args, Debug, Default)]
pub struct ConfigArgs {
    /// JSON config file; flags below override its values
    #[arg(long, env = "SUBGEN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Path that triggers generation
    #[arg(long, env = "TRIGGER_PATH")]
    pub trigger_path: Option<String>,

    /// SNI / websocket Host written into every proxy
    #[arg(long, env = "PROXY_HOSTNAME")]
    pub hostname: Option<String>,

    /// Shared trojan password
    #[arg(long, env = "PROXY_PASSWORD")]
    pub password: Option<String>,

    /// Client mixed port written into the document
    #[arg(long, env = "LISTEN_PORT")]
    pub listen_port: Option<u16>,

    /// Comma-separated pool for addresses without a port
    #[arg(long, env = "DEFAULT_PORTS", value_delimiter = ',')]
    pub default_ports: Option<Vec<u16>>,

    /// Primary address list URL
    #[arg(long, env = "LIST_URL")]
    pub list_url: Option<String>,

    /// Secondary (domain) list URL
    #[arg(long, env = "DOMAIN_LIST_URL")]
    pub domain_list_url: Option<String>,

    /// Output style
    #[arg(long, env = "RENDER_STYLE", value_enum)]
    pub style: Option<RenderStyle>,
}

impl ConfigArgs {
    /// Build the final config: file (or defaults), then overrides, then validation
    pub fn resolve(self) -> Result<GeneratorConfig, ConfigError> {
        let mut config = match self.config {
            Some(ref path) => GeneratorConfig::from_file(path)?,
            None => GeneratorConfig::default(),
        };

        if let Some(trigger_path) = self.trigger_path {
            config.trigger_path = trigger_path;
        }
        if let Some(hostname) = self.hostname {
            config.hostname = hostname;
        }
        if let Some(password) = self.password {
            config.password = password;
        }
        if let Some(listen_port) = self.listen_port {
            config.listen_port = listen_port;
        }
        if let Some(default_ports) = self.default_ports {
            config.default_ports = default_ports;
        }
        if let Some(list_url) = self.list_url {
            config.list_url = list_url;
        }
        if self.domain_list_url.is_some() {
            config.domain_list_url = self.domain_list_url;
        }
        if let Some(style) = self.style {
            config.style = style;
        }

        config.validate()?;
        Ok(config)
    }
}

fn validate_list_url(raw: &str) -> Result<(), ConfigError> {
    let url = Url::parse(raw)
        .map_err(|e| ConfigError::Invalid(format!("invalid list url {}: {}", raw, e)))?;

    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::Invalid(format!(
            "list url {} has unsupported scheme {}",
            raw, other
        ))),
    }
}
