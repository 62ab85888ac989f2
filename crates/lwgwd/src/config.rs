//! Daemon configuration
//!
//! Loaded from a TOML file; every section and key is optional.
//!
//! ```toml
//! [server]
//! listen = "0.0.0.0:8090"
//!
//! [directory]
//! device_manager_url = "http://device-manager:5000"
//! auth_url = "http://auth:5000"
//!
//! [images]
//! image_manager_url = "http://image-manager:5000"
//! data_dir = "./data"
//! file_server_address = "10.0.0.5"
//!
//! [engine]
//! url = "http://lwm2m-engine:8080"
//!
//! [publisher]
//! url = "http://data-broker:8080"
//!
//! [firmware]
//! desired_version_label = "desirable_fw_version"
//!
//! [logging]
//! filter = "lwgwd=info,lwgw_gateway=debug"
//! format = "json"
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use lwgw_client::auth::DEFAULT_USERNAME;
use lwgw_client::images::{DEFAULT_COAPS_PORT, DEFAULT_COAP_PORT};
use lwgw_client::FileServer;
use lwgw_gateway::GatewaySettings;

/// Environment variable overriding `images.file_server_address`
pub const FILE_SERVER_ADDRESS_ENV: &str = "FILE_SERVER_ADDRESS";

pub const DEFAULT_LISTEN: &str = "0.0.0.0:8090";
pub const DEFAULT_LOG_FILTER: &str = "lwgwd=info,lwgw_gateway=debug,lwgw_client=info";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub server: ServerConfig,
    pub directory: DirectoryConfig,
    pub images: ImagesConfig,
    pub engine: EngineConfig,
    pub publisher: PublisherConfig,
    pub auth: AuthConfig,
    pub firmware: GatewaySettings,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: DEFAULT_LISTEN.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    pub device_manager_url: String,
    /// Serves the tenant listing
    pub auth_url: String,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            device_manager_url: "http://device-manager:5000".to_string(),
            auth_url: "http://auth:5000".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ImagesConfig {
    pub image_manager_url: String,
    /// Where downloaded images are stored for the CoAP file server
    pub data_dir: PathBuf,
    pub file_server_address: String,
    pub coap_port: u16,
    pub coaps_port: u16,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            image_manager_url: "http://image-manager:5000".to_string(),
            data_dir: PathBuf::from("./data"),
            file_server_address: "127.0.0.1".to_string(),
            coap_port: DEFAULT_COAP_PORT,
            coaps_port: DEFAULT_COAPS_PORT,
        }
    }
}

impl ImagesConfig {
    pub fn file_server(&self) -> FileServer {
        FileServer {
            address: self.file_server_address.clone(),
            coap_port: self.coap_port,
            coaps_port: self.coaps_port,
            data_dir: self.data_dir.clone(),
        }
    }
}

/// Protocol engine REST bridge
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub url: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8080".to_string(),
        }
    }
}

/// Sink for decoded attribute updates
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PublisherConfig {
    pub url: String,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8000".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub username: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            username: DEFAULT_USERNAME.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Used when `RUST_LOG` is unset
    pub filter: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
            format: LogFormat::Text,
        }
    }
}

impl DaemonConfig {
    /// Read `path`, or fall back to defaults when no path is given.
    /// Environment overrides are applied in both cases.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .map_err(|e| anyhow::anyhow!("reading {}: {}", path.display(), e))?;
                Self::from_toml(&content)?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(address) = lookup(FILE_SERVER_ADDRESS_ENV).filter(|a| !a.is_empty()) {
            self.images.file_server_address = address;
        }
    }
}
