//! lwgwd - LwM2M gateway daemon
//!
//! Wires the [`lwgw_gateway::GatewayEngine`] to the HTTP collaborators of
//! `lwgw-client` and exposes the ingress API the platform event stream and
//! the protocol engine post to.

pub mod api;
pub mod config;
pub mod error;
pub mod state;

pub use api::create_router;
pub use config::DaemonConfig;
pub use error::ApiError;
pub use state::AppState;

use std::sync::Arc;

use lwgw_client::{
    HttpAttributePublisher, HttpDeviceDirectory, HttpImageRepository, HttpProtocolEngine,
    LocalTokenProvider,
};
use lwgw_core::TokenProvider;
use lwgw_gateway::{Collaborators, GatewayEngine, MemoryCredentialStore};

/// Build the engine against the services named in `config`
pub fn build_engine(config: &DaemonConfig) -> anyhow::Result<GatewayEngine> {
    let tokens: Arc<dyn TokenProvider> = Arc::new(LocalTokenProvider::new(&config.auth.username));

    let directory = HttpDeviceDirectory::new(
        &config.directory.device_manager_url,
        &config.directory.auth_url,
        tokens.clone(),
    )?;
    let images = HttpImageRepository::new(
        &config.images.image_manager_url,
        tokens.clone(),
        config.images.file_server(),
    )?;
    let protocol = HttpProtocolEngine::new(&config.engine.url)?;
    let publisher = HttpAttributePublisher::new(&config.publisher.url)?;

    let collaborators = Collaborators {
        protocol: Arc::new(protocol),
        directory: Arc::new(directory),
        tokens,
        images: Arc::new(images),
        credentials: Arc::new(MemoryCredentialStore::new()),
        publisher: Arc::new(publisher),
    };

    Ok(GatewayEngine::new(collaborators, config.firmware.clone()))
}
