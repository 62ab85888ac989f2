//! Image manager client and firmware download URIs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument};

use lwgw_core::{GatewayResult, ImageRepository, TokenProvider};

use crate::error::{ClientError, Result};
use crate::http::RestClient;

/// Default CoAP port of the firmware file server
pub const DEFAULT_COAP_PORT: u16 = 5693;
/// Default CoAPs port of the firmware file server
pub const DEFAULT_COAPS_PORT: u16 = 5694;

/// One entry of the image manager's listing
#[derive(Debug, Clone, Deserialize)]
pub struct ImageEntry {
    pub id: String,
    pub label: String,
    pub fw_version: String,
    /// Binary has been uploaded
    #[serde(default)]
    pub confirmed: bool,
}

/// Where the file server serves downloaded images from
#[derive(Debug, Clone)]
pub struct FileServer {
    pub address: String,
    pub coap_port: u16,
    pub coaps_port: u16,
    /// Directory images are stored in and served from
    pub data_dir: PathBuf,
}

impl FileServer {
    pub fn uri(&self, image_id: &str, secure: bool) -> String {
        let (scheme, port) = if secure {
            ("coaps", self.coaps_port)
        } else {
            ("coap", self.coap_port)
        };
        format!("{}://{}:{}/data/{}.hex", scheme, self.address, port, image_id)
    }

    pub fn image_path(&self, image_id: &str) -> PathBuf {
        self.data_dir.join(format!("{}.hex", image_id))
    }
}

pub struct HttpImageRepository {
    http: RestClient,
    tokens: Arc<dyn TokenProvider>,
    files: FileServer,
}

impl HttpImageRepository {
    pub fn new(image_manager_url: &str, tokens: Arc<dyn TokenProvider>, files: FileServer) -> Result<Self> {
        Ok(Self {
            http: RestClient::new(image_manager_url)?,
            tokens,
            files,
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.files.data_dir
    }

    pub async fn list_images(&self, token: &str) -> Result<Vec<ImageEntry>> {
        let response = self.http.get(&["image"])?.bearer_auth(token).send().await?;
        Ok(RestClient::check(response).await?.json().await?)
    }

    async fn fetch_binary(&self, image_id: &str, token: &str) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.files.data_dir).await?;

        let response = self.http.get(&["image", image_id, "binary"])?.bearer_auth(token).send().await?;
        let response = RestClient::check(response).await?;

        let target = self.files.image_path(image_id);
        let mut file = tokio::fs::File::create(&target).await?;
        let mut stream = response.bytes_stream();
        let mut written = 0usize;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            written += chunk.len();
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        debug!(image_id = %image_id, bytes = written, path = %target.display(), "Image stored");
        Ok(target)
    }
}

#[async_trait]
impl ImageRepository for HttpImageRepository {
    #[instrument(skip(self))]
    async fn resolve_image(&self, tenant: &str, label: &str, version: &str) -> GatewayResult<Option<String>> {
        let token = self.tokens.get_token(tenant).await?;
        let images = self
            .list_images(&token)
            .await
            .map_err(ClientError::into_upstream)?;

        let found = images
            .into_iter()
            .find(|img| img.label == label && img.fw_version == version && img.confirmed)
            .map(|img| img.id);
        debug!(found = ?found, "Image lookup");
        Ok(found)
    }

    #[instrument(skip(self, token))]
    async fn download_image(&self, image_id: &str, token: &str) -> GatewayResult<PathBuf> {
        let path = self
            .fetch_binary(image_id, token)
            .await
            .map_err(ClientError::into_upstream)?;
        info!(image_id = %image_id, "Firmware image downloaded");
        Ok(path)
    }

    fn build_download_uri(&self, image_id: &str, secure: bool) -> String {
        self.files.uri(image_id, secure)
    }
}
