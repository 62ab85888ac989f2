//! Device manager client

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument};

use lwgw_core::{DeviceDirectory, GatewayResult, TokenProvider};

use crate::error::{ClientError, Result};
use crate::http::RestClient;

/// Tenant whose token is used to list tenants
pub const ADMIN_TENANT: &str = "admin";

#[derive(Debug, Deserialize)]
struct TenantList {
    tenants: Vec<String>,
}

/// Directory backed by the device manager and auth service REST APIs
pub struct HttpDeviceDirectory {
    devices: RestClient,
    auth: RestClient,
    tokens: Arc<dyn TokenProvider>,
}

impl HttpDeviceDirectory {
    pub fn new(device_manager_url: &str, auth_url: &str, tokens: Arc<dyn TokenProvider>) -> Result<Self> {
        Ok(Self {
            devices: RestClient::new(device_manager_url)?,
            auth: RestClient::new(auth_url)?,
            tokens,
        })
    }

    async fn token(&self, tenant: &str) -> GatewayResult<String> {
        self.tokens.get_token(tenant).await
    }

    async fn fetch_tenants(&self, token: &str) -> Result<Vec<String>> {
        let response = self.auth.get(&["admin", "tenants"])?.bearer_auth(token).send().await?;
        let list: TenantList = RestClient::check(response).await?.json().await?;
        Ok(list.tenants)
    }

    async fn fetch_device_ids(&self, token: &str) -> Result<Vec<String>> {
        let response = self
            .devices
            .get(&["device"])?
            .query(&[("idsOnly", "true")])
            .bearer_auth(token)
            .send()
            .await?;
        Ok(RestClient::check(response).await?.json().await?)
    }

    async fn fetch_device(&self, device_id: &str, token: &str) -> Result<Option<Value>> {
        let response = self.devices.get(&["device", device_id])?.bearer_auth(token).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let doc: Value = RestClient::check(response).await?.json().await?;
        if !doc.is_object() {
            return Err(ClientError::ParseError(format!("device {} is not an object", device_id)));
        }
        Ok(Some(doc))
    }
}

#[async_trait]
impl DeviceDirectory for HttpDeviceDirectory {
    #[instrument(skip(self))]
    async fn list_tenants(&self) -> GatewayResult<Vec<String>> {
        let token = self.token(ADMIN_TENANT).await?;
        let tenants = self
            .fetch_tenants(&token)
            .await
            .map_err(ClientError::into_directory)?;
        debug!(count = tenants.len(), "Listed tenants");
        Ok(tenants)
    }

    #[instrument(skip(self))]
    async fn list_devices(&self, tenant: &str) -> GatewayResult<Vec<String>> {
        let token = self.token(tenant).await?;
        self.fetch_device_ids(&token)
            .await
            .map_err(ClientError::into_directory)
    }

    #[instrument(skip(self))]
    async fn get_device(&self, device_id: &str, tenant: &str) -> GatewayResult<Option<Value>> {
        let token = self.token(tenant).await?;
        self.fetch_device(device_id, &token)
            .await
            .map_err(ClientError::into_directory)
    }
}
