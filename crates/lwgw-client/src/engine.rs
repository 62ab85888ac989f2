//! Bridge to the protocol engine's REST facade
//!
//! Operations are posted per client endpoint; values travel in the tagged
//! `{type, value}` form understood by `lwgw-conv`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};

use lwgw_core::{GatewayResult, ProtocolEngine, ResourcePath, SessionHandle, TaggedValue, WireValue};

use crate::error::{ClientError, Result};
use crate::http::RestClient;

/// Body of every resource operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceRequest {
    pub registration_id: String,
    pub path: ResourcePath,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub argument: Option<String>,
}

impl ResourceRequest {
    fn new(session: &SessionHandle, path: &ResourcePath) -> Self {
        Self {
            registration_id: session.registration_id.clone(),
            path: path.clone(),
            value: None,
            argument: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelResponse {
    pub cancelled: usize,
}

pub struct HttpProtocolEngine {
    http: RestClient,
}

impl HttpProtocolEngine {
    pub fn new(url: &str) -> Result<Self> {
        Ok(Self {
            http: RestClient::new(url)?,
        })
    }

    async fn post(&self, session: &SessionHandle, op: &str, body: &ResourceRequest) -> Result<reqwest::Response> {
        let response = self
            .http
            .post(&["clients", session.endpoint.as_str(), op])?
            .json(body)
            .send()
            .await?;
        RestClient::check(response).await
    }

    async fn read(&self, session: &SessionHandle, path: &ResourcePath) -> Result<TaggedValue> {
        let response = self.post(session, "read", &ResourceRequest::new(session, path)).await?;
        Ok(response.json().await?)
    }

    async fn cancel_all(&self, session: &SessionHandle) -> Result<usize> {
        let response = self
            .http
            .delete(&["clients", session.endpoint.as_str(), "observations"])?
            .query(&[("registration_id", session.registration_id.as_str())])
            .send()
            .await?;
        let body: CancelResponse = RestClient::check(response).await?.json().await?;
        Ok(body.cancelled)
    }
}

#[async_trait]
impl ProtocolEngine for HttpProtocolEngine {
    #[instrument(skip(self, session), fields(endpoint = %session.endpoint))]
    async fn read_resource(&self, session: &SessionHandle, path: &ResourcePath) -> GatewayResult<WireValue> {
        let tagged = self
            .read(session, path)
            .await
            .map_err(ClientError::into_southbound)?;
        Ok(WireValue::from_tagged(&tagged)?)
    }

    #[instrument(skip(self, session, value), fields(endpoint = %session.endpoint))]
    async fn write_resource(&self, session: &SessionHandle, path: &ResourcePath, value: &Value) -> GatewayResult<()> {
        let mut body = ResourceRequest::new(session, path);
        body.value = Some(value.clone());
        self.post(session, "write", &body)
            .await
            .map_err(ClientError::into_southbound)?;
        Ok(())
    }

    #[instrument(skip(self, session), fields(endpoint = %session.endpoint))]
    async fn execute_resource(
        &self,
        session: &SessionHandle,
        path: &ResourcePath,
        argument: Option<&str>,
    ) -> GatewayResult<()> {
        let mut body = ResourceRequest::new(session, path);
        body.argument = argument.map(str::to_string);
        self.post(session, "execute", &body)
            .await
            .map_err(ClientError::into_southbound)?;
        Ok(())
    }

    #[instrument(skip(self, session), fields(endpoint = %session.endpoint))]
    async fn observe_resource(&self, session: &SessionHandle, path: &ResourcePath) -> GatewayResult<()> {
        self.post(session, "observe", &ResourceRequest::new(session, path))
            .await
            .map_err(ClientError::into_southbound)?;
        Ok(())
    }

    #[instrument(skip(self, session), fields(endpoint = %session.endpoint))]
    async fn cancel_all_observations(&self, session: &SessionHandle) -> GatewayResult<usize> {
        let cancelled = self
            .cancel_all(session)
            .await
            .map_err(ClientError::into_southbound)?;
        debug!(cancelled, "Observations cancelled");
        Ok(cancelled)
    }
}
