//! Attribute publication to the platform

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, instrument};

use lwgw_core::{AttributePublisher, GatewayResult};

use crate::error::{ClientError, Result};
use crate::http::RestClient;

/// Body posted for every attribute update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeUpdate {
    pub device_id: String,
    pub tenant: String,
    pub attrs: Map<String, Value>,
    #[serde(default)]
    pub metadata: Option<Value>,
}

pub struct HttpAttributePublisher {
    http: RestClient,
}

impl HttpAttributePublisher {
    pub fn new(url: &str) -> Result<Self> {
        Ok(Self {
            http: RestClient::new(url)?,
        })
    }

    async fn send(&self, update: &AttributeUpdate) -> Result<()> {
        let response = self.http.post(&["attributes"])?.json(update).send().await?;
        RestClient::check(response).await?;
        Ok(())
    }
}

#[async_trait]
impl AttributePublisher for HttpAttributePublisher {
    #[instrument(skip(self, attrs, metadata))]
    async fn publish(
        &self,
        device_id: &str,
        tenant: &str,
        attrs: Map<String, Value>,
        metadata: Option<Value>,
    ) -> GatewayResult<()> {
        let update = AttributeUpdate {
            device_id: device_id.to_string(),
            tenant: tenant.to_string(),
            attrs,
            metadata,
        };
        self.send(&update).await.map_err(ClientError::into_upstream)?;
        debug!(attrs = update.attrs.len(), "Attributes published");
        Ok(())
    }
}
