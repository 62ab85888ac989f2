//! Tenant tokens for platform services
//!
//! Internal platform services only inspect the token payload, so the
//! gateway mints its own unsigned JWT-shaped token per tenant instead of
//! round-tripping through the auth service.

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use serde_json::json;

use lwgw_core::{GatewayResult, TokenProvider};

/// Default service user the gateway presents itself as
pub const DEFAULT_USERNAME: &str = "iotagent";

#[derive(Debug, Clone)]
pub struct LocalTokenProvider {
    username: String,
}

impl LocalTokenProvider {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
        }
    }

    /// `base64url(header).base64url(payload).` with an empty signature
    pub fn mint(&self, tenant: &str) -> String {
        let header = json!({"alg": "HS256", "typ": "JWT"});
        let payload = json!({"service": tenant, "username": self.username});
        format!(
            "{}.{}.",
            general_purpose::URL_SAFE_NO_PAD.encode(header.to_string()),
            general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string())
        )
    }
}

impl Default for LocalTokenProvider {
    fn default() -> Self {
        Self::new(DEFAULT_USERNAME)
    }
}

#[async_trait]
impl TokenProvider for LocalTokenProvider {
    async fn get_token(&self, tenant: &str) -> GatewayResult<String> {
        Ok(self.mint(tenant))
    }
}
