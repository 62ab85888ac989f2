//! Shared reqwest plumbing for the collaborators

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use url::Url;

use crate::error::{ClientError, Result};

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Default connection timeout
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Error body returned by platform services
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// A reqwest client bound to one service base URL
#[derive(Debug, Clone)]
pub struct RestClient {
    client: Client,
    base_url: Url,
}

impl RestClient {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_config(base_url, DEFAULT_TIMEOUT, DEFAULT_CONNECT_TIMEOUT)
    }

    pub fn with_config(base_url: &str, timeout: Duration, connect_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .build()?;
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidPathSegment(base_url.to_string()));
        }

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Append `segments` to the base path, percent-encoding each one.
    ///
    /// Dot and empty segments are rejected: `url` drops them instead of
    /// encoding them, which would address a different resource.
    pub fn url(&self, segments: &[&str]) -> Result<Url> {
        if let Some(bad) = segments.iter().find(|s| matches!(**s, "" | "." | "..")) {
            return Err(ClientError::InvalidPathSegment(bad.to_string()));
        }
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidPathSegment(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub fn get(&self, segments: &[&str]) -> Result<RequestBuilder> {
        Ok(self.client.get(self.url(segments)?))
    }

    pub fn post(&self, segments: &[&str]) -> Result<RequestBuilder> {
        Ok(self.client.post(self.url(segments)?))
    }

    pub fn delete(&self, segments: &[&str]) -> Result<RequestBuilder> {
        Ok(self.client.delete(self.url(segments)?))
    }

    /// Pass successful responses through, turn the rest into errors
    pub async fn check(response: Response) -> Result<Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(Self::extract_error(response).await)
        }
    }

    pub async fn extract_error(response: Response) -> ClientError {
        let status = response.status();
        let message = response
            .json::<ErrorResponse>()
            .await
            .ok()
            .and_then(|err| err.message.or(err.error))
            .unwrap_or_else(|| format!("HTTP {}", status));
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ClientError::InvalidToken(message),
            _ => ClientError::server_error(status.as_u16(), message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segments_keep_base_path() {
        let c = RestClient::new("http://dm:5000/api").unwrap();
        assert_eq!(c.url(&["device", "abc"]).unwrap().as_str(), "http://dm:5000/api/device/abc");

        let c = RestClient::new("http://dm:5000/api/").unwrap();
        assert_eq!(c.url(&["device"]).unwrap().as_str(), "http://dm:5000/api/device");

        let c = RestClient::new("http://dm:5000").unwrap();
        assert_eq!(c.url(&["admin", "tenants"]).unwrap().as_str(), "http://dm:5000/admin/tenants");
    }

    #[test]
    fn test_segments_are_percent_encoded() {
        let c = RestClient::new("http://engine:8080/api").unwrap();
        assert_eq!(
            c.url(&["clients", "a/b?c#d%e", "observe"]).unwrap().as_str(),
            "http://engine:8080/api/clients/a%2Fb%3Fc%23d%25e/observe"
        );
        assert_eq!(
            c.url(&["device", "..x"]).unwrap().as_str(),
            "http://engine:8080/api/device/..x"
        );
    }

    #[test]
    fn test_dot_segments_rejected() {
        let c = RestClient::new("http://engine:8080/api").unwrap();
        for id in [".", "..", ""] {
            assert!(
                matches!(c.url(&["clients", id, "observe"]), Err(ClientError::InvalidPathSegment(ref s)) if s == id),
                "id {:?}",
                id
            );
        }
    }
}
