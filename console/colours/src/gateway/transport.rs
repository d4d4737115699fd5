use super::{GatewayError, GraphQlRequest};
use crate::models::SessionToken;
use crate::storage::{DurableStore, Key};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// A response as received off the wire, before any GraphQL decoding.
#[derive(Debug)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: &GraphQlRequest) -> Result<RawResponse, GatewayError>;
}

/// Posts GraphQL requests to the backend over HTTP.
pub struct HttpTransport {
    http: reqwest::Client,
    url: String,
    storage: Arc<dyn DurableStore>,
}

impl HttpTransport {
    pub fn new(http: reqwest::Client, url: impl Into<String>, storage: Arc<dyn DurableStore>) -> Self {
        Self {
            http,
            url: url.into(),
            storage,
        }
    }

    /// The token is looked up on every request rather than kept around, so a
    /// sign in or sign out elsewhere applies to the very next call.
    fn access_token(&self) -> Option<String> {
        let raw = self.storage.get(Key::Token)?;
        SessionToken::from_stored(&raw).map(|token| token.access_token)
    }

    /// The backend expects the bare access token, without an auth scheme.
    fn request(&self, request: &GraphQlRequest) -> reqwest::RequestBuilder {
        let builder = self.http.post(self.url.as_str()).json(request);
        match self.access_token() {
            Some(token) => builder.header(reqwest::header::AUTHORIZATION, token),
            None => builder,
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: &GraphQlRequest) -> Result<RawResponse, GatewayError> {
        let response = self.request(request).send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();
        debug!(
            "{} responded with {} ({} bytes)",
            request.operation_name,
            status,
            body.len()
        );
        Ok(RawResponse { status, body })
    }
}
