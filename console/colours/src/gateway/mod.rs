pub mod documents;
#[cfg(test)]
pub(crate) mod mock;
mod transport;

pub use self::documents::Operation;
pub use self::transport::{HttpTransport, RawResponse, Transport};

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("{}", .0)]
    Http(#[from] reqwest::Error),
    #[error("The server responded with {}", .0)]
    Status(u16),
    #[error("{}", .0)]
    GraphQl(String),
    #[error("Malformed response: {}", .0)]
    Json(#[from] simd_json::Error),
    #[error("Malformed request: {}", .0)]
    Encode(#[from] serde_json::Error),
    #[error("The response to {} contained no data", .0)]
    MissingData(&'static str),
    #[error("{}", .0)]
    Transport(String),
}

/// The body of a GraphQL request.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQlRequest {
    pub operation_name: &'static str,
    pub query: &'static str,
    pub variables: serde_json::Value,
}

#[derive(Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlErrorMessage>,
}

#[derive(Deserialize)]
struct GraphQlErrorMessage {
    message: String,
}

/// The single client every store talks to the backend through.
///
/// Requests are sent exactly once; there is no retrying and no caching at
/// this layer.
#[derive(Clone)]
pub struct Gateway(Arc<dyn Transport>);

impl Gateway {
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self(Arc::new(transport))
    }

    pub async fn query<V, T>(&self, operation: &Operation, variables: V) -> Result<T, GatewayError>
    where
        V: Serialize,
        T: DeserializeOwned,
    {
        debug!("GraphQL query {}", operation.name);
        self.execute(operation, variables).await
    }

    pub async fn mutate<V, T>(&self, operation: &Operation, variables: V) -> Result<T, GatewayError>
    where
        V: Serialize,
        T: DeserializeOwned,
    {
        debug!("GraphQL mutation {}", operation.name);
        self.execute(operation, variables).await
    }

    async fn execute<V, T>(&self, operation: &Operation, variables: V) -> Result<T, GatewayError>
    where
        V: Serialize,
        T: DeserializeOwned,
    {
        let request = GraphQlRequest {
            operation_name: operation.name,
            query: operation.document,
            variables: serde_json::to_value(variables)?,
        };
        let response = self.0.execute(&request).await?;
        Self::decode(operation, response)
    }

    fn decode<T: DeserializeOwned>(
        operation: &Operation,
        mut response: RawResponse,
    ) -> Result<T, GatewayError> {
        let parsed: GraphQlResponse<T> = match simd_json::serde::from_slice(&mut response.body) {
            Ok(parsed) => parsed,
            // Error statuses frequently come with a GraphQL body explaining them.
            // Only fall back to the bare status when there is none.
            Err(_) if !response.is_success() => return Err(GatewayError::Status(response.status)),
            Err(err) => return Err(err.into()),
        };

        if !parsed.errors.is_empty() {
            let messages: Vec<_> = parsed.errors.into_iter().map(|e| e.message).collect();
            return Err(GatewayError::GraphQl(messages.join("; ")));
        }

        parsed.data.ok_or(GatewayError::MissingData(operation.name))
    }
}
