use crate::domain::context::CallContext;
use crate::domain::model::{HttpRequest, RequestBody};
use crate::domain::ports::Transport;
use crate::utils::error::{HarnessError, Result};
use reqwest::header::{HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use url::Url;

#[derive(Serialize)]
struct GraphQlRequest<'a, V: ?Sized> {
    query: &'a str,
    #[serde(rename = "operationName")]
    operation_name: &'a str,
    variables: &'a V,
}

#[derive(Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphQlError {
    pub message: String,
    #[serde(default)]
    pub path: Option<Vec<serde_json::Value>>,
}

impl GraphQlError {
    fn describe(&self) -> String {
        let segments = match &self.path {
            Some(path) if !path.is_empty() => path,
            _ => return self.message.clone(),
        };
        let path: Vec<String> = segments
            .iter()
            .map(|p| match p {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect();
        format!("{} (at {})", self.message, path.join("."))
    }
}

/// 透過 transport 鏈送出 GraphQL operation
#[derive(Clone)]
pub struct GraphQlClient {
    endpoint: Url,
    transport: Arc<dyn Transport>,
}

impl GraphQlClient {
    pub fn new<T: Transport + 'static>(endpoint: Url, transport: T) -> Self {
        Self {
            endpoint,
            transport: Arc::new(transport),
        }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub async fn execute<V, T>(
        &self,
        ctx: &CallContext,
        operation_name: &str,
        query: &str,
        variables: &V,
    ) -> Result<T>
    where
        V: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let payload = serde_json::to_vec(&GraphQlRequest {
            query,
            operation_name,
            variables,
        })?;

        let mut request = HttpRequest::new(Method::POST, self.endpoint.clone())
            .with_body(RequestBody::from_bytes(payload))
            .with_context(ctx.clone());
        request
            .headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        request
            .headers
            .insert(ACCEPT, HeaderValue::from_static("application/json"));

        tracing::debug!("📡 GraphQL {} -> {}", operation_name, self.endpoint);
        let response = self.transport.round_trip(request).await?;

        if !response.status.is_success() {
            return Err(HarnessError::HttpStatus {
                status: response.status.as_u16(),
                body: response.text(),
            });
        }

        let parsed: GraphQlResponse<T> = serde_json::from_slice(&response.body)?;
        if !parsed.errors.is_empty() {
            return Err(HarnessError::GraphQl {
                messages: parsed.errors.iter().map(GraphQlError::describe).collect(),
            });
        }

        parsed.data.ok_or_else(|| HarnessError::GraphQl {
            messages: vec![format!("{} returned no data", operation_name)],
        })
    }
}

impl std::fmt::Debug for GraphQlClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphQlClient")
            .field("endpoint", &self.endpoint.as_str())
            .finish()
    }
}
