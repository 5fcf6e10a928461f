use crate::domain::model::{HttpRequest, HttpResponse};
use crate::domain::ports::Transport;
use crate::utils::error::TransportError;
use async_trait::async_trait;
use reqwest::Client;

/// 最底層的 transport，實際透過 reqwest 送出請求
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn round_trip(
        &self,
        mut request: HttpRequest,
    ) -> std::result::Result<HttpResponse, TransportError> {
        let ctx = request.context().clone();
        if let Some(interrupt) = ctx.err() {
            return Err(interrupt.into());
        }

        let body = request.read_body().map_err(|e| TransportError::Internal {
            message: format!("reading request body: {}", e),
        })?;

        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone());
        if let Some(body) = body {
            builder = builder.body(body);
        }

        tracing::debug!("➡️ {} {}", request.method, request.url);

        let exchange = async {
            let response = builder.send().await?;
            let status = response.status();
            let headers = response.headers().clone();
            let body = response.bytes().await?;
            Ok::<_, reqwest::Error>(HttpResponse {
                status,
                headers,
                body: body.to_vec(),
            })
        };

        tokio::select! {
            biased;
            interrupt = ctx.done() => Err(interrupt.into()),
            result = exchange => {
                let response = result?;
                tracing::debug!("⬅️ {} {} -> {}", request.method, request.url, response.status);
                Ok(response)
            }
        }
    }
}
