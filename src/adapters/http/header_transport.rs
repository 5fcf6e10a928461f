use crate::domain::model::{HttpRequest, HttpResponse};
use crate::domain::ports::Transport;
use crate::utils::error::TransportError;
use async_trait::async_trait;
use reqwest::header::HeaderMap;

/// 每個請求都附加固定的 headers
///
/// 採 append：不覆蓋原有的 header，同一個 key 的多個值依序加入。
#[derive(Debug, Clone)]
pub struct HeaderTransport<T> {
    inner: T,
    headers: HeaderMap,
}

impl<T: Transport> HeaderTransport<T> {
    pub fn new(inner: T, headers: HeaderMap) -> Self {
        Self { inner, headers }
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}

#[async_trait]
impl<T: Transport> Transport for HeaderTransport<T> {
    async fn round_trip(
        &self,
        mut request: HttpRequest,
    ) -> std::result::Result<HttpResponse, TransportError> {
        for (name, value) in self.headers.iter() {
            request.headers.append(name.clone(), value.clone());
        }
        self.inner.round_trip(request).await
    }
}
