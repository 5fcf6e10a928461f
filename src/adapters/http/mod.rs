pub mod header_transport;
pub mod reqwest_transport;
pub mod retry_transport;

pub use header_transport::HeaderTransport;
pub use reqwest_transport::ReqwestTransport;
pub use retry_transport::RetryTransport;

use crate::config::RetryConfig;
use reqwest::header::HeaderMap;

/// 標準的 transport 組合：retry → headers → reqwest
pub type ResilientTransport = RetryTransport<HeaderTransport<ReqwestTransport>>;

pub fn resilient_transport(headers: HeaderMap, retry: &RetryConfig) -> ResilientTransport {
    RetryTransport::from_config(HeaderTransport::new(ReqwestTransport::new(), headers), retry)
}
