use crate::config::RetryConfig;
use crate::domain::model::{HttpRequest, HttpResponse};
use crate::domain::ports::Transport;
use crate::utils::error::TransportError;
use async_trait::async_trait;
use std::time::Duration;

/// 遇到暫時性連線錯誤（refused / reset / dial）時以指數退避重試
///
/// 只看 transport 層錯誤，不檢查 HTTP status。退避時間為 `d, 2d, 4d, ...`，
/// 沒有上限也沒有 jitter；等待期間若 context 取消或逾時則立即返回。
#[derive(Debug, Clone)]
pub struct RetryTransport<T> {
    inner: T,
    max_retries: u32,
    base_delay: Duration,
}

impl<T: Transport> RetryTransport<T> {
    pub fn new(inner: T, max_retries: u32, base_delay: Duration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
        }
    }

    pub fn from_config(inner: T, config: &RetryConfig) -> Self {
        Self::new(inner, config.max_retries, config.base_delay())
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    /// 第 `attempt` 次失敗後的等待時間
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }
}

#[async_trait]
impl<T: Transport> Transport for RetryTransport<T> {
    async fn round_trip(
        &self,
        request: HttpRequest,
    ) -> std::result::Result<HttpResponse, TransportError> {
        // 0 次等同 1 次
        let attempts = self.max_retries.max(1);
        let mut last_error = None;

        for attempt in 0..attempts {
            let mut cloned = request.clone_head();
            if request.has_body() {
                cloned.rewind_body().map_err(|e| TransportError::Internal {
                    message: format!("re-acquiring request body: {}", e),
                })?;
            }

            match self.inner.round_trip(cloned).await {
                Ok(response) => return Ok(response),
                Err(err) if !err.is_transient() => return Err(err),
                Err(err) => {
                    tracing::warn!(
                        "🔄 Transient error on attempt {}/{} for {}: {}",
                        attempt + 1,
                        attempts,
                        request.url,
                        err
                    );
                    last_error = Some(err);
                }
            }

            if attempt + 1 < attempts {
                let delay = self.backoff(attempt);
                tracing::debug!("⏳ Backing off {:?} before retry", delay);
                tokio::select! {
                    biased;
                    interrupt = request.context().done() => return Err(interrupt.into()),
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }

        Err(last_error.unwrap_or_else(|| TransportError::Internal {
            message: "retry budget exhausted without an attempt".to_string(),
        }))
    }
}
