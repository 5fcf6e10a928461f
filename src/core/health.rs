use crate::domain::context::CallContext;
use crate::utils::error::{HarnessError, Result};
use reqwest::Client;
use std::time::Duration;
use tokio::time::Instant;
use url::Url;

const MAX_PROBE_TIMEOUT: Duration = Duration::from_secs(5);
const MIN_PROBE_TIMEOUT: Duration = Duration::from_millis(50);

/// 輪詢 health endpoint，直到回應 2xx 或逾時
#[derive(Debug, Clone)]
pub struct HealthCheck {
    client: Client,
    url: Url,
    timeout: Duration,
    interval: Duration,
}

impl HealthCheck {
    pub fn new(url: Url, timeout: Duration, interval: Duration) -> Self {
        Self {
            client: Client::new(),
            url,
            timeout,
            interval,
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub async fn wait(&self, ctx: &CallContext) -> Result<()> {
        let started = Instant::now();
        let deadline = started + self.timeout;
        let mut last_problem = "no probe completed".to_string();
        let mut probes = 0u32;

        loop {
            if let Some(interrupt) = ctx.err() {
                return Err(interrupt.into());
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            let probe_timeout = remaining.clamp(MIN_PROBE_TIMEOUT, MAX_PROBE_TIMEOUT);
            let probe = self.client.get(self.url.clone()).timeout(probe_timeout).send();
            probes += 1;

            let outcome = tokio::select! {
                biased;
                interrupt = ctx.done() => return Err(interrupt.into()),
                outcome = probe => outcome,
            };

            match outcome {
                Ok(response) if response.status().is_success() => {
                    tracing::info!(
                        "💚 {} healthy after {:?} ({} probes)",
                        self.url,
                        started.elapsed(),
                        probes
                    );
                    return Ok(());
                }
                Ok(response) => {
                    last_problem = format!("last probe returned {}", response.status());
                }
                Err(e) => {
                    last_problem = format!("last probe failed: {}", e);
                }
            }
            tracing::debug!("🩺 {} not healthy yet: {}", self.url, last_problem);

            let now = Instant::now();
            if now >= deadline {
                return Err(HarnessError::Startup {
                    timeout: self.timeout,
                    message: last_problem,
                });
            }

            let pause = self.interval.min(deadline - now);
            tokio::select! {
                biased;
                interrupt = ctx.done() => return Err(interrupt.into()),
                _ = tokio::time::sleep(pause) => {}
            }
        }
    }
}
