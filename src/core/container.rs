use crate::adapters::docker::DockerCli;
use crate::adapters::http::resilient_transport;
use crate::config::{HarnessConfig, RetryConfig};
use crate::core::graphql::GraphQlClient;
use crate::core::health::HealthCheck;
use crate::core::logs::{LogForwarder, TracingLogSink};
use crate::domain::context::CallContext;
use crate::domain::model::ContainerId;
use crate::domain::ports::{ContainerRuntime, LogSink};
use crate::utils::error::{HarnessError, Result};
use crate::utils::validation::Validate;
use reqwest::header::HeaderMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use url::Url;

/// `start` 的選項
#[derive(Clone)]
pub enum StartOption {
    /// 把容器 log 轉送到指定的 sink
    LogForwarder(Arc<dyn LogSink>),
    /// cleanup 時保留容器
    KeepAlive(bool),
}

impl StartOption {
    pub fn log_to_tracing() -> Self {
        StartOption::LogForwarder(Arc::new(TracingLogSink))
    }
}

impl std::fmt::Debug for StartOption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StartOption::LogForwarder(_) => f.write_str("LogForwarder(..)"),
            StartOption::KeepAlive(flag) => write!(f, "KeepAlive({})", flag),
        }
    }
}

/// 以預設設定（可由環境變數覆寫）透過 docker 啟動 Twisp
pub async fn start(
    ctx: &CallContext,
    options: impl IntoIterator<Item = StartOption>,
) -> Result<ServiceInstance> {
    let config = HarnessConfig::default().with_env_overrides()?;
    start_with(Arc::new(DockerCli::new()), config, ctx, options).await
}

/// 啟動容器並等待 health check 通過
///
/// 健康檢查失敗或被取消時會先移除容器再回傳錯誤。
pub async fn start_with(
    runtime: Arc<dyn ContainerRuntime>,
    config: HarnessConfig,
    ctx: &CallContext,
    options: impl IntoIterator<Item = StartOption>,
) -> Result<ServiceInstance> {
    config.validate()?;

    let mut keep_alive = config.container.keep_alive;
    let mut sink: Option<Arc<dyn LogSink>> = None;
    for option in options {
        match option {
            StartOption::LogForwarder(target) => sink = Some(target),
            StartOption::KeepAlive(flag) => keep_alive = flag,
        }
    }

    let spec = config.container.container_spec();
    tracing::info!("🚀 Starting container {}", spec.image);
    let id = until_done(ctx, runtime.run(&spec)).await?;
    tracing::info!("📦 Container {} created", id);

    let log_task = match &sink {
        Some(sink) => match runtime.follow_logs(&id).await {
            Ok(source) => Some(
                LogForwarder::new(config.container.log_tag.clone(), Arc::clone(sink))
                    .spawn(source),
            ),
            Err(e) => {
                tracing::warn!("⚠️ Log forwarding unavailable for {}: {}", id, e);
                None
            }
        },
        None => None,
    };

    match bring_up(runtime.as_ref(), &id, &config, ctx).await {
        Ok(endpoint) => {
            tracing::info!("✅ Twisp ready at {}", endpoint);
            Ok(ServiceInstance {
                runtime,
                id,
                endpoint,
                keep_alive,
                retry: config.retry,
                terminated: AtomicBool::new(false),
                log_task: Mutex::new(log_task),
            })
        }
        Err(e) => {
            tracing::error!("❌ Container {} failed to start: {}", id, e);
            if let Err(cleanup_err) = runtime.terminate(&id).await {
                tracing::warn!("⚠️ terminate container {}: {}", id, cleanup_err);
            }
            if let Some(task) = log_task {
                task.abort();
            }
            Err(e)
        }
    }
}

async fn bring_up(
    runtime: &dyn ContainerRuntime,
    id: &ContainerId,
    config: &HarnessConfig,
    ctx: &CallContext,
) -> Result<Url> {
    let container = &config.container;
    let host = until_done(ctx, runtime.host(id)).await?;
    let port = until_done(ctx, runtime.mapped_port(id, container.health_port())).await?;

    let health_url = service_url(&host, port, &container.health_path)?;
    HealthCheck::new(health_url, container.startup_timeout(), container.poll_interval())
        .wait(ctx)
        .await?;

    service_url(&host, port, &container.api_path)
}

/// `http://<host>:<port><path>`，IPv6 host 會加上中括號
pub fn service_url(host: &str, port: u16, path: &str) -> Result<Url> {
    let host = if host.contains(':') && !host.starts_with('[') {
        format!("[{}]", host)
    } else {
        host.to_string()
    };
    let raw = format!("http://{}:{}{}", host, port, path);
    Url::parse(&raw).map_err(|e| HarnessError::Container {
        message: format!("invalid service URL {}: {}", raw, e),
    })
}

async fn until_done<T, F>(ctx: &CallContext, operation: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        interrupt = ctx.done() => Err(interrupt.into()),
        result = operation => result,
    }
}

/// 一個正在執行的 Twisp 容器
///
/// 應呼叫一次 `cleanup`；若忘記呼叫（例如測試 panic），drop 時會在背景移除容器。
pub struct ServiceInstance {
    runtime: Arc<dyn ContainerRuntime>,
    id: ContainerId,
    endpoint: Url,
    keep_alive: bool,
    retry: RetryConfig,
    terminated: AtomicBool,
    log_task: Mutex<Option<JoinHandle<()>>>,
}

impl ServiceInstance {
    pub fn id(&self) -> &ContainerId {
        &self.id
    }

    /// GraphQL endpoint
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn keep_alive(&self) -> bool {
        self.keep_alive
    }

    /// 建立使用 retry → headers → reqwest 鏈的 client
    pub fn new_client(&self, headers: HeaderMap) -> GraphQlClient {
        GraphQlClient::new(self.endpoint.clone(), resilient_transport(headers, &self.retry))
    }

    /// 終止容器；失敗只記錄，不回傳錯誤
    pub async fn cleanup(&self, ctx: &CallContext) {
        if self.keep_alive {
            tracing::info!("📌 Keeping container {} alive at {}", self.id, self.endpoint);
            return;
        }
        if self.terminated.swap(true, Ordering::SeqCst) {
            return;
        }

        self.stop_log_forwarding();
        match until_done(ctx, self.runtime.terminate(&self.id)).await {
            Ok(()) => {}
            Err(e) if e.is_cancellation() => {
                tracing::warn!("⚠️ Cleanup of {} interrupted ({}), removing in background", self.id, e);
                self.runtime.terminate_detached(&self.id);
            }
            Err(e) => tracing::warn!("⚠️ terminate container {}: {}", self.id, e),
        }
    }

    fn stop_log_forwarding(&self) {
        if let Ok(mut task) = self.log_task.lock() {
            if let Some(task) = task.take() {
                task.abort();
            }
        }
    }
}

impl Drop for ServiceInstance {
    fn drop(&mut self) {
        self.stop_log_forwarding();
        if self.keep_alive || self.terminated.swap(true, Ordering::SeqCst) {
            return;
        }
        tracing::warn!("⚠️ Container {} dropped without cleanup, removing in background", self.id);
        self.runtime.terminate_detached(&self.id);
    }
}

impl std::fmt::Debug for ServiceInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceInstance")
            .field("id", &self.id)
            .field("endpoint", &self.endpoint.as_str())
            .field("keep_alive", &self.keep_alive)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_url_shapes() {
        assert_eq!(
            service_url("localhost", 49153, "/financial/v1/graphql").unwrap().as_str(),
            "http://localhost:49153/financial/v1/graphql"
        );
        assert_eq!(
            service_url("::1", 8080, "/healthcheck").unwrap().as_str(),
            "http://[::1]:8080/healthcheck"
        );
    }
}
