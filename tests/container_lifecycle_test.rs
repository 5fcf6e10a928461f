use anyhow::Result;
use async_trait::async_trait;
use httpmock::prelude::*;
use reqwest::header::{HeaderMap, HeaderValue};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use twisp_harness::core::logs::MemoryLogSink;
use twisp_harness::domain::fixtures::ACCOUNT_HEADER;
use twisp_harness::domain::model::{ContainerId, ContainerPort, ContainerSpec};
use twisp_harness::domain::ports::ContainerRuntime;
use twisp_harness::utils::error::ErrorCategory;
use twisp_harness::{start_with, CallContext, HarnessConfig, HarnessError, StartOption};

/// 不啟動真的容器，把 8080 對應到 httpmock 的 port
struct FakeRuntime {
    port: u16,
    log_lines: Vec<&'static str>,
    fail_terminate: bool,
    runs: AtomicUsize,
    terminations: AtomicUsize,
    detached: AtomicUsize,
    last_spec: std::sync::Mutex<Option<ContainerSpec>>,
}

impl FakeRuntime {
    fn new(port: u16) -> Self {
        Self {
            port,
            log_lines: Vec::new(),
            fail_terminate: false,
            runs: AtomicUsize::new(0),
            terminations: AtomicUsize::new(0),
            detached: AtomicUsize::new(0),
            last_spec: std::sync::Mutex::new(None),
        }
    }

    fn terminations(&self) -> usize {
        self.terminations.load(Ordering::SeqCst)
    }

    fn detached(&self) -> usize {
        self.detached.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn run(&self, spec: &ContainerSpec) -> twisp_harness::Result<ContainerId> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        *self.last_spec.lock().unwrap() = Some(spec.clone());
        Ok(ContainerId("fake0123456789abcdef".to_string()))
    }

    async fn host(&self, _id: &ContainerId) -> twisp_harness::Result<String> {
        Ok("127.0.0.1".to_string())
    }

    async fn mapped_port(&self, _id: &ContainerId, _port: ContainerPort) -> twisp_harness::Result<u16> {
        Ok(self.port)
    }

    async fn follow_logs(
        &self,
        _id: &ContainerId,
    ) -> twisp_harness::Result<mpsc::UnboundedReceiver<Vec<u8>>> {
        let (tx, rx) = mpsc::unbounded_channel();
        for line in &self.log_lines {
            tx.send(format!("{}\n", line).into_bytes()).unwrap();
        }
        Ok(rx)
    }

    async fn terminate(&self, _id: &ContainerId) -> twisp_harness::Result<()> {
        self.terminations.fetch_add(1, Ordering::SeqCst);
        if self.fail_terminate {
            return Err(HarnessError::Container {
                message: "no such container".to_string(),
            });
        }
        Ok(())
    }

    fn terminate_detached(&self, _id: &ContainerId) {
        self.detached.fetch_add(1, Ordering::SeqCst);
    }
}

fn fast_config(startup_timeout_secs: u64) -> HarnessConfig {
    let mut config = HarnessConfig::default();
    config.container.startup_timeout_secs = startup_timeout_secs;
    config.container.poll_interval_ms = 20;
    config.retry.base_delay_ms = 10;
    config
}

#[tokio::test]
async fn test_start_waits_for_health_and_exposes_endpoint() -> Result<()> {
    let server = MockServer::start();
    let health = server.mock(|when, then| {
        when.method(GET).path("/healthcheck");
        then.status(200).body("ok");
    });

    let runtime = Arc::new(FakeRuntime::new(server.port()));
    let ctx = CallContext::background().with_timeout(Duration::from_secs(10));
    let instance = start_with(runtime.clone(), fast_config(5), &ctx, Vec::new()).await?;

    assert_eq!(
        instance.endpoint().as_str(),
        format!("http://127.0.0.1:{}/financial/v1/graphql", server.port())
    );
    assert!(health.hits() >= 1);

    let spec = runtime.last_spec.lock().unwrap().clone().unwrap();
    assert_eq!(spec.image, "public.ecr.aws/twisp/local:latest");
    assert_eq!(
        spec.exposed_ports,
        vec![ContainerPort(3000), ContainerPort(8080), ContainerPort(8081)]
    );

    instance.cleanup(&ctx).await;
    instance.cleanup(&ctx).await;
    assert_eq!(runtime.terminations(), 1);

    drop(instance);
    assert_eq!(runtime.detached(), 0);
    Ok(())
}

#[tokio::test]
async fn test_keep_alive_skips_teardown() -> Result<()> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/healthcheck");
        then.status(200);
    });

    let runtime = Arc::new(FakeRuntime::new(server.port()));
    let ctx = CallContext::background();
    let instance = start_with(
        runtime.clone(),
        fast_config(5),
        &ctx,
        vec![StartOption::KeepAlive(true)],
    )
    .await?;

    assert!(instance.keep_alive());
    instance.cleanup(&ctx).await;
    drop(instance);

    assert_eq!(runtime.terminations(), 0);
    assert_eq!(runtime.detached(), 0);
    Ok(())
}

#[tokio::test]
async fn test_drop_without_cleanup_removes_container() -> Result<()> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/healthcheck");
        then.status(200);
    });

    let runtime = Arc::new(FakeRuntime::new(server.port()));
    let instance = start_with(runtime.clone(), fast_config(5), &CallContext::background(), Vec::new()).await?;
    drop(instance);

    assert_eq!(runtime.terminations(), 0);
    assert_eq!(runtime.detached(), 1);
    Ok(())
}

#[tokio::test]
async fn test_container_logs_are_forwarded_with_tag() -> Result<()> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/healthcheck");
        then.status(200);
    });

    let mut runtime = FakeRuntime::new(server.port());
    runtime.log_lines = vec!["starting ledger", "listening on :8080"];
    let runtime = Arc::new(runtime);
    let sink = Arc::new(MemoryLogSink::new());

    let ctx = CallContext::background();
    let instance = start_with(
        runtime.clone(),
        fast_config(5),
        &ctx,
        vec![StartOption::LogForwarder(sink.clone())],
    )
    .await?;

    let waited = tokio::time::timeout(Duration::from_secs(2), async {
        while sink.lines().len() < 2 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(waited.is_ok(), "log lines never arrived: {:?}", sink.lines());
    assert_eq!(
        sink.lines(),
        vec!["[twisp] starting ledger", "[twisp] listening on :8080"]
    );

    instance.cleanup(&ctx).await;
    Ok(())
}

#[tokio::test]
async fn test_unhealthy_service_is_startup_error_and_torn_down() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/healthcheck");
        then.status(503).body("warming up");
    });

    let runtime = Arc::new(FakeRuntime::new(server.port()));
    let err = start_with(runtime.clone(), fast_config(1), &CallContext::background(), Vec::new())
        .await
        .unwrap_err();

    assert!(matches!(err, HarnessError::Startup { .. }), "{err}");
    assert_eq!(err.category(), ErrorCategory::Startup);
    assert!(err.to_string().contains("503"));
    assert_eq!(runtime.terminations(), 1);
}

#[tokio::test]
async fn test_deadline_interrupts_health_polling() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/healthcheck");
        then.status(503);
    });

    let runtime = Arc::new(FakeRuntime::new(server.port()));
    let ctx = CallContext::background().with_timeout(Duration::from_millis(200));

    let started = std::time::Instant::now();
    let err = start_with(runtime.clone(), fast_config(60), &ctx, Vec::new())
        .await
        .unwrap_err();

    assert!(matches!(err, HarnessError::DeadlineExceeded), "{err}");
    assert!(err.is_cancellation());
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(runtime.terminations(), 1);
}

#[tokio::test]
async fn test_teardown_failure_is_only_logged() -> Result<()> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/healthcheck");
        then.status(200);
    });

    let mut runtime = FakeRuntime::new(server.port());
    runtime.fail_terminate = true;
    let runtime = Arc::new(runtime);

    let ctx = CallContext::background();
    let instance = start_with(runtime.clone(), fast_config(5), &ctx, Vec::new()).await?;
    instance.cleanup(&ctx).await;

    assert_eq!(runtime.terminations(), 1);
    Ok(())
}

#[tokio::test]
async fn test_new_client_sends_headers_to_endpoint() -> Result<()> {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/healthcheck");
        then.status(200);
    });
    let graphql = server.mock(|when, then| {
        when.method(POST)
            .path("/financial/v1/graphql")
            .header(ACCOUNT_HEADER, "tenant-42")
            .header("content-type", "application/json");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(serde_json::json!({"data": {"journal": {"name": "GL"}}}));
    });

    let runtime = Arc::new(FakeRuntime::new(server.port()));
    let ctx = CallContext::background();
    let instance = start_with(runtime.clone(), fast_config(5), &ctx, Vec::new()).await?;

    let mut headers = HeaderMap::new();
    headers.insert(ACCOUNT_HEADER, HeaderValue::from_static("tenant-42"));
    let client = instance.new_client(headers);

    let data: serde_json::Value = client
        .execute(&ctx, "Journal", "query Journal { journal { name } }", &serde_json::json!({}))
        .await?;

    graphql.assert();
    assert_eq!(data["journal"]["name"], "GL");

    instance.cleanup(&ctx).await;
    Ok(())
}
