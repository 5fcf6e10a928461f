use crate::domain::model::{ContainerId, ContainerPort, ContainerSpec, HttpRequest, HttpResponse};
use crate::utils::error::{Result, TransportError};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

/// 單一方法的 HTTP transport，可以層層包裝
///
/// HTTP status 不算錯誤；只有送出或接收失敗才回傳 `TransportError`。
#[async_trait]
pub trait Transport: Send + Sync {
    async fn round_trip(&self, request: HttpRequest)
        -> std::result::Result<HttpResponse, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn round_trip(
        &self,
        request: HttpRequest,
    ) -> std::result::Result<HttpResponse, TransportError> {
        (**self).round_trip(request).await
    }
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Box<T> {
    async fn round_trip(
        &self,
        request: HttpRequest,
    ) -> std::result::Result<HttpResponse, TransportError> {
        (**self).round_trip(request).await
    }
}

/// 容器執行環境（docker CLI 或測試用 fake）
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    async fn run(&self, spec: &ContainerSpec) -> Result<ContainerId>;

    /// 從測試程序連到容器時要用的 host
    async fn host(&self, id: &ContainerId) -> Result<String>;

    async fn mapped_port(&self, id: &ContainerId, port: ContainerPort) -> Result<u16>;

    /// 持續輸出容器 log，每個訊息是一段原始內容（通常以換行結尾）
    async fn follow_logs(&self, id: &ContainerId) -> Result<mpsc::UnboundedReceiver<Vec<u8>>>;

    async fn terminate(&self, id: &ContainerId) -> Result<()>;

    /// 無法 await 的場合（Drop）使用，送出終止指令後立即返回
    fn terminate_detached(&self, id: &ContainerId);
}

/// 容器 log 的接收端
pub trait LogSink: Send + Sync {
    fn accept(&self, line: &str);
}
