use crate::domain::ports::LogSink;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// 預設的 sink：轉成 tracing 事件
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogSink;

impl LogSink for TracingLogSink {
    fn accept(&self, line: &str) {
        tracing::info!(target: "twisp_container", "{}", line);
    }
}

/// 保留在記憶體中的 sink，測試時檢查容器輸出用
#[derive(Debug, Default)]
pub struct MemoryLogSink {
    lines: Mutex<Vec<String>>,
}

impl MemoryLogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }
}

impl LogSink for MemoryLogSink {
    fn accept(&self, line: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(line.to_string());
        }
    }
}

/// 把容器 log 轉送到 sink，每行去掉結尾換行並加上來源標籤
pub struct LogForwarder {
    tag: String,
    sink: Arc<dyn LogSink>,
}

impl LogForwarder {
    pub fn new(tag: impl Into<String>, sink: Arc<dyn LogSink>) -> Self {
        Self {
            tag: tag.into(),
            sink,
        }
    }

    pub fn forward(&self, content: &[u8]) {
        let text = String::from_utf8_lossy(content);
        let line = text.trim_end_matches(['\n', '\r']);
        self.sink.accept(&format!("[{}] {}", self.tag, line));
    }

    /// 在背景持續轉送，直到來源關閉
    pub fn spawn(self, mut source: mpsc::UnboundedReceiver<Vec<u8>>) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(content) = source.recv().await {
                self.forward(&content);
            }
        })
    }
}
