use crate::domain::context::CallContext;
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::sync::Arc;
use url::Url;

/// 一份可讀的 body stream
pub type BodyStream = Box<dyn Read + Send + Sync>;

type BodyFactory = dyn Fn() -> std::io::Result<BodyStream> + Send + Sync;

/// 可重複讀取的 request body
///
/// 每次 `open` 都產生一個新的 stream，重試時不會讀到已消耗的內容。
#[derive(Clone)]
pub struct RequestBody {
    factory: Arc<BodyFactory>,
}

impl RequestBody {
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        let bytes: Arc<[u8]> = Arc::from(bytes.into());
        Self::from_fn(move || {
            let bytes = Arc::clone(&bytes);
            Ok(Box::new(std::io::Cursor::new(bytes)) as BodyStream)
        })
    }

    pub fn from_fn<F>(factory: F) -> Self
    where
        F: Fn() -> std::io::Result<BodyStream> + Send + Sync + 'static,
    {
        Self {
            factory: Arc::new(factory),
        }
    }

    pub fn open(&self) -> std::io::Result<BodyStream> {
        (self.factory)()
    }
}

impl std::fmt::Debug for RequestBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("RequestBody(..)")
    }
}

/// 送往 transport 的 HTTP request
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    body: Option<RequestBody>,
    stream: Option<BodyStream>,
    context: CallContext,
}

impl HttpRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
            stream: None,
            context: CallContext::background(),
        }
    }

    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = Some(body);
        self.stream = None;
        self
    }

    pub fn with_context(mut self, context: CallContext) -> Self {
        self.context = context;
        self
    }

    pub fn context(&self) -> &CallContext {
        &self.context
    }

    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }

    /// 複製 method / URL / headers / context，不含已開啟的 body stream
    pub fn clone_head(&self) -> Self {
        Self {
            method: self.method.clone(),
            url: self.url.clone(),
            headers: self.headers.clone(),
            body: self.body.clone(),
            stream: None,
            context: self.context.clone(),
        }
    }

    /// 從 body factory 重新取得一份可讀的 stream
    pub fn rewind_body(&mut self) -> std::io::Result<()> {
        if let Some(body) = &self.body {
            self.stream = Some(body.open()?);
        }
        Ok(())
    }

    /// 讀出整個 body；尚未 rewind 時會先開啟一次
    pub fn read_body(&mut self) -> std::io::Result<Option<Vec<u8>>> {
        if self.body.is_none() {
            return Ok(None);
        }
        let mut stream = match self.stream.take() {
            Some(stream) => stream,
            None => match &self.body {
                Some(body) => body.open()?,
                None => return Ok(None),
            },
        };
        let mut buf = Vec::new();
        stream.read_to_end(&mut buf)?;
        Ok(Some(buf))
    }
}

impl std::fmt::Debug for HttpRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpRequest")
            .field("method", &self.method)
            .field("url", &self.url.as_str())
            .field("headers", &self.headers)
            .field("has_body", &self.body.is_some())
            .finish()
    }
}

/// transport 回傳的 HTTP response（body 已完整讀取）
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Vec::new(),
        }
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// 容器 port，例如 `8080/tcp`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContainerPort(pub u16);

impl ContainerPort {
    pub fn number(&self) -> u16 {
        self.0
    }
}

impl std::fmt::Display for ContainerPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/tcp", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContainerId(pub String);

impl std::fmt::Display for ContainerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // docker 的慣例只顯示前 12 碼
        let short: String = self.0.chars().take(12).collect();
        f.write_str(&short)
    }
}

/// 啟動容器所需的最小描述
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSpec {
    pub image: String,
    pub exposed_ports: Vec<ContainerPort>,
}
