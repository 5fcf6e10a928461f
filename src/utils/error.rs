use std::time::Duration;
use thiserror::Error;

/// 連線操作階段（對應建立連線、讀取、寫入）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetOp {
    Dial,
    Read,
    Write,
}

impl std::fmt::Display for NetOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NetOp::Dial => write!(f, "dial"),
            NetOp::Read => write!(f, "read"),
            NetOp::Write => write!(f, "write"),
        }
    }
}

/// Transport 層錯誤
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("network {op} failed: {source}")]
    Network {
        op: NetOp,
        #[source]
        source: std::io::Error,
    },

    #[error("request cancelled")]
    Cancelled,

    #[error("request deadline exceeded")]
    DeadlineExceeded,

    #[error("internal transport error: {message}")]
    Internal { message: String },
}

impl TransportError {
    /// 是否為可重試的暫時性連線錯誤
    ///
    /// 只有 connection refused / reset 以及建立連線（dial）階段的錯誤算暫時性，
    /// TLS、非 dial 的逾時、協定錯誤與取消都直接回傳。
    pub fn is_transient(&self) -> bool {
        match self {
            TransportError::Network { op, source } => {
                *op == NetOp::Dial || is_refused_or_reset(source)
            }
            TransportError::Http(err) if err.is_connect() => connect_failure_is_transient(err),
            TransportError::Http(err) => source_chain_has_refused_or_reset(err),
            _ => false,
        }
    }

    pub fn is_cancellation(&self) -> bool {
        matches!(
            self,
            TransportError::Cancelled | TransportError::DeadlineExceeded
        )
    }
}

fn is_refused_or_reset(err: &std::io::Error) -> bool {
    matches!(
        err.kind(),
        std::io::ErrorKind::ConnectionRefused | std::io::ErrorKind::ConnectionReset
    )
}

fn source_chain_io_errors<'a>(
    err: &'a (dyn std::error::Error + 'static),
) -> impl Iterator<Item = &'a std::io::Error> {
    std::iter::successors(err.source(), |cause| (*cause).source())
        .filter_map(|cause| cause.downcast_ref::<std::io::Error>())
}

fn source_chain_has_refused_or_reset(err: &(dyn std::error::Error + 'static)) -> bool {
    source_chain_io_errors(err).any(is_refused_or_reset)
}

/// 建立連線階段的失敗：TCP 連線失敗（含 connect timeout）可重試，TLS 握手失敗不行
///
/// rustls 的握手錯誤會包成 `InvalidData` 的 io::Error。
fn connect_failure_is_transient(err: &(dyn std::error::Error + 'static)) -> bool {
    if source_chain_has_refused_or_reset(err) {
        return true;
    }
    !source_chain_io_errors(err).any(|io_err| io_err.kind() == std::io::ErrorKind::InvalidData)
}

#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("invalid {scalar} {text:?}: {reason}")]
    Format {
        scalar: &'static str,
        text: String,
        reason: String,
    },

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("service did not become healthy within {timeout:?}: {message}")]
    Startup { timeout: Duration, message: String },

    #[error("container runtime error: {message}")]
    Container { message: String },

    #[error("operation cancelled")]
    Cancelled,

    #[error("deadline exceeded")]
    DeadlineExceeded,

    #[error("GraphQL endpoint returned status {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("GraphQL errors: {}", messages.join("; "))]
    GraphQl { messages: Vec<String> },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid configuration value for {field} ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

/// 錯誤分類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Format,
    TransientNetwork,
    NonTransient,
    Startup,
    Cancellation,
    Configuration,
    Remote,
    System,
}

impl HarnessError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            HarnessError::Format { .. } => ErrorCategory::Format,
            HarnessError::Transport(err) if err.is_cancellation() => ErrorCategory::Cancellation,
            HarnessError::Transport(err) if err.is_transient() => ErrorCategory::TransientNetwork,
            HarnessError::Transport(_) => ErrorCategory::NonTransient,
            HarnessError::Startup { .. } => ErrorCategory::Startup,
            HarnessError::Cancelled | HarnessError::DeadlineExceeded => {
                ErrorCategory::Cancellation
            }
            HarnessError::HttpStatus { .. } | HarnessError::GraphQl { .. } => {
                ErrorCategory::Remote
            }
            HarnessError::ConfigError { .. }
            | HarnessError::MissingConfigError { .. }
            | HarnessError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            HarnessError::Container { .. }
            | HarnessError::IoError(_)
            | HarnessError::SerializationError(_) => ErrorCategory::System,
        }
    }

    pub fn is_cancellation(&self) -> bool {
        self.category() == ErrorCategory::Cancellation
    }

    pub(crate) fn format(scalar: &'static str, text: impl Into<String>, reason: impl ToString) -> Self {
        HarnessError::Format {
            scalar,
            text: text.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, HarnessError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_dial_is_transient() {
        let err = TransportError::Network {
            op: NetOp::Dial,
            source: std::io::Error::new(std::io::ErrorKind::TimedOut, "dial timeout"),
        };
        assert!(err.is_transient());
    }

    #[test]
    fn test_refused_and_reset_are_transient_in_any_phase() {
        for kind in [
            std::io::ErrorKind::ConnectionRefused,
            std::io::ErrorKind::ConnectionReset,
        ] {
            let err = TransportError::Network {
                op: NetOp::Read,
                source: std::io::Error::from(kind),
            };
            assert!(err.is_transient(), "{kind:?} should be transient");
        }
    }

    #[test]
    fn test_read_timeout_is_not_transient() {
        let err = TransportError::Network {
            op: NetOp::Read,
            source: std::io::Error::new(std::io::ErrorKind::TimedOut, "read timeout"),
        };
        assert!(!err.is_transient());
        assert!(!TransportError::Cancelled.is_transient());
        assert!(!TransportError::Internal {
            message: "boom".to_string()
        }
        .is_transient());
    }

    /// 模擬 reqwest / hyper 的錯誤包裝層
    #[derive(Debug)]
    struct Wrapped(std::io::Error);

    impl std::fmt::Display for Wrapped {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "client error (Connect)")
        }
    }

    impl std::error::Error for Wrapped {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            Some(&self.0)
        }
    }

    #[derive(Debug)]
    struct Outer(Wrapped);

    impl std::fmt::Display for Outer {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "error sending request")
        }
    }

    impl std::error::Error for Outer {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            Some(&self.0)
        }
    }

    fn connect_chain(kind: std::io::ErrorKind) -> Outer {
        Outer(Wrapped(std::io::Error::new(kind, "connect")))
    }

    #[test]
    fn test_tcp_connect_failures_are_transient() {
        for kind in [
            std::io::ErrorKind::ConnectionRefused,
            std::io::ErrorKind::ConnectionReset,
            std::io::ErrorKind::TimedOut,
            std::io::ErrorKind::Other,
        ] {
            assert!(connect_failure_is_transient(&connect_chain(kind)), "{kind:?}");
        }
    }

    #[test]
    fn test_tls_handshake_failure_is_not_transient() {
        let err = connect_chain(std::io::ErrorKind::InvalidData);
        assert!(!connect_failure_is_transient(&err));
        assert!(!source_chain_has_refused_or_reset(&err));
    }

    #[test]
    fn test_category_mapping() {
        let transient = HarnessError::from(TransportError::Network {
            op: NetOp::Dial,
            source: std::io::Error::from(std::io::ErrorKind::ConnectionRefused),
        });
        assert_eq!(transient.category(), ErrorCategory::TransientNetwork);

        let cancelled = HarnessError::from(TransportError::DeadlineExceeded);
        assert_eq!(cancelled.category(), ErrorCategory::Cancellation);
        assert!(cancelled.is_cancellation());

        let format = HarnessError::format("Date", "2026/01/01", "bad layout");
        assert_eq!(format.category(), ErrorCategory::Format);
        assert!(format.to_string().contains("2026/01/01"));
    }
}
