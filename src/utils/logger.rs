use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// 容器轉送的 log 使用 `twisp_container` target
const DEFAULT_DIRECTIVES: &str = "twisp_harness=info,twisp_container=info";
const VERBOSE_DIRECTIVES: &str = "twisp_harness=debug,twisp_container=info,info";
const TEST_DIRECTIVES: &str = "twisp_harness=debug,twisp_container=info";

fn directives(verbose: bool) -> &'static str {
    if verbose {
        VERBOSE_DIRECTIVES
    } else {
        DEFAULT_DIRECTIVES
    }
}

/// `RUST_LOG` 優先，否則使用預設 directives
fn env_filter(fallback: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
}

/// `twisp-local` 的終端輸出
pub fn init_cli_logger(verbose: bool) {
    tracing_subscriber::registry()
        .with(env_filter(directives(verbose)))
        .with(fmt::layer().with_target(false).compact())
        .init();
}

/// 測試用 logger：輸出到 test writer，重複呼叫不會 panic
pub fn init_test_logger() {
    let _ = tracing_subscriber::registry()
        .with(env_filter(TEST_DIRECTIVES))
        .with(fmt::layer().with_test_writer().with_target(false).compact())
        .try_init();
}

/// CI 環境使用 JSON 格式，方便收集
pub fn init_json_logger() {
    tracing_subscriber::registry()
        .with(env_filter(DEFAULT_DIRECTIVES))
        .with(fmt::layer().json().with_current_span(false))
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_container_logs_pass_default_filters() {
        for verbose in [false, true] {
            assert!(directives(verbose).contains("twisp_container=info"));
        }
        assert!(directives(true).contains("twisp_harness=debug"));
        assert!(directives(false).contains("twisp_harness=info"));
    }

    #[test]
    fn test_init_test_logger_is_idempotent() {
        init_test_logger();
        init_test_logger();
        tracing::debug!("logger ready");
    }
}
