pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::CliArgs;

pub use adapters::http::{HeaderTransport, ReqwestTransport, RetryTransport};
pub use config::{ContainerConfig, HarnessConfig, RetryConfig};
pub use core::container::{start, start_with, ServiceInstance, StartOption};
pub use core::graphql::GraphQlClient;
pub use domain::context::CallContext;
pub use domain::scalars::{Date, Decimal, Timestamp};
pub use utils::error::{HarnessError, Result, TransportError};
