pub mod container;
pub mod graphql;
pub mod health;
pub mod logs;

pub use crate::domain::context::CallContext;
pub use crate::domain::ports::{ContainerRuntime, LogSink, Transport};
pub use crate::utils::error::Result;
