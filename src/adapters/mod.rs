// Adapters layer: concrete implementations of the domain ports (HTTP transports, container runtime).

pub mod docker;
pub mod http;
