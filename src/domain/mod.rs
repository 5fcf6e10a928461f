// Domain layer: scalars, request model, cancellation context and ports.

pub mod context;
pub mod fixtures;
pub mod model;
pub mod ports;
pub mod scalars;
