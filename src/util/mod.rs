//! Shared utilities: the completion event and telemetry bootstrap.

pub mod event;
pub mod telemetry;

pub use event::ManualResetEvent;
pub use telemetry::init_tracing;
