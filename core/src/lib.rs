pub mod context;
pub mod error;
pub mod locks;
pub mod mode;
pub mod orchestrator;
pub mod pipeline;
pub mod ports;
pub mod routing;
pub mod store;
pub mod turns;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;
