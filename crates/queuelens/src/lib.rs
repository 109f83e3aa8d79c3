//! queuelens - hourly throughput and latency reporting for queue monitoring events.
//!
//! Wires the event source, snapshot cache and dashboard API from
//! `queuelens-runtime` into a single runnable service.

pub mod logging;
mod runtime;

pub use queuelens_core;
pub use queuelens_runtime;

pub use runtime::{QueueLens, QueueLensBuilder};
