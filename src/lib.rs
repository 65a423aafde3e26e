pub mod config;
pub mod fallback;
pub mod framing;
pub mod logging;
pub mod metrics;
pub mod sampler;
pub mod snapshot;
