pub mod cache;
pub mod orchestrator;
pub mod pipeline;
pub mod rate_limiter;
pub mod timeseries;
