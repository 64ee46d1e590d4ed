//! Runtime around the heatmap engine: configuration, the observation feed,
//! the polling scheduler and the HTTP read surface.

pub mod config;
pub mod http;
pub mod scheduler;
pub mod source;
