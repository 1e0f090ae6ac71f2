pub mod config;
pub mod executor;
pub mod logging;
pub mod metrics;
pub mod runner;
