pub mod config;
pub mod error;
pub mod service;
pub mod store;
pub mod telemetry;
pub mod trace;
