pub mod audit;
pub mod config;
pub mod credit;
pub mod error;
pub mod telemetry;
