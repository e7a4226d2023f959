//! Donor and organ matching with failover outreach.
//!
//! The [`workflows`] module holds each capability with its HTTP router; the API
//! service composes them into one application.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;

pub use config::AppConfig;
pub use error::AppError;
