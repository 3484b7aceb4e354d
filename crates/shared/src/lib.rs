//! Shared types, errors, and configuration for Rungs.
//!
//! This crate provides common types used across all other crates:
//! - Typed IDs for type-safe entity references
//! - Eleven-character UIDs used in organisation unit paths
//! - Application-wide error types
//! - Configuration management

pub mod config;
pub mod error;
pub mod types;

pub use config::{AppConfig, ApprovalConfig, DatabaseConfig, LoggingConfig};
pub use error::{AppError, AppResult, ErrorBody};
