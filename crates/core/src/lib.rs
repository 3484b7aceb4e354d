//! Core business logic for Rungs.
//!
//! This crate contains pure decision logic with ZERO web or database dependencies.
//! Approval facts are read and written through the [`approval::DataApprovalStore`]
//! trait, implemented by the db crate.
//!
//! # Modules
//!
//! - `hierarchy` - Organisation unit tree and path-encoded ancestry
//! - `period` - Period types and the registry of workflow periods
//! - `category` - Attribute categories and candidate enumeration
//! - `user` - The acting user and their authorities
//! - `approval` - Level planning, state resolution, permissions and actions
//! - `snapshot` - JSON metadata snapshots

pub mod approval;
pub mod category;
pub mod hierarchy;
pub mod period;
pub mod snapshot;
pub mod user;
