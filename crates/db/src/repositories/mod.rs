//! Repository implementations for database access.

pub mod data_approval;

pub use data_approval::DataApprovalRepository;
