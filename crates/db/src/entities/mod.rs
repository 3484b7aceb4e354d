//! `SeaORM` entities.

pub mod data_approvals;
