//! Common types used across the application.

pub mod id;
pub mod uid;

pub use id::*;
pub use uid::{Uid, UidError};
