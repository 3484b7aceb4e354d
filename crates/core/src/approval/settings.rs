//! Request-scoped approval settings.

use std::time::Duration;

use rungs_shared::ApprovalConfig;

/// Settings passed explicitly to every resolution and action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApprovalSettings {
    /// Approvals must be accepted before the next level counts them.
    pub acceptance_required: bool,
    /// Capacity of the is-approved cache.
    pub status_cache_capacity: u64,
    /// Time-to-live of is-approved cache entries.
    pub status_cache_ttl: Duration,
}

impl ApprovalSettings {
    /// Settings requiring or not requiring acceptance, with default cache
    /// sizing.
    #[must_use]
    pub fn with_acceptance_required(acceptance_required: bool) -> Self {
        Self {
            acceptance_required,
            ..Self::default()
        }
    }
}

impl Default for ApprovalSettings {
    fn default() -> Self {
        Self::from(&ApprovalConfig::default())
    }
}

impl From<&ApprovalConfig> for ApprovalSettings {
    fn from(config: &ApprovalConfig) -> Self {
        Self {
            acceptance_required: config.acceptance_required,
            status_cache_capacity: config.status_cache_capacity,
            status_cache_ttl: Duration::from_secs(config.status_cache_ttl_secs),
        }
    }
}
