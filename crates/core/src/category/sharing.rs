//! Metadata sharing.

use std::collections::BTreeSet;

use rungs_shared::types::{UserGroupId, UserId};
use serde::{Deserialize, Serialize};

use crate::user::CurrentUser;

/// Who may read a piece of metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Sharing {
    /// Readable by everyone.
    pub public_read: bool,
    /// Owning user.
    pub owner: Option<UserId>,
    /// Users granted read access.
    pub users: BTreeSet<UserId>,
    /// Groups granted read access.
    pub user_groups: BTreeSet<UserGroupId>,
}

impl Sharing {
    /// Publicly readable sharing.
    #[must_use]
    pub fn public() -> Self {
        Self {
            public_read: true,
            ..Self::default()
        }
    }

    /// Private sharing owned by `owner`.
    #[must_use]
    pub fn owned_by(owner: UserId) -> Self {
        Self {
            owner: Some(owner),
            ..Self::default()
        }
    }

    /// Grants read access to a group.
    #[must_use]
    pub fn with_group(mut self, group: UserGroupId) -> Self {
        self.user_groups.insert(group);
        self
    }

    /// Grants read access to a user.
    #[must_use]
    pub fn with_user(mut self, user: UserId) -> Self {
        self.users.insert(user);
        self
    }

    /// True if `user` may read the object. Superusers always may.
    #[must_use]
    pub fn can_read(&self, user: &CurrentUser) -> bool {
        user.superuser
            || self.public_read
            || self.owner == Some(user.id)
            || self.users.contains(&user.id)
            || !self.user_groups.is_disjoint(&user.user_groups)
    }
}
