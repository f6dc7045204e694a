use serde::{Deserialize, Serialize};

use stockroom_core::{DivisionId, UserId};

use crate::{Permission, Role};

/// The user on whose behalf a ledger or workflow operation runs.
///
/// Threaded explicitly through every call; nothing looks up a "current user".
/// `division_id = None` means the actor belongs to the main warehouse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: UserId,
    pub division_id: Option<DivisionId>,
    pub roles: Vec<Role>,
    pub permissions: Vec<Permission>,
}

impl Actor {
    pub fn new(user_id: UserId, division_id: Option<DivisionId>) -> Self {
        Self {
            user_id,
            division_id,
            roles: Vec::new(),
            permissions: Vec::new(),
        }
    }

    pub fn with_roles(mut self, roles: impl IntoIterator<Item = Role>) -> Self {
        self.roles.extend(roles);
        self
    }

    pub fn with_permissions(mut self, permissions: impl IntoIterator<Item = Permission>) -> Self {
        self.permissions.extend(permissions);
        self
    }

    pub fn belongs_to(&self, division_id: DivisionId) -> bool {
        self.division_id == Some(division_id)
    }
}
