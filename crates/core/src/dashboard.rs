//! Which projects a user's dashboard summarises.

use crate::roles::{is_mpmec, is_secretariat, ROLE_EIU, ROLE_LGU_IU};
use crate::types::DbId;
use crate::workflow::UpdateStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardScope {
    /// Projects owned by an implementing office.
    Office(DbId),
    /// Projects an EIU partner is assigned to.
    Partner(DbId),
    /// Projects the Secretariat has approved, for MPMEC members.
    SecretariatApproved,
    All,
}

impl DashboardScope {
    pub fn for_user(user_id: DbId, role: &str, sub_role: Option<&str>) -> Self {
        match role {
            ROLE_LGU_IU => DashboardScope::Office(user_id),
            ROLE_EIU => DashboardScope::Partner(user_id),
            _ if is_secretariat(role, sub_role) => DashboardScope::All,
            _ if is_mpmec(role, sub_role) => DashboardScope::SecretariatApproved,
            _ => DashboardScope::All,
        }
    }

    /// Office filter for repository queries.
    pub fn office_id(self) -> Option<DbId> {
        match self {
            DashboardScope::Office(id) => Some(id),
            _ => None,
        }
    }

    pub fn partner_id(self) -> Option<DbId> {
        match self {
            DashboardScope::Partner(id) => Some(id),
            _ => None,
        }
    }

    pub fn approved_only(self) -> bool {
        self == DashboardScope::SecretariatApproved
    }
}

/// The update status waiting on this user's review, if they review at all.
pub fn review_queue(role: &str, sub_role: Option<&str>) -> Option<UpdateStatus> {
    if role == ROLE_LGU_IU {
        Some(UpdateStatus::Submitted)
    } else if is_secretariat(role, sub_role) {
        Some(UpdateStatus::IuApproved)
    } else {
        None
    }
}
