//! Well-known role and sub-role names, plus the predicates the API uses to
//! gate workflow actions.
//!
//! Role names must match the seed data in
//! `20261019000001_create_roles_table.sql`.

/// External Implementing Unit personnel. Submits field progress.
pub const ROLE_EIU: &str = "EIU";
/// Implementing Office. Owns projects and performs the first review.
pub const ROLE_LGU_IU: &str = "LGU-IU";
/// Planning and monitoring team. Secretariat and MPMEC are sub-roles.
pub const ROLE_LGU_PMT: &str = "LGU-PMT";
/// System administrator.
pub const ROLE_SYS_AD: &str = "SYS.AD";
/// Executive monitoring staff (read-mostly oversight).
pub const ROLE_EMS: &str = "EMS";

pub const ALL_ROLES: &[&str] = &[ROLE_EIU, ROLE_LGU_IU, ROLE_LGU_PMT, ROLE_SYS_AD, ROLE_EMS];

pub const SUB_ROLE_SECRETARIAT: &str = "Secretariat";
pub const SUB_ROLE_MPMEC: &str = "MPMEC";
pub const SUB_ROLE_MPMEC_SECRETARIAT: &str = "MPMEC Secretariat";

pub const LGU_PMT_SUB_ROLES: &[&str] = &[
    SUB_ROLE_SECRETARIAT,
    SUB_ROLE_MPMEC,
    SUB_ROLE_MPMEC_SECRETARIAT,
];

/// Whether the user may act as the Secretariat (final update reviewer).
pub fn is_secretariat(role: &str, sub_role: Option<&str>) -> bool {
    role == ROLE_LGU_PMT
        && matches!(
            sub_role,
            Some(SUB_ROLE_SECRETARIAT) | Some(SUB_ROLE_MPMEC_SECRETARIAT)
        )
}

/// Whether the user may give the MPMEC project approval.
pub fn is_mpmec(role: &str, sub_role: Option<&str>) -> bool {
    role == ROLE_LGU_PMT
        && matches!(sub_role, Some(SUB_ROLE_MPMEC) | Some(SUB_ROLE_MPMEC_SECRETARIAT))
}

/// Oversight roles see every project and may run portfolio-wide checks.
pub fn is_oversight(role: &str) -> bool {
    matches!(role, ROLE_LGU_PMT | ROLE_EMS | ROLE_SYS_AD)
}

/// Validate a role name and the sub-role paired with it.
///
/// Only `LGU-PMT` users carry a sub-role, and for them it is mandatory.
pub fn validate_role_assignment(role: &str, sub_role: Option<&str>) -> Result<(), String> {
    if !ALL_ROLES.contains(&role) {
        return Err(format!(
            "Invalid role '{role}'. Must be one of: {}",
            ALL_ROLES.join(", ")
        ));
    }
    match (role, sub_role) {
        (ROLE_LGU_PMT, Some(sub)) if LGU_PMT_SUB_ROLES.contains(&sub) => Ok(()),
        (ROLE_LGU_PMT, Some(sub)) => Err(format!(
            "Invalid sub-role '{sub}'. Must be one of: {}",
            LGU_PMT_SUB_ROLES.join(", ")
        )),
        (ROLE_LGU_PMT, None) => Err("LGU-PMT users require a sub-role".to_string()),
        (_, Some(_)) => Err(format!("Role '{role}' does not take a sub-role")),
        (_, None) => Ok(()),
    }
}
