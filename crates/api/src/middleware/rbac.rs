//! Role-based access control (RBAC) extractors.
//!
//! Each extractor wraps [`AuthUser`] and rejects requests whose role (and,
//! for LGU-PMT users, sub-role) does not qualify. Ownership checks such as
//! "the project's implementing office" happen in the handlers, after the
//! row is loaded.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use buildwatch_core::error::CoreError;
use buildwatch_core::roles::{ROLE_EIU, ROLE_LGU_IU, ROLE_SYS_AD};

use super::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

async fn require(
    parts: &mut Parts,
    state: &AppState,
    allowed: fn(&AuthUser) -> bool,
    message: &str,
) -> Result<AuthUser, AppError> {
    let user = AuthUser::from_request_parts(parts, state).await?;
    if !allowed(&user) {
        tracing::debug!(user_id = user.user_id, role = %user.role, "Role check failed");
        return Err(AppError::Core(CoreError::Forbidden(message.to_string())));
    }
    Ok(user)
}

/// Requires `SYS.AD`. Rejects with 403 Forbidden otherwise.
///
/// ```ignore
/// async fn admin_only(RequireSystemAdmin(user): RequireSystemAdmin) -> AppResult<Json<()>> {
///     Ok(Json(()))
/// }
/// ```
pub struct RequireSystemAdmin(pub AuthUser);

impl FromRequestParts<AppState> for RequireSystemAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        require(parts, state, |u| u.has_role(ROLE_SYS_AD), "System administrator role required")
            .await
            .map(RequireSystemAdmin)
    }
}

/// Requires `LGU-IU` (Implementing Office).
pub struct RequireImplementingOffice(pub AuthUser);

impl FromRequestParts<AppState> for RequireImplementingOffice {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        require(parts, state, |u| u.has_role(ROLE_LGU_IU), "Implementing Office role required")
            .await
            .map(RequireImplementingOffice)
    }
}

/// Requires `EIU`.
pub struct RequireEiu(pub AuthUser);

impl FromRequestParts<AppState> for RequireEiu {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        require(parts, state, |u| u.has_role(ROLE_EIU), "EIU role required")
            .await
            .map(RequireEiu)
    }
}

/// Requires `LGU-PMT` with the `Secretariat` or `MPMEC Secretariat` sub-role.
pub struct RequireSecretariat(pub AuthUser);

impl FromRequestParts<AppState> for RequireSecretariat {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        require(parts, state, AuthUser::is_secretariat, "Secretariat access required")
            .await
            .map(RequireSecretariat)
    }
}

/// Requires `LGU-PMT` with the `MPMEC` or `MPMEC Secretariat` sub-role.
pub struct RequireMpmec(pub AuthUser);

impl FromRequestParts<AppState> for RequireMpmec {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        require(parts, state, AuthUser::is_mpmec, "MPMEC access required")
            .await
            .map(RequireMpmec)
    }
}

/// Requires an oversight role: `LGU-PMT`, `EMS` or `SYS.AD`.
pub struct RequireOversight(pub AuthUser);

impl FromRequestParts<AppState> for RequireOversight {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        require(parts, state, AuthUser::is_oversight, "Oversight role required")
            .await
            .map(RequireOversight)
    }
}
