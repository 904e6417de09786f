//! Authentication and authorization extractors.
//!
//! - [`auth::AuthUser`] -- Extracts the authenticated user from a JWT Bearer token.
//! - [`rbac`] -- Role and sub-role gates built on top of `AuthUser`.

pub mod auth;
pub mod rbac;
