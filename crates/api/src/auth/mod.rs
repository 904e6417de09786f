//! Authentication primitives.
//!
//! - [`password`] -- Argon2id password hashing, verification and temporary
//!   password generation.
//! - [`jwt`] -- JWT access tokens carrying role and sub-role, plus refresh
//!   token helpers.

pub mod jwt;
pub mod password;
