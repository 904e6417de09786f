//! Row structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - A create DTO for inserts
//! - An update DTO (all `Option` fields) for patches
//!
//! Enum-valued TEXT columns decode straight into the `buildwatch_core`
//! enums via `#[sqlx(try_from = "String")]`.

pub mod activity_log;
pub mod communication;
pub mod field_activity;
pub mod milestone;
pub mod notification;
pub mod policy;
pub mod project;
pub mod project_update;
pub mod role;
pub mod rpmes_form;
pub mod session;
pub mod template;
pub mod user;
