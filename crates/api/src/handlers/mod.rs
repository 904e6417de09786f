//! Request handlers, one submodule per resource.
//!
//! Handlers validate input, enforce row-level access through [`access`],
//! delegate persistence to the `buildwatch_db` repositories and map errors
//! via [`AppError`](crate::error::AppError).

pub mod access;
pub mod activity_logs;
pub mod auth;
pub mod communications;
pub mod field_activities;
pub mod milestones;
pub mod notifications;
pub mod policies;
pub mod profile;
pub mod project_updates;
pub mod projects;
pub mod rpmes;
pub mod templates;
pub mod users;
