//! Domain logic for the Build Watch project-monitoring backend.
//!
//! Everything in this crate is pure: no database, no HTTP, no filesystem.
//! The `db` and `api` crates build on these types and rules.

#[macro_use]
mod text_enum;

pub mod activity;
pub mod communication;
pub mod dashboard;
pub mod delay;
pub mod error;
pub mod field_activity;
pub mod hashing;
pub mod milestone;
pub mod notification;
pub mod policy;
pub mod progress;
pub mod project;
pub mod roles;
pub mod rpmes;
pub mod template;
pub mod types;
pub mod upload;
pub mod user;
pub mod validation;
pub mod workflow;
