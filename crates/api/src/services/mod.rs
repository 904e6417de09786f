//! Request-independent business services shared by the handlers.

pub mod activity;
pub mod delay;
pub mod email;
pub mod export;
pub mod notifications;
pub mod progress;
pub mod review;
pub mod uploads;
