//! Periodic housekeeping tasks spawned by the binary. Each runs until its
//! cancellation token fires.

pub mod session_cleanup;
