//! shellgate - a TOTP second factor for interactive SSH logins
//!
//! The gate sits between an accepted SSH connection and the operator's
//! shell: it challenges for a time-based one-time password (RFC 6238 on top
//! of RFC 4226) and only hands over the shell once a code within the drift
//! window is presented, inside a bounded time budget.

pub mod challenge;
pub mod config;
pub mod enroll;
pub mod error;
pub mod otp;
pub mod session;

pub use error::{GateError, Result};
