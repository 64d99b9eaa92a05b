//! Internal layer exports for the session core and its configuration.

pub mod config;
pub mod session;
