//! HTTP API for the dashboard.

#[cfg(feature = "ui")]
mod server;

#[cfg(feature = "ui")]
pub use server::*;
