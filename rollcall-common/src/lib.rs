//! Shared types for the Rollcall school operations portal services.

pub mod api;
pub mod config;
pub mod error;

pub use error::{Error, Result};
