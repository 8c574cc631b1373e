//! HTTP API for rollcall-ar

pub mod attendance;
pub mod health;

pub use attendance::attendance_routes;
pub use health::health_routes;
