//! Astra: opportunities posted by organizations, applications and interview queues
//! for individuals, and model-assisted readiness checks.

pub mod api;
pub mod applications;
pub mod assistant;
pub mod config;
pub mod error;
pub mod identity;
pub mod ids;
pub mod inference;
pub mod opportunities;
pub mod platform;
pub mod readiness;
pub mod store;
pub mod telemetry;
pub mod validation;

pub use platform::Astra;
