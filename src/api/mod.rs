//! API layer
//!
//! HTTP handlers for:
//! - User profile API
//! - Metrics (Prometheus)

mod converters;
mod dto;
pub mod metrics;
mod user;

pub use dto::*;

pub use metrics::metrics_router;
pub use user::user_router;
