//! HTTP request handlers for the REST API.

pub mod answer;
pub mod gating;
pub mod metrics;
pub mod session;
pub mod telemetry;
pub mod turn;
