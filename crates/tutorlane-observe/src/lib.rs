//! Observability setup for tutorlane: tracing subscriber and optional
//! OpenTelemetry export.

pub mod tracing_setup;
