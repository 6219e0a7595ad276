//! Shared domain types for tutorlane.
//!
//! This crate contains the data shapes that flow through the turn pipeline:
//! inbound turns and outbound results, lesson context, LLM request/response
//! and error types, answer-check results, gate decisions, breaker status,
//! telemetry entries, and configuration.
//!
//! Zero infrastructure dependencies -- only serde, chrono, thiserror.

pub mod answer;
pub mod breaker;
pub mod config;
pub mod error;
pub mod gate;
pub mod lesson;
pub mod llm;
pub mod telemetry;
pub mod turn;
