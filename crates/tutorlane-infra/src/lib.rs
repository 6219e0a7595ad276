//! Infrastructure layer for tutorlane.
//!
//! Implements the collaborator traits defined in `tutorlane-core`: the
//! OpenAI-compatible and scripted LLM providers, the JSON lesson catalog
//! loader and the JSON-lines telemetry sink. Also owns configuration
//! loading and data-directory resolution.

pub mod config;
pub mod lesson;
pub mod llm;
pub mod telemetry_sink;
