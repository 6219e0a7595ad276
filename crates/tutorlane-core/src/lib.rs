//! Turn-processing pipeline for tutorlane.
//!
//! This crate turns a raw student utterance into a short, policy-compliant
//! spoken response. It defines the collaborator "ports" (`LlmProvider`,
//! `LessonCatalog`, `TelemetrySink`) that the infrastructure layer
//! implements, and depends only on `tutorlane-types` -- never on
//! `tutorlane-infra` or any network/filesystem crate.

pub mod answer;
pub mod cache;
pub mod fallback;
pub mod gate;
pub mod guard;
pub mod lesson;
pub mod llm;
pub mod session;
pub mod telemetry;
pub mod text;
pub mod tutor;
