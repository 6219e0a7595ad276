//! The tutor turn: prompt assembly, model-output handling and the
//! end-to-end pipeline.

pub mod pipeline;
pub mod prompt;
pub mod utterance;

pub use pipeline::{PipelineMetrics, PipelineSettings, TurnError, TurnPipeline};
pub use prompt::{PendingVerdict, TutorPromptBuilder};
