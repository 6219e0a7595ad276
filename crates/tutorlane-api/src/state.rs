//! Application state wiring the pipeline to its infrastructure.
//!
//! AppState is shared by the CLI commands and the REST handlers.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tutorlane_core::lesson::{InMemoryLessonCatalog, LessonCatalog};
use tutorlane_core::tutor::TurnPipeline;
use tutorlane_infra::config::{apply_env_overrides, load_config, resolve_data_dir};
use tutorlane_infra::lesson::load_lessons;
use tutorlane_infra::llm::{create_provider, resolve_api_key};
use tutorlane_infra::telemetry_sink::JsonlTelemetrySink;
use tutorlane_types::config::TutorConfig;
use tutorlane_types::llm::LlmError;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<TurnPipeline>,
    pub config: Arc<TutorConfig>,
    pub data_dir: PathBuf,
    pub config_path: PathBuf,
    pub telemetry_sink: Option<Arc<JsonlTelemetrySink>>,
}

impl AppState {
    /// Load configuration (file, then environment) and build the pipeline.
    pub async fn init(config_path: Option<PathBuf>) -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        let config_path = config_path.unwrap_or_else(|| data_dir.join("config.toml"));
        let config = load_config(&config_path).await;
        let config = apply_env_overrides(config, |key| std::env::var(key).ok());

        let (pipeline, telemetry_sink) = build_pipeline(&config).await?;
        Ok(Self {
            pipeline: Arc::new(pipeline),
            config: Arc::new(config),
            data_dir,
            config_path,
            telemetry_sink,
        })
    }

    /// State around an already-built pipeline.
    #[cfg(test)]
    pub fn from_parts(pipeline: TurnPipeline, config: TutorConfig) -> Self {
        let data_dir = resolve_data_dir();
        Self {
            pipeline: Arc::new(pipeline),
            config: Arc::new(config),
            config_path: data_dir.join("config.toml"),
            data_dir,
            telemetry_sink: None,
        }
    }

    /// Wait for queued telemetry lines to reach the sink file.
    pub async fn flush_telemetry(&self) {
        if let Some(sink) = &self.telemetry_sink {
            sink.flush().await;
        }
    }

    /// Periodically evict idle sessions and lanes.
    pub fn spawn_maintenance(&self) -> tokio::task::JoinHandle<()> {
        let pipeline = Arc::clone(&self.pipeline);
        let period = Duration::from_secs(self.config.session.purge_interval_secs.max(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let (sessions, lanes) = pipeline.purge_idle();
                if sessions > 0 || lanes > 0 {
                    tracing::debug!(sessions, lanes, "purged idle sessions");
                }
            }
        })
    }
}

async fn build_pipeline(
    config: &TutorConfig,
) -> anyhow::Result<(TurnPipeline, Option<Arc<JsonlTelemetrySink>>)> {
    let lessons: Arc<dyn LessonCatalog> = match config.lessons.path.as_deref() {
        Some(path) => Arc::new(load_lessons(Path::new(path)).await?),
        None => Arc::new(InMemoryLessonCatalog::new()),
    };

    let api_key = resolve_api_key(&config.provider);
    let provider = match create_provider(&config.provider, api_key.as_deref()) {
        Ok(provider) => provider,
        Err(LlmError::AuthenticationFailed) => {
            tracing::warn!(
                env = %config.provider.api_key_env,
                "no API key found, running in practice mode"
            );
            None
        }
        Err(err) => return Err(err.into()),
    };

    let mut pipeline = TurnPipeline::new(config, provider, lessons);
    let mut telemetry_sink = None;
    if let Some(path) = config.telemetry.sink_path.as_deref() {
        let sink = Arc::new(JsonlTelemetrySink::open(Path::new(path)).await?);
        pipeline = pipeline.with_telemetry_sink(sink.clone());
        telemetry_sink = Some(sink);
    }
    Ok((pipeline, telemetry_sink))
}
