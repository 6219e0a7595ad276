//! Configuration loader for tutorlane.
//!
//! Reads `config.toml` from the data directory (`~/.tutorlane/` by default)
//! and deserializes it into [`TutorConfig`]. Missing or malformed files fall
//! back to defaults; environment knobs are applied on top.

use std::path::{Path, PathBuf};

use tutorlane_core::telemetry::MAX_TELEMETRY_ENTRIES;
use tutorlane_types::config::{ProviderMode, TutorConfig};
use tutorlane_types::error::ConfigError;
use tutorlane_types::gate::GatingProfile;

/// Environment variable that overrides the data directory.
pub const DATA_DIR_ENV: &str = "TUTORLANE_DATA_DIR";

/// Resolve the data directory: `TUTORLANE_DATA_DIR`, else `~/.tutorlane`.
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        if !dir.trim().is_empty() {
            return PathBuf::from(dir);
        }
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".tutorlane")
}

/// Read and parse a config file, reporting every failure.
pub async fn read_config(path: &Path) -> Result<TutorConfig, ConfigError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::Io(format!("{}: {e}", path.display())))?;
    let config: TutorConfig =
        toml::from_str(&content).map_err(|e| ConfigError::Parse(format!("{}: {e}", path.display())))?;
    validate_config(&config)?;
    Ok(config)
}

/// Load configuration from an explicit path.
///
/// - If the file does not exist, returns [`TutorConfig::default()`].
/// - If the file cannot be read, parsed or validated, logs a warning and
///   returns the default.
pub async fn load_config(path: &Path) -> TutorConfig {
    match read_config(path).await {
        Ok(config) => config,
        Err(ConfigError::Io(_)) if !path.exists() => {
            tracing::debug!("No config found at {}, using defaults", path.display());
            TutorConfig::default()
        }
        Err(err) => {
            tracing::warn!("{err}, using defaults");
            TutorConfig::default()
        }
    }
}

/// Load `{data_dir}/config.toml`.
pub async fn load_global_config(data_dir: &Path) -> TutorConfig {
    load_config(&data_dir.join("config.toml")).await
}

/// Reject values the pipeline cannot work with.
pub fn validate_config(config: &TutorConfig) -> Result<(), ConfigError> {
    let thresholds = config.gating.thresholds();
    if !(0.0..=1.0).contains(&thresholds.min_confidence) {
        return Err(ConfigError::Invalid {
            key: "gating.min_confidence".to_string(),
            message: "must be between 0 and 1".to_string(),
        });
    }
    if !(0.0..=1.0).contains(&config.breaker.error_rate_threshold) {
        return Err(ConfigError::Invalid {
            key: "breaker.error_rate_threshold".to_string(),
            message: "must be between 0 and 1".to_string(),
        });
    }
    if config.breaker.failure_threshold == 0 {
        return Err(ConfigError::Invalid {
            key: "breaker.failure_threshold".to_string(),
            message: "must be at least 1".to_string(),
        });
    }
    if config.retry.max_attempts == 0 {
        return Err(ConfigError::Invalid {
            key: "retry.max_attempts".to_string(),
            message: "must be at least 1".to_string(),
        });
    }
    if !(1..=MAX_TELEMETRY_ENTRIES).contains(&config.telemetry.capacity) {
        return Err(ConfigError::Invalid {
            key: "telemetry.capacity".to_string(),
            message: format!("must be between 1 and {MAX_TELEMETRY_ENTRIES}"),
        });
    }
    Ok(())
}

/// Apply `TUTORLANE_*` environment knobs on top of the file configuration.
///
/// `lookup` is `std::env::var` in production; tests inject a map. Values that
/// fail to parse are ignored with a warning.
pub fn apply_env_overrides<F>(mut config: TutorConfig, lookup: F) -> TutorConfig
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(profile) = parse_env::<GatingProfile, _>(&lookup, "TUTORLANE_GATING_PROFILE") {
        config.gating.profile = profile;
    }
    if let Some(ms) = parse_env::<u64, _>(&lookup, "TUTORLANE_MIN_SPEECH_DURATION_MS") {
        config.gating.min_duration_ms = Some(ms);
    }
    if let Some(confidence) = parse_env::<f64, _>(&lookup, "TUTORLANE_MIN_SPEECH_CONFIDENCE") {
        if (0.0..=1.0).contains(&confidence) {
            config.gating.min_confidence = Some(confidence);
        } else {
            tracing::warn!(confidence, "TUTORLANE_MIN_SPEECH_CONFIDENCE out of range, ignoring");
        }
    }
    if let Some(debug) = lookup("TUTORLANE_DEBUG") {
        match debug.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => config.telemetry.debug = true,
            "0" | "false" | "no" | "off" => config.telemetry.debug = false,
            other => tracing::warn!(value = other, "invalid TUTORLANE_DEBUG, ignoring"),
        }
    }
    if let Some(mode) = parse_env::<ProviderMode, _>(&lookup, "TUTORLANE_PROVIDER_MODE") {
        config.provider.mode = mode;
    }
    config
}

fn parse_env<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(key, value = %raw, "ignoring invalid environment override: {err}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[tokio::test]
    async fn load_global_config_missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_global_config(tmp.path()).await;
        assert_eq!(config.breaker.failure_threshold, 5);
        assert_eq!(config.gating.profile, GatingProfile::Conservative);
    }

    #[tokio::test]
    async fn load_global_config_valid_toml_returns_parsed() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(
            tmp.path().join("config.toml"),
            r#"
[gating]
profile = "responsive"

[cache]
capacity = 20

[provider]
mode = "disabled"
"#,
        )
        .await
        .unwrap();

        let config = load_global_config(tmp.path()).await;
        assert_eq!(config.gating.profile, GatingProfile::Responsive);
        assert_eq!(config.cache.capacity, 20);
        assert_eq!(config.provider.mode, ProviderMode::Disabled);
    }

    #[tokio::test]
    async fn load_global_config_invalid_toml_returns_default() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(tmp.path().join("config.toml"), "this is not { valid toml !!!")
            .await
            .unwrap();

        let config = load_global_config(tmp.path()).await;
        assert_eq!(config.cache.capacity, 500);
    }

    #[tokio::test]
    async fn read_config_rejects_out_of_range_values() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        tokio::fs::write(&path, "[gating]\nmin_confidence = 1.5\n")
            .await
            .unwrap();

        let err = read_config(&path).await.unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref key, .. } if key == "gating.min_confidence"));
        // The lenient loader falls back instead.
        assert!(load_config(&path).await.gating.min_confidence.is_none());
    }

    #[tokio::test]
    async fn read_config_rejects_oversized_telemetry_ring() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        tokio::fs::write(&path, "[telemetry]\ncapacity = 500\n")
            .await
            .unwrap();

        let err = read_config(&path).await.unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref key, .. } if key == "telemetry.capacity"));
    }

    #[test]
    fn env_overrides_apply_on_top_of_file() {
        let config = apply_env_overrides(
            TutorConfig::default(),
            env(&[
                ("TUTORLANE_MIN_SPEECH_DURATION_MS", "500"),
                ("TUTORLANE_MIN_SPEECH_CONFIDENCE", "0.7"),
                ("TUTORLANE_DEBUG", "true"),
                ("TUTORLANE_PROVIDER_MODE", "scripted"),
            ]),
        );
        let thresholds = config.gating.thresholds();
        assert_eq!(thresholds.min_duration_ms, 500);
        assert!((thresholds.min_confidence - 0.7).abs() < f64::EPSILON);
        assert!(config.telemetry.debug);
        assert_eq!(config.provider.mode, ProviderMode::Scripted);
    }

    #[test]
    fn invalid_env_values_are_ignored() {
        let config = apply_env_overrides(
            TutorConfig::default(),
            env(&[
                ("TUTORLANE_MIN_SPEECH_DURATION_MS", "soon"),
                ("TUTORLANE_MIN_SPEECH_CONFIDENCE", "3"),
                ("TUTORLANE_DEBUG", "maybe"),
                ("TUTORLANE_GATING_PROFILE", "chaotic"),
            ]),
        );
        assert!(config.gating.min_duration_ms.is_none());
        assert!(config.gating.min_confidence.is_none());
        assert!(!config.telemetry.debug);
        assert_eq!(config.gating.profile, GatingProfile::Conservative);
    }

    #[test]
    fn profile_override_switches_preset() {
        let config = apply_env_overrides(
            TutorConfig::default(),
            env(&[("TUTORLANE_GATING_PROFILE", "responsive")]),
        );
        assert_eq!(config.gating.thresholds(), GatingProfile::Responsive.thresholds());
    }
}
