use thiserror::Error;

/// Errors from loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(String),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("invalid config value for {key}: {message}")]
    Invalid { key: String, message: String },
}

/// Errors from the lesson catalog.
#[derive(Debug, Error)]
pub enum LessonError {
    #[error("lesson not found: {0}")]
    NotFound(String),

    #[error("failed to read lessons: {0}")]
    Io(String),

    #[error("invalid lesson file {path}: {message}")]
    Parse { path: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let err = ConfigError::Invalid {
            key: "gating.min_confidence".to_string(),
            message: "must be between 0 and 1".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid config value for gating.min_confidence: must be between 0 and 1"
        );
    }

    #[test]
    fn lesson_error_display() {
        let err = LessonError::Parse {
            path: "lessons/a.json".to_string(),
            message: "missing title".to_string(),
        };
        assert!(err.to_string().contains("lessons/a.json"));
    }
}
