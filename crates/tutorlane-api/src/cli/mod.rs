//! CLI command definitions for the `tutorlane` binary.

pub mod ask;
pub mod check;
pub mod config;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Voice-tutor turn pipeline: gate, queue, breaker, guard and fallback.
#[derive(Parser)]
#[command(name = "tutorlane", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to `$TUTORLANE_DATA_DIR/config.toml`).
    #[arg(long, global = true, env = "TUTORLANE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the REST API server.
    Serve {
        /// Port to listen on.
        #[arg(long, default_value = "3000")]
        port: u16,

        /// Host to bind to.
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Emit logs as JSON lines.
        #[arg(long)]
        log_json: bool,

        /// Export spans to stdout through OpenTelemetry.
        #[arg(long)]
        otel: bool,
    },

    /// Run a single turn through the pipeline and print the result.
    Ask {
        /// Student utterance.
        message: String,

        /// Session id (turns in one session share history).
        #[arg(long, default_value = "cli")]
        session: String,

        /// Lesson id from the lesson catalog.
        #[arg(long)]
        lesson: Option<String>,

        /// Speech duration in milliseconds.
        #[arg(long)]
        duration_ms: Option<u64>,

        /// Recognizer confidence in [0, 1].
        #[arg(long)]
        confidence: Option<f64>,
    },

    /// Check an answer against an expected value.
    Check {
        /// The student's answer.
        answer: String,

        /// The expected answer.
        expected: String,

        /// Question type: math, mcq, short or open.
        #[arg(long = "type", default_value = "short")]
        question_type: String,

        /// Multiple-choice options, in order (repeatable).
        #[arg(long = "option")]
        options: Vec<String>,
    },

    /// Print the effective configuration.
    Config,

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

/// Tracing filter for the chosen verbosity.
pub fn log_filter(quiet: bool, verbose: u8) -> &'static str {
    match verbose {
        0 if quiet => "error",
        0 => "warn",
        1 => "info,tutorlane=debug",
        _ => "trace",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn check_collects_repeated_options() {
        let cli = Cli::try_parse_from([
            "tutorlane", "check", "b", "blue", "--type", "mcq", "--option", "red", "--option", "blue",
        ])
        .unwrap();
        match cli.command {
            Commands::Check {
                question_type,
                options,
                ..
            } => {
                assert_eq!(question_type, "mcq");
                assert_eq!(options, vec!["red", "blue"]);
            }
            _ => panic!("expected check"),
        }
    }

    #[test]
    fn verbosity_maps_to_filter() {
        assert_eq!(log_filter(true, 0), "error");
        assert_eq!(log_filter(false, 0), "warn");
        assert_eq!(log_filter(false, 2), "trace");
    }
}
