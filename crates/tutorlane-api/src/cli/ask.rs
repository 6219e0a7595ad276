//! One-shot turn from the command line.

use anyhow::Result;
use console::style;

use tutorlane_types::turn::TurnRequest;

use crate::state::AppState;

pub struct AskArgs {
    pub message: String,
    pub session: String,
    pub lesson: Option<String>,
    pub duration_ms: Option<u64>,
    pub confidence: Option<f64>,
}

pub async fn ask(state: &AppState, args: AskArgs, json: bool, quiet: bool) -> Result<()> {
    let request = TurnRequest {
        session_id: args.session,
        lesson_id: args.lesson,
        message: args.message,
        speech_duration: args.duration_ms,
        speech_confidence: args.confidence,
        energy_level: None,
    };
    let result = state.pipeline.process_turn(request).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!();
    println!("  {} {}", style("🎓").bold(), style(&result.content).cyan());
    if let Some(banner) = &result.banner {
        println!("  {}", style(banner).yellow());
    }
    if !quiet {
        let source = if result.used_cache {
            "cache"
        } else if result.used_fallback {
            "fallback"
        } else {
            state.pipeline.provider_name().unwrap_or("provider")
        };
        println!(
            "  {}",
            style(format!(
                "source: {source}  retries: {}  tokens: {}",
                result.retry_count, result.tokens_used
            ))
            .dim()
        );
    }
    println!();
    Ok(())
}
