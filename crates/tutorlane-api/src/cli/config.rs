//! `tutorlane config`: show the configuration the pipeline would run with.

use anyhow::Result;
use console::style;

use crate::state::AppState;

pub fn show(state: &AppState, json: bool) -> Result<()> {
    if json {
        let out = serde_json::json!({
            "config_path": state.config_path.display().to_string(),
            "data_dir": state.data_dir.display().to_string(),
            "provider": state.pipeline.provider_name(),
            "config": &*state.config,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} tutorlane v{}",
        style("⚙").bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!("  config:   {}", style(state.config_path.display()).cyan());
    println!("  data dir: {}", style(state.data_dir.display()).cyan());
    println!(
        "  provider: {}",
        style(state.pipeline.provider_name().unwrap_or("disabled")).cyan()
    );
    println!();
    println!("{}", toml::to_string_pretty(&*state.config)?);
    Ok(())
}
