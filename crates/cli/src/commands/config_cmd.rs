//! `sidekick config` — show the effective configuration.

use anyhow::Context;
use sidekick_config::AppConfig;
use sidekick_policy::level_description;

pub fn run() -> anyhow::Result<()> {
    let config = AppConfig::load().context("Failed to load config")?;

    println!("Config file: {}", AppConfig::config_dir().join("config.toml").display());
    println!();
    println!("Model:        {}", config.default_model);
    println!("Backend:      {}", config.backend.base_url);
    println!(
        "Autonomy:     level {} — {}",
        config.autonomy.level,
        level_description(config.autonomy.level)
    );
    println!(
        "Context:      {} tokens (output budget {})",
        config.context.max_context_tokens,
        config.context.max_output_tokens()
    );
    println!(
        "Retrieval:    {} (top_k {})",
        if config.retrieval.enabled { "enabled" } else { "disabled" },
        config.retrieval.top_k
    );
    println!(
        "Turn:         {} iterations max, {}s model timeout, {}s approval timeout",
        config.turn.max_tool_iterations,
        config.turn.model_timeout_secs,
        config.approval.timeout_secs
    );
    println!();
    println!("Auto-approve:      {}", config.autonomy.auto_approve_tools.join(", "));
    println!("Require approval:  {}", config.autonomy.require_approval_tools.join(", "));
    println!("Dangerous:         {} pattern(s)", config.autonomy.dangerous_patterns.len());

    Ok(())
}
