//! `sidekick doctor` — check backend connectivity.

use anyhow::Context;
use sidekick_backends::build_from_config;
use sidekick_config::AppConfig;

pub async fn run() -> anyhow::Result<()> {
    let config = AppConfig::load().context("Failed to load config")?;
    let router = build_from_config(&config);
    let backend = router.active().context("No backend configured")?;

    println!("Backend:  {} ({})", backend.name(), config.backend.base_url);

    match backend.list_models().await {
        Ok(models) if models.is_empty() => {
            println!("Status:   reachable, but no models are loaded");
        }
        Ok(models) => {
            println!("Status:   ok, {} model(s) available", models.len());
            for model in &models {
                let marker = if *model == config.default_model { " (default)" } else { "" };
                println!("  - {model}{marker}");
            }
            if !models.contains(&config.default_model) {
                println!(
                    "\nNote: configured model '{}' is not in the list above.",
                    config.default_model
                );
            }
        }
        Err(e) => {
            println!("Status:   UNREACHABLE — {e}");
            println!("\nIs your inference server running? (LM Studio, Ollama, ...)");
        }
    }

    Ok(())
}
