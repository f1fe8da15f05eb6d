mod args;
mod demo;

use anyhow::Context;
use args::{Args, Command};
use bindery::logging::{init_logging, LoggingConfig};
use bindery::{App, AppConfig, Application, BootstrapAgent, ContainerExt, ProviderList};
use clap::Parser;
use std::sync::Arc;

fn load_config(args: &Args) -> anyhow::Result<AppConfig> {
    let mut config = match &args.config {
        Some(path) => AppConfig::load_from_path(path.clone())?,
        None => AppConfig::load()?,
    };
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
        config.validate()?;
    }
    Ok(config)
}

fn run(config: AppConfig, json: bool) -> anyhow::Result<()> {
    let app = Arc::new(Application::with_config(config));
    let agents: Vec<Arc<dyn BootstrapAgent>> = vec![Arc::new(ProviderList::new(demo::providers()))];

    bindery::measure_performance!("launch", {
        App::launch(Arc::clone(&app), &agents).context("failed to launch application")?;
    });

    for _ in 0..3 {
        let reporter = App::make::<demo::Reporter>(vec![])?;
        tracing::info!(line = %reporter.report("frame"), "Frame");
    }
    let tagged = App::tagged("reporters")?;
    tracing::debug!(count = tagged.len(), "Resolved tagged services");

    let stats = app.container().stats();
    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!("application:      {}", app.id());
        println!("providers:        {}", app.providers());
        println!("resolutions:      {}", stats.total_resolutions);
        println!("cache hits:       {} ({:.0}%)", stats.cache_hits, stats.hit_rate() * 100.0);
        println!("builds:           {}", stats.builds);
        println!("bindings:         {}", stats.bindings);
        println!("instances:        {}", stats.instances);
    }

    App::terminate()?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;

    init_logging(LoggingConfig::from_section(&config.logging)?)
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))?;

    match args.command {
        Command::Run { json } => run(config, json)?,
        Command::Config => print!("{}", config.to_toml()?),
    }

    Ok(())
}
