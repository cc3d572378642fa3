use color_eyre::eyre::Result;
use tracing::error;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use pets_infra::{run, InfraConfig, Installer, RunPlan};

fn main() -> Result<()> {
    color_eyre::install()?;
    let directives = std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_default();
    let _ = tracing_subscriber::fmt()
        .with_env_filter(log_filter(&directives))
        .try_init();

    let config = InfraConfig::from_env()?;
    let plan = RunPlan::from(&config);
    let mut installer = Installer::new(config);

    if let Err(err) = run(&mut installer, &plan) {
        error!("Error running the set up, {err}");
        return Err(err.into());
    }
    Ok(())
}

/// Progress is logged at `info` unless `directives` say otherwise
fn log_filter(directives: &str) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .parse_lossy(directives)
}
