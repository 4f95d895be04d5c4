//! CLI entry point replaying a scroll scenario through the scheduler.

use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = reelgate::config::CliArgs::parse();
    let config = reelgate::config::AppConfig::load(cli.clone()).await?;

    let report =
        match reelgate::replay::run(&config.scheduler, &config.scenario, cli.degraded).await {
            Ok(report) => report,
            Err(error) => {
                tracing::error!(error = %error, "replay failed");
                return Err(Box::new(error) as Box<dyn std::error::Error>);
            }
        };

    tracing::info!(
        stops = report.steps.len(),
        admitted = report.telemetry.admitted,
        promoted = report.telemetry.promoted,
        evicted = report.telemetry.evicted,
        play_failed = report.telemetry.play_failed,
        peak_active = report.telemetry.peak_active,
        "replay finished"
    );
    Ok(())
}
