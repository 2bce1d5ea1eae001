use clap::Parser;
use rss_translator::config::{write_default, Config};
use rss_translator::{Cli, Command};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match Cli::parse().command {
        Command::Init { config, force } => {
            write_default(&config, force)?;
            tracing::info!("Wrote default config to {}", config.display());
        }
        Command::Run { config } => {
            let config = Config::load(&config)?;
            rss_translator::run(config).await?;
        }
    }

    Ok(())
}
