use anyhow::{Context, anyhow, bail};
use clap::{Parser, Subcommand};
use inquire::{Password, PasswordDisplayMode};
use weather_pool_core::{Aggregator, Config, EnvCredentials, ProviderKind};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather-pool", version, about = "Weather from a pool of providers")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the API key for a provider in the config file.
    Configure {
        /// Provider short name: openweathermap, weatherapi or accuweather.
        provider: String,
    },

    /// Show weather for a location.
    Show {
        /// "lat,lon" or a place name (place names need a provider that geocodes).
        location: String,

        /// Number of forecast days; defaults to the configured value.
        #[arg(long)]
        days: Option<usize>,
    },

    /// List registered providers with their usage and state.
    Providers,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure { provider } => configure(&provider),
            Command::Show { location, days } => show(&location, days).await,
            Command::Providers => providers().await,
        }
    }
}

fn load_config() -> anyhow::Result<Config> {
    Ok(Config::load()?.with_credentials(&EnvCredentials))
}

fn configure(provider: &str) -> anyhow::Result<()> {
    let kind = ProviderKind::try_from(provider)?;
    if kind.credential_key().is_none() {
        println!("{kind} needs no API key.");
        return Ok(());
    }

    // Only the file contents are saved; environment credentials are not persisted.
    let mut config = Config::load()?;
    let api_key = Password::new(&format!("API key for {kind}:"))
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;

    let api_key = api_key.trim();
    if api_key.is_empty() {
        bail!("API key must not be empty");
    }

    config.upsert_provider_api_key(kind, api_key.to_string());
    config.save()?;

    println!("Saved API key for {kind} to {}", Config::config_file_path()?.display());
    Ok(())
}

async fn show(location: &str, days: Option<usize>) -> anyhow::Result<()> {
    let config = load_config()?;
    let aggregator = Aggregator::start(&config)?;
    tracing::debug!(location, ?days, providers = ?aggregator.registry().names(), "fetching weather");

    let snapshot = aggregator.fetch_weather(location, days).await;
    aggregator.shutdown();

    let snapshot = snapshot.ok_or_else(|| anyhow!("no upstream available"))?;
    let envelope = snapshot.to_envelope().context("Failed to encode weather")?;
    println!("{}", serde_json::to_string_pretty(&envelope)?);
    Ok(())
}

async fn providers() -> anyhow::Result<()> {
    let config = load_config()?;
    let aggregator = Aggregator::start(&config)?;

    println!("{:<16} {:<16} {:>12}  {}", "NAME", "KIND", "USAGE/QUOTA", "ENABLED");
    for status in aggregator.status() {
        println!(
            "{:<16} {:<16} {:>12}  {}",
            status.name,
            status.kind.as_str(),
            format!("{}/{}", status.usage, status.hourly_quota),
            if status.enabled { "yes" } else { "no" }
        );
    }

    aggregator.shutdown();
    Ok(())
}
