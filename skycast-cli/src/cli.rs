use anyhow::Result;
use clap::{Parser, Subcommand};
use inquire::{Confirm, Text};
use skycast_core::{
    Config, IpLocationProvider, OpenWeatherClient, Permission, Pipeline, PipelineState, WeatherFeed,
};

use crate::render;

const CONSENT_PROMPT: &str =
    "Allow skycast to determine your location from your public IP address?";

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "skycast", version, about = "Current weather and 5-day forecast for your location")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the OpenWeatherMap API key and the location permission answer.
    Configure,

    /// Show current weather and the 5-day forecast for the current location.
    Show,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Show => show().await,
        }
    }
}

fn configure() -> Result<()> {
    let mut cfg = Config::load()?;

    let api_key = Text::new("OpenWeatherMap API key:")
        .with_help_message("Create one at home.openweathermap.org/api_keys")
        .prompt()?;
    cfg.set_api_key(api_key.trim().to_string());

    let consent = Confirm::new(CONSENT_PROMPT).with_default(true).prompt()?;
    cfg.set_location_consent(consent);

    cfg.save()?;
    println!("Configuration saved to {}", Config::config_file_path()?.display());

    Ok(())
}

async fn show() -> Result<()> {
    let mut cfg = Config::load()?;
    tracing::debug!(configured = cfg.is_configured(), "configuration loaded");

    // Ask once and remember the answer; revocation goes through `configure`.
    let consent = match cfg.location_consent {
        Some(granted) => granted,
        None => {
            let granted = Confirm::new(CONSENT_PROMPT).with_default(true).prompt()?;
            cfg.set_location_consent(granted);
            cfg.save()?;
            granted
        }
    };

    let permission = if consent { Permission::Granted } else { Permission::Denied };
    let location = IpLocationProvider::new(permission);
    let weather = OpenWeatherClient::new(cfg.api_key_or_empty());

    let feed = WeatherFeed::start(Pipeline::new(location, weather));
    let mut rx = feed.subscribe();

    println!("{}", render::render(&PipelineState::Loading));

    let state = rx.wait_for(PipelineState::is_terminal).await?.clone();
    println!("{}", render::render(&state));

    Ok(())
}
