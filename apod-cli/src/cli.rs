use anyhow::{Context, Result};
use apod_core::{Config, NasaClient, PictureOfDay};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use inquire::{Password, PasswordDisplayMode};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "apod", version, about = "Astronomy Picture of the Day CLI")]
pub struct Cli {
    /// API key to use instead of the configured one.
    #[arg(long, global = true)]
    pub api_key: Option<String>,

    /// Print results as JSON.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the api.nasa.gov key.
    Configure,

    /// Show today's picture.
    Today,

    /// Show random pictures.
    Random {
        /// How many pictures to fetch.
        #[arg(default_value_t = 1)]
        count: u32,
    },

    /// Show the picture for a given day (YYYY-MM-DD).
    Date { date: NaiveDate },

    /// Show every picture between two days, inclusive (YYYY-MM-DD).
    Range { start: NaiveDate, end: NaiveDate },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let mut config = Config::load()?;
        let api_key = self.api_key.as_deref();

        let pics = match self.command {
            Command::Configure => return configure(&mut config),
            Command::Today => vec![connect(api_key, &config)?.apod().get_today().await?],
            Command::Random { count } => {
                connect(api_key, &config)?.apod().get_random(count).await?
            }
            Command::Date { date } => {
                vec![connect(api_key, &config)?.apod().get_by_date(date).await?]
            }
            Command::Range { start, end } => {
                connect(api_key, &config)?.apod().get_range(start, end).await?
            }
        };

        if self.json {
            println!("{}", serde_json::to_string_pretty(&pics)?);
        } else {
            let blocks: Vec<String> = pics.iter().map(render).collect();
            println!("{}", blocks.join("\n\n"));
        }

        Ok(())
    }
}

/// Build a client from the `--api-key` override or the stored key.
fn connect(api_key: Option<&str>, config: &Config) -> Result<NasaClient> {
    let api_key = match api_key {
        Some(key) => key,
        None => config.api_key()?,
    };

    NasaClient::with_base_url(api_key, config.base_url()).context("Failed to create APOD client")
}

fn configure(config: &mut Config) -> Result<()> {
    let api_key = Password::new("api.nasa.gov API key:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;

    config.set_api_key(api_key.trim().to_string());
    config.save()?;

    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(())
}

fn render(pic: &PictureOfDay) -> String {
    let mut lines = vec![format!("{}  {}", pic.date(), pic.title().unwrap_or("(untitled)"))];

    match pic.copyright() {
        Some(holder) => lines.push(format!("Copyright: {}", holder.trim())),
        None => lines.push("Public domain".to_string()),
    }
    if let Some(url) = pic.url() {
        lines.push(format!("Image:     {url}"));
    }
    if let Some(hd) = pic.hd_url() {
        lines.push(format!("HD image:  {hd}"));
    }
    if let Some(text) = pic.explanation() {
        lines.push(String::new());
        lines.push(text.to_string());
    }

    lines.join("\n")
}
