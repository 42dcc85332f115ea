pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use thiserror::Error;

use pondtv_core::{load_config_or_default, ChannelStore, PlaylistStore, PondtvConfig};

use commands::channels::ChannelCommands;
use commands::guide::GuideCommands;
use commands::playlists::PlaylistCommands;
use commands::schedule::ScheduleCommands;
use commands::stream::StreamCommands;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(#[from] pondtv_core::ConfigError),
    #[error("store error: {0}")]
    Store(#[from] pondtv_core::StoreError),
    #[error("stream error: {0}")]
    Stream(#[from] pondtv_core::StreamError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("required resource missing: {0}")]
    MissingResource(String),
}

#[derive(Parser, Debug)]
#[command(author, version, about = "PondTV command-line control interface", long_about = None)]
pub struct Cli {
    /// Path to pondtv.toml; defaults apply when the file is absent
    #[arg(long, default_value = "pondtv.toml")]
    pub config: PathBuf,
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Channel definitions
    #[command(subcommand)]
    Channel(ChannelCommands),
    /// Playlist management
    #[command(subcommand)]
    Playlist(PlaylistCommands),
    /// Playout schedule queries
    #[command(subcommand)]
    Schedule(ScheduleCommands),
    /// Channel list / program guide documents
    #[command(subcommand)]
    Guide(GuideCommands),
    /// Stream supervision
    #[command(subcommand)]
    Stream(StreamCommands),
}

/// Shared handles for command execution.
pub struct AppContext {
    pub config: PondtvConfig,
    pub channels: ChannelStore,
    pub playlists: PlaylistStore,
}

impl AppContext {
    fn new(cli: &Cli) -> Result<Self> {
        let config = load_config_or_default(&cli.config)?;
        let channels = ChannelStore::new(&config.paths.channels_dir)?;
        let playlists = PlaylistStore::new(&config.paths.playlists_dir)?;
        Ok(Self {
            config,
            channels,
            playlists,
        })
    }
}

pub fn run(cli: Cli) -> Result<()> {
    let context = AppContext::new(&cli)?;

    match &cli.command {
        Commands::Channel(command) => commands::channels::run(&context, command, cli.format),
        Commands::Playlist(command) => commands::playlists::run(&context, command, cli.format),
        Commands::Schedule(command) => commands::schedule::run(&context, command, cli.format),
        Commands::Guide(command) => commands::guide::run(&context, command),
        Commands::Stream(command) => commands::stream::run(&context, command, cli.format),
    }
}

pub(crate) fn render<T>(value: &T, format: OutputFormat) -> Result<()>
where
    T: Serialize + DisplayFallback,
{
    match format {
        OutputFormat::Text => {
            println!("{}", value.display());
            Ok(())
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(value)?;
            println!("{json}");
            Ok(())
        }
    }
}

pub(crate) trait DisplayFallback {
    fn display(&self) -> String;
}

impl<T: DisplayFallback> DisplayFallback for Vec<T> {
    fn display(&self) -> String {
        self.iter()
            .map(DisplayFallback::display)
            .collect::<Vec<_>>()
            .join("\n")
    }
}
