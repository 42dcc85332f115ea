use clap::{Args, Subcommand};
use serde::Serialize;

use pondtv_core::Channel;

use crate::{render, AppContext, AppError, DisplayFallback, OutputFormat, Result};

#[derive(Subcommand, Debug)]
pub enum ChannelCommands {
    /// List all channels
    List,
    /// Show one channel in full
    Show(ChannelShowArgs),
}

#[derive(Args, Debug)]
pub struct ChannelShowArgs {
    /// Channel identifier
    pub id: String,
}

#[derive(Debug, Serialize)]
struct ChannelSummary {
    id: String,
    number: u32,
    name: String,
    category: String,
    enabled: bool,
    playlist_id: Option<String>,
}

impl From<&Channel> for ChannelSummary {
    fn from(channel: &Channel) -> Self {
        Self {
            id: channel.id.clone(),
            number: channel.number,
            name: channel.name.clone(),
            category: channel.category.clone(),
            enabled: channel.enabled,
            playlist_id: channel.playlist_id.clone(),
        }
    }
}

impl DisplayFallback for ChannelSummary {
    fn display(&self) -> String {
        let state = if self.enabled { "on" } else { "off" };
        format!(
            "{:>4}  {:<24} [{}] ({}) playlist={}",
            self.number,
            self.name,
            state,
            self.category,
            self.playlist_id.as_deref().unwrap_or("-")
        )
    }
}

impl DisplayFallback for Channel {
    fn display(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| self.id.clone())
    }
}

pub fn run(context: &AppContext, command: &ChannelCommands, format: OutputFormat) -> Result<()> {
    match command {
        ChannelCommands::List => {
            let summaries: Vec<ChannelSummary> = context
                .channels
                .list()?
                .iter()
                .map(ChannelSummary::from)
                .collect();
            render(&summaries, format)
        }
        ChannelCommands::Show(args) => {
            let channel = context
                .channels
                .get(&args.id)?
                .ok_or_else(|| AppError::MissingResource(format!("channel {}", args.id)))?;
            render(&channel, format)
        }
    }
}
