use chrono::{DateTime, Duration, Utc};
use clap::{Args, Subcommand};
use serde::Serialize;

use pondtv_core::{current_position, upcoming_slots, Channel, PlaylistItem};

use crate::{render, AppContext, AppError, DisplayFallback, OutputFormat, Result};

#[derive(Subcommand, Debug)]
pub enum ScheduleCommands {
    /// What a channel is airing right now
    Now(ScheduleNowArgs),
    /// Upcoming program slots for a channel
    Next(ScheduleNextArgs),
}

#[derive(Args, Debug)]
pub struct ScheduleNowArgs {
    /// Channel identifier
    pub channel: String,
}

#[derive(Args, Debug)]
pub struct ScheduleNextArgs {
    /// Channel identifier
    pub channel: String,
    /// Horizon in hours
    #[arg(long, default_value_t = 6)]
    pub hours: u32,
}

#[derive(Debug, Serialize)]
struct NowReport {
    channel_id: String,
    file_path: String,
    title: String,
    seek_secs: f64,
}

impl DisplayFallback for NowReport {
    fn display(&self) -> String {
        format!(
            "{}: {} ({}) at {:.1}s",
            self.channel_id, self.title, self.file_path, self.seek_secs
        )
    }
}

#[derive(Debug, Serialize)]
struct SlotReport {
    start: DateTime<Utc>,
    stop: DateTime<Utc>,
    title: String,
}

impl DisplayFallback for SlotReport {
    fn display(&self) -> String {
        format!(
            "{} - {}  {}",
            self.start.format("%H:%M:%S"),
            self.stop.format("%H:%M:%S"),
            self.title
        )
    }
}

fn resolve(context: &AppContext, channel_id: &str) -> Result<(Channel, Vec<PlaylistItem>)> {
    let channel = context
        .channels
        .get(channel_id)?
        .ok_or_else(|| AppError::MissingResource(format!("channel {channel_id}")))?;
    let items = match channel.playlist_id.as_deref() {
        Some(playlist_id) => context
            .playlists
            .get(playlist_id)?
            .map(|playlist| playlist.items)
            .unwrap_or_default(),
        None => Vec::new(),
    };
    Ok((channel, items))
}

pub fn run(context: &AppContext, command: &ScheduleCommands, format: OutputFormat) -> Result<()> {
    match command {
        ScheduleCommands::Now(args) => {
            let (channel, items) = resolve(context, &args.channel)?;
            let position = current_position(&channel, &items, Utc::now()).ok_or_else(|| {
                AppError::MissingResource(format!(
                    "channel {} has no schedulable content",
                    args.channel
                ))
            })?;
            render(
                &NowReport {
                    channel_id: channel.id,
                    file_path: position.file_path,
                    title: position.title,
                    seek_secs: position.seek,
                },
                format,
            )
        }
        ScheduleCommands::Next(args) => {
            let (channel, items) = resolve(context, &args.channel)?;
            let slots: Vec<SlotReport> = upcoming_slots(
                &channel,
                &items,
                Utc::now(),
                Duration::hours(i64::from(args.hours)),
            )
            .into_iter()
            .map(|slot| SlotReport {
                start: slot.start,
                stop: slot.stop,
                title: slot.title,
            })
            .collect();
            render(&slots, format)
        }
    }
}
