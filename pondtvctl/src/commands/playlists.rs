use std::path::Path;

use clap::{Args, Subcommand};
use serde::Serialize;

use pondtv_core::{probe_duration, Playlist, PondtvConfig, SystemCommandExecutor};

use crate::{render, AppContext, AppError, DisplayFallback, OutputFormat, Result};

#[derive(Subcommand, Debug)]
pub enum PlaylistCommands {
    /// List all playlists
    List,
    /// Fill in missing item durations via ffprobe
    Probe(PlaylistProbeArgs),
}

#[derive(Args, Debug)]
pub struct PlaylistProbeArgs {
    /// Playlist identifier
    pub id: String,
}

#[derive(Debug, Serialize)]
struct PlaylistSummary {
    id: String,
    name: String,
    items: usize,
    total_duration_secs: i64,
}

impl From<&Playlist> for PlaylistSummary {
    fn from(playlist: &Playlist) -> Self {
        Self {
            id: playlist.id.clone(),
            name: playlist.name.clone(),
            items: playlist.items.len(),
            total_duration_secs: playlist.total_duration(),
        }
    }
}

impl DisplayFallback for PlaylistSummary {
    fn display(&self) -> String {
        format!(
            "{:<36}  {:<24} {} items, {}s total",
            self.id, self.name, self.items, self.total_duration_secs
        )
    }
}

#[derive(Debug, Serialize)]
struct ProbeReport {
    playlist_id: String,
    probed: usize,
    filled: usize,
    unresolved: Vec<String>,
}

impl DisplayFallback for ProbeReport {
    fn display(&self) -> String {
        let mut out = format!(
            "playlist {}: probed {} items, filled {} durations",
            self.playlist_id, self.probed, self.filled
        );
        for file in &self.unresolved {
            out.push_str(&format!("\n  unresolved: {file}"));
        }
        out
    }
}

pub fn run(context: &AppContext, command: &PlaylistCommands, format: OutputFormat) -> Result<()> {
    match command {
        PlaylistCommands::List => {
            let summaries: Vec<PlaylistSummary> = context
                .playlists
                .list()?
                .iter()
                .map(PlaylistSummary::from)
                .collect();
            render(&summaries, format)
        }
        PlaylistCommands::Probe(args) => {
            let report = probe_playlist(context, &args.id)?;
            render(&report, format)
        }
    }
}

fn probe_playlist(context: &AppContext, id: &str) -> Result<ProbeReport> {
    let mut playlist = context
        .playlists
        .get(id)?
        .ok_or_else(|| AppError::MissingResource(format!("playlist {id}")))?;

    let executor = SystemCommandExecutor;
    let ffprobe = context.config.ffmpeg.ffprobe_path.clone();
    let runtime = tokio::runtime::Runtime::new()?;

    let mut probed = 0;
    let mut filled = 0;
    let mut unresolved = Vec::new();
    for item in &mut playlist.items {
        if item.duration > 0 {
            continue;
        }
        probed += 1;
        let media_path = PondtvConfig::resolve_path(
            &context.config.paths.media_dir,
            Path::new(&item.file_path),
        );
        match runtime.block_on(probe_duration(&executor, &ffprobe, &media_path.to_string_lossy())) {
            Some(duration) if duration > 0.0 => {
                item.duration = duration.round() as i64;
                filled += 1;
            }
            _ => unresolved.push(item.file_path.clone()),
        }
    }

    if filled > 0 {
        context.playlists.update(id, playlist)?;
    }

    Ok(ProbeReport {
        playlist_id: id.to_string(),
        probed,
        filled,
        unresolved,
    })
}
