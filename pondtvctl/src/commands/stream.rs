use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Subcommand};
use tracing::{info, warn};

use pondtv_core::{
    detect_acceleration, spawn_reaper, StreamStatus, StreamSupervisor, SystemCommandExecutor,
};

use crate::{render, AppContext, DisplayFallback, OutputFormat, Result};

/// How often `serve` re-issues `start` for enabled channels. A start
/// on a healthy stream is a keep-alive; on an exited transcoder it
/// respawns at the freshly computed schedule position.
const SERVE_TICK: Duration = Duration::from_secs(5);

#[derive(Subcommand, Debug)]
pub enum StreamCommands {
    /// Run one channel's stream until interrupted
    Run(StreamRunArgs),
    /// Run every enabled channel until interrupted
    Serve,
}

#[derive(Args, Debug)]
pub struct StreamRunArgs {
    /// Channel identifier
    pub channel: String,
}

impl DisplayFallback for StreamStatus {
    fn display(&self) -> String {
        if !self.is_active {
            return format!("{}: inactive", self.channel_id);
        }
        format!(
            "{}: playing {} ({}) from {:.1}s",
            self.channel_id,
            self.current_title.as_deref().unwrap_or("?"),
            self.current_file.as_deref().unwrap_or("?"),
            self.seek_position.unwrap_or_default(),
        )
    }
}

async fn build_supervisor(context: &AppContext) -> Arc<StreamSupervisor> {
    let executor = SystemCommandExecutor;
    let accel = detect_acceleration(&executor, &context.config.ffmpeg.ffmpeg_path).await;
    info!(mode = accel.as_str(), "hardware acceleration");
    Arc::new(StreamSupervisor::new(
        context.config.clone(),
        context.channels.clone(),
        context.playlists.clone(),
        accel,
        None,
    ))
}

pub fn run(context: &AppContext, command: &StreamCommands, format: OutputFormat) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        match command {
            StreamCommands::Run(args) => run_one(context, &args.channel, format).await,
            StreamCommands::Serve => serve(context).await,
        }
    })
}

async fn run_one(context: &AppContext, channel_id: &str, format: OutputFormat) -> Result<()> {
    let supervisor = build_supervisor(context).await;
    let mut ticker = tokio::time::interval(SERVE_TICK);

    supervisor.start(channel_id).await?;
    render(&supervisor.status(channel_id).await, format)?;
    info!(channel = channel_id, "streaming, press ctrl-c to stop");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = ticker.tick() => {
                if let Err(error) = supervisor.start(channel_id).await {
                    warn!(channel = channel_id, %error, "restart failed");
                }
            }
        }
    }

    supervisor.shutdown_all().await;
    Ok(())
}

/// Continuous playout for every enabled channel: each tick re-issues
/// `start` (keep-alive or respawn), while the idle reaper cleans up
/// anything that stops being schedulable.
async fn serve(context: &AppContext) -> Result<()> {
    let supervisor = build_supervisor(context).await;
    let interval = Duration::from_secs(context.config.stream.cleanup_interval_secs);
    let (reaper, shutdown) = spawn_reaper(supervisor.clone(), interval);
    let mut ticker = tokio::time::interval(SERVE_TICK);
    info!("supervisor running, press ctrl-c to stop");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = ticker.tick() => {
                let channels = supervisor_channels(context)?;
                for channel_id in channels {
                    if let Err(error) = supervisor.start(&channel_id).await {
                        warn!(channel = %channel_id, %error, "start failed");
                    }
                }
            }
        }
    }

    info!("shutting down");
    let _ = shutdown.send(true);
    let _ = reaper.await;
    supervisor.shutdown_all().await;
    Ok(())
}

fn supervisor_channels(context: &AppContext) -> Result<Vec<String>> {
    Ok(context
        .channels
        .list()?
        .into_iter()
        .filter(|channel| channel.enabled)
        .map(|channel| channel.id)
        .collect())
}
