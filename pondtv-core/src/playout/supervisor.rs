//! Per-channel transcoder lifecycle: start-on-demand, keep-alive,
//! idle eviction, teardown.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::process::{Child, Command};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::PondtvConfig;
use crate::guide::MANIFEST_NAME;
use crate::library::{Channel, ChannelStore, PlaylistItem, PlaylistStore, StoreError};

use super::command::{build_hls_command, AccelMode};
use super::schedule::current_position;
use super::{ProcessLauncher, SystemProcessLauncher};

const MANIFEST_POLL_INTERVAL: StdDuration = StdDuration::from_millis(250);

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("channel not found: {0}")]
    ChannelNotFound(String),
    #[error("channel is disabled: {0}")]
    ChannelDisabled(String),
    #[error("channel {0} has no schedulable content")]
    EmptyPlaylist(String),
    #[error("media file missing: {0}")]
    MediaFileMissing(PathBuf),
    #[error("failed to spawn transcoder: {0}")]
    SpawnFailed(#[source] std::io::Error),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// One tracked transcoder process. Exists if and only if the registry
/// entry exists; removal and process teardown happen together.
struct RunningStream {
    child: Child,
    file_path: String,
    title: String,
    seek: f64,
    started_at: DateTime<Utc>,
    last_access: DateTime<Utc>,
}

/// Point-in-time snapshot of one channel's stream.
#[derive(Debug, Clone, Serialize)]
pub struct StreamStatus {
    pub channel_id: String,
    pub is_active: bool,
    pub current_file: Option<String>,
    pub current_title: Option<String>,
    pub seek_position: Option<f64>,
    pub started_at: Option<DateTime<Utc>>,
    pub last_request: Option<DateTime<Utc>>,
}

impl StreamStatus {
    fn inactive(channel_id: &str) -> Self {
        Self {
            channel_id: channel_id.to_string(),
            is_active: false,
            current_file: None,
            current_title: None,
            seek_position: None,
            started_at: None,
            last_request: None,
        }
    }
}

/// Owns the channel-to-process registry. All reads and writes of the
/// registry go through the one mutex, so a check-then-create sequence
/// cannot race another start for the same channel.
pub struct StreamSupervisor {
    config: PondtvConfig,
    channels: ChannelStore,
    playlists: PlaylistStore,
    accel: AccelMode,
    launcher: Arc<dyn ProcessLauncher>,
    registry: Mutex<HashMap<String, RunningStream>>,
}

impl fmt::Debug for StreamSupervisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamSupervisor")
            .field("accel", &self.accel)
            .field("streams_dir", &self.config.paths.streams_dir)
            .finish()
    }
}

impl StreamSupervisor {
    pub fn new(
        config: PondtvConfig,
        channels: ChannelStore,
        playlists: PlaylistStore,
        accel: AccelMode,
        launcher: Option<Arc<dyn ProcessLauncher>>,
    ) -> Self {
        let launcher = launcher.unwrap_or_else(|| Arc::new(SystemProcessLauncher));
        Self {
            config,
            channels,
            playlists,
            accel,
            launcher,
            registry: Mutex::new(HashMap::new()),
        }
    }

    fn resolve_items(&self, channel: &Channel) -> Result<Vec<PlaylistItem>, StreamError> {
        let Some(playlist_id) = channel.playlist_id.as_deref() else {
            return Ok(Vec::new());
        };
        Ok(self
            .playlists
            .get(playlist_id)?
            .map(|playlist| playlist.items)
            .unwrap_or_default())
    }

    /// Starts (or keeps alive) the stream for a channel.
    ///
    /// Idempotent for a healthy stream: a repeated call only refreshes
    /// the access timestamp. A tracked entry whose process has exited
    /// is torn down first so stale state never blocks a restart.
    pub async fn start(&self, channel_id: &str) -> Result<(), StreamError> {
        let mut registry = self.registry.lock().await;

        if let Some(existing) = registry.get_mut(channel_id) {
            if matches!(existing.child.try_wait(), Ok(None)) {
                existing.last_access = Utc::now();
                debug!(channel = channel_id, "stream already running, keep-alive");
                return Ok(());
            }
            warn!(channel = channel_id, "tracked transcoder has exited, tearing down");
            if let Some(stale) = registry.remove(channel_id) {
                self.teardown(channel_id, stale).await;
            }
        }

        let channel = self
            .channels
            .get(channel_id)?
            .ok_or_else(|| StreamError::ChannelNotFound(channel_id.to_string()))?;
        if !channel.enabled {
            return Err(StreamError::ChannelDisabled(channel_id.to_string()));
        }

        let items = self.resolve_items(&channel)?;
        let position = current_position(&channel, &items, Utc::now())
            .ok_or_else(|| StreamError::EmptyPlaylist(channel_id.to_string()))?;

        // Relative item paths live under the media directory.
        let media_path = PondtvConfig::resolve_path(
            &self.config.paths.media_dir,
            Path::new(&position.file_path),
        );
        if !media_path.exists() {
            return Err(StreamError::MediaFileMissing(media_path));
        }

        let output_dir = self.config.stream_dir(channel_id);
        let args = build_hls_command(
            &media_path.to_string_lossy(),
            &output_dir,
            position.seek,
            &channel.stream_settings,
            self.accel,
            &self.config.ffmpeg.log_level,
        )?;

        let mut command = Command::new(&self.config.ffmpeg.ffmpeg_path);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        let child = self
            .launcher
            .launch(&mut command)
            .map_err(StreamError::SpawnFailed)?;

        info!(
            channel = channel_id,
            title = %position.title,
            seek = position.seek,
            "started stream"
        );
        let now = Utc::now();
        registry.insert(
            channel_id.to_string(),
            RunningStream {
                child,
                file_path: position.file_path,
                title: position.title,
                seek: position.seek,
                started_at: now,
                last_access: now,
            },
        );
        drop(registry);

        self.wait_for_manifest(channel_id, &output_dir).await;
        Ok(())
    }

    /// Bounded poll for the first manifest instead of a blind warm-up
    /// sleep. A timeout is logged, not fatal: the viewer's player will
    /// retry the manifest on its own.
    async fn wait_for_manifest(&self, channel_id: &str, output_dir: &Path) {
        let manifest = output_dir.join(MANIFEST_NAME);
        let deadline = tokio::time::Instant::now()
            + StdDuration::from_secs(self.config.stream.warmup_timeout_secs);
        while tokio::time::Instant::now() < deadline {
            if manifest.exists() {
                return;
            }
            tokio::time::sleep(MANIFEST_POLL_INTERVAL).await;
        }
        if !manifest.exists() && self.config.stream.warmup_timeout_secs > 0 {
            warn!(
                channel = channel_id,
                path = %manifest.display(),
                "manifest did not appear within the warm-up window"
            );
        }
    }

    /// Stops a channel's stream. Returns `false` when nothing was
    /// running.
    pub async fn stop(&self, channel_id: &str) -> Result<bool, StreamError> {
        let stream = { self.registry.lock().await.remove(channel_id) };
        let Some(stream) = stream else {
            return Ok(false);
        };
        self.teardown(channel_id, stream).await;
        Ok(true)
    }

    async fn teardown(&self, channel_id: &str, mut stream: RunningStream) {
        self.terminate(channel_id, &mut stream.child).await;

        let output_dir = self.config.stream_dir(channel_id);
        match tokio::fs::remove_dir_all(&output_dir).await {
            Ok(()) => {}
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {}
            Err(error) => {
                warn!(channel = channel_id, %error, "failed to remove stream directory");
            }
        }
        info!(channel = channel_id, "stopped stream");
    }

    /// Graceful termination with bounded wait, escalating to SIGKILL.
    /// Either path counts as a successful stop.
    async fn terminate(&self, channel_id: &str, child: &mut Child) {
        if matches!(child.try_wait(), Ok(Some(_))) {
            return;
        }
        request_graceful_exit(child);
        let grace = StdDuration::from_secs(self.config.stream.stop_grace_secs);
        match tokio::time::timeout(grace, child.wait()).await {
            Ok(Ok(status)) => {
                debug!(channel = channel_id, ?status, "transcoder exited");
            }
            Ok(Err(error)) => {
                warn!(channel = channel_id, %error, "failed waiting on transcoder");
            }
            Err(_) => {
                warn!(channel = channel_id, "transcoder ignored termination, killing");
                if let Err(error) = child.kill().await {
                    warn!(channel = channel_id, %error, "failed to kill transcoder");
                }
            }
        }
    }

    /// Records viewer activity for a running channel.
    pub async fn touch(&self, channel_id: &str) {
        if let Some(stream) = self.registry.lock().await.get_mut(channel_id) {
            stream.last_access = Utc::now();
        }
    }

    pub async fn last_access(&self, channel_id: &str) -> Option<DateTime<Utc>> {
        self.registry
            .lock()
            .await
            .get(channel_id)
            .map(|stream| stream.last_access)
    }

    /// Stops every stream idle longer than the configured timeout.
    /// One channel's teardown failure never blocks the rest.
    pub async fn reap_idle(&self) {
        self.reap_idle_at(Utc::now()).await;
    }

    pub async fn reap_idle_at(&self, now: DateTime<Utc>) {
        let threshold = Duration::seconds(self.config.stream.idle_timeout_secs as i64);
        let idle: Vec<String> = {
            let registry = self.registry.lock().await;
            registry
                .iter()
                .filter(|(_, stream)| now - stream.last_access > threshold)
                .map(|(id, _)| id.clone())
                .collect()
        };
        for channel_id in idle {
            info!(channel = %channel_id, "stopping idle stream");
            if let Err(error) = self.stop(&channel_id).await {
                warn!(channel = %channel_id, %error, "failed to stop idle stream");
            }
        }
    }

    pub async fn status(&self, channel_id: &str) -> StreamStatus {
        let registry = self.registry.lock().await;
        match registry.get(channel_id) {
            Some(stream) => StreamStatus {
                channel_id: channel_id.to_string(),
                is_active: true,
                current_file: Some(stream.file_path.clone()),
                current_title: Some(stream.title.clone()),
                seek_position: Some(stream.seek),
                started_at: Some(stream.started_at),
                last_request: Some(stream.last_access),
            },
            None => StreamStatus::inactive(channel_id),
        }
    }

    pub async fn active_channels(&self) -> Vec<String> {
        let registry = self.registry.lock().await;
        let mut ids: Vec<String> = registry.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Stops everything. Must run before process exit so no transcoder
    /// is orphaned.
    pub async fn shutdown_all(&self) {
        let ids = self.active_channels().await;
        for channel_id in ids {
            if let Err(error) = self.stop(&channel_id).await {
                warn!(channel = %channel_id, %error, "failed to stop stream during shutdown");
            }
        }
    }
}

#[cfg(unix)]
fn request_graceful_exit(child: &mut Child) {
    if let Some(pid) = child.id() {
        // SAFETY: plain kill(2) on a pid we own; no memory involved.
        unsafe {
            libc::kill(pid as libc::pid_t, libc::SIGTERM);
        }
    }
}

#[cfg(not(unix))]
fn request_graceful_exit(child: &mut Child) {
    let _ = child.start_kill();
}

/// Runs the idle sweep on a fixed period until the returned sender
/// signals shutdown. Join the handle to make cancellation effective.
pub fn spawn_reaper(
    supervisor: Arc<StreamSupervisor>,
    interval: StdDuration,
) -> (JoinHandle<()>, watch::Sender<bool>) {
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick of a tokio interval fires immediately.
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = ticker.tick() => supervisor.reap_idle().await,
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }
        debug!("idle reaper stopped");
    });
    (handle, shutdown_tx)
}
