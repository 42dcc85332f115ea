use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read { source: io::Error, path: PathBuf },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        source: toml::de::Error,
        path: PathBuf,
    },
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Top-level configuration, normally loaded from `pondtv.toml`.
///
/// Every section has defaults so the tools can run against an empty or
/// partial file; paths default to a `data/` tree next to the working
/// directory.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct PondtvConfig {
    pub paths: PathsSection,
    pub stream: StreamSection,
    pub ffmpeg: FfmpegSection,
    pub epg: EpgSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsSection {
    pub channels_dir: PathBuf,
    pub playlists_dir: PathBuf,
    pub media_dir: PathBuf,
    pub streams_dir: PathBuf,
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            channels_dir: PathBuf::from("data/channels"),
            playlists_dir: PathBuf::from("data/playlists"),
            media_dir: PathBuf::from("data/media"),
            streams_dir: PathBuf::from("data/streams"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StreamSection {
    /// Seconds without viewer activity before a stream is reaped.
    pub idle_timeout_secs: u64,
    /// Period of the idle-reaping sweep.
    pub cleanup_interval_secs: u64,
    /// Upper bound on waiting for the first manifest after spawn.
    pub warmup_timeout_secs: u64,
    /// Grace period between SIGTERM and SIGKILL on stop.
    pub stop_grace_secs: u64,
}

impl Default for StreamSection {
    fn default() -> Self {
        Self {
            idle_timeout_secs: 60,
            cleanup_interval_secs: 30,
            warmup_timeout_secs: 10,
            stop_grace_secs: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FfmpegSection {
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
    pub log_level: String,
}

impl Default for FfmpegSection {
    fn default() -> Self {
        Self {
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
            log_level: "warning".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EpgSection {
    /// Horizon of the generated guide, in hours.
    pub hours_ahead: u32,
    /// External base URL advertised in M3U playout links.
    pub base_url: String,
}

impl Default for EpgSection {
    fn default() -> Self {
        Self {
            hours_ahead: 48,
            base_url: "http://localhost:8000".to_string(),
        }
    }
}

impl PondtvConfig {
    pub fn resolve_path<P: AsRef<Path>>(base: P, candidate: &Path) -> PathBuf {
        if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            base.as_ref().join(candidate)
        }
    }

    /// Directory holding the HLS output of one channel.
    pub fn stream_dir(&self, channel_id: &str) -> PathBuf {
        self.paths.streams_dir.join(channel_id)
    }
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<PondtvConfig> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        source,
        path: path.to_path_buf(),
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        source,
        path: path.to_path_buf(),
    })
}

/// Loads the config file when present, falling back to defaults when
/// it does not exist. Parse failures are still reported.
pub fn load_config_or_default<P: AsRef<Path>>(path: P) -> Result<PondtvConfig> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(PondtvConfig::default());
    }
    load_config(path)
}
