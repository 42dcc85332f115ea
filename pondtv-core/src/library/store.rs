use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use super::models::{Channel, Playlist};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error on {path}: {source}")]
    Io { source: io::Error, path: PathBuf },
    #[error("failed to decode {path}: {source}")]
    Decode {
        source: serde_json::Error,
        path: PathBuf,
    },
    #[error("failed to encode record: {0}")]
    Encode(#[source] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> StoreResult<T> {
    let content = fs::read_to_string(path).map_err(|source| StoreError::Io {
        source,
        path: path.to_path_buf(),
    })?;
    serde_json::from_str(&content).map_err(|source| StoreError::Decode {
        source,
        path: path.to_path_buf(),
    })
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> StoreResult<()> {
    let content = serde_json::to_string_pretty(value).map_err(StoreError::Encode)?;
    fs::write(path, content).map_err(|source| StoreError::Io {
        source,
        path: path.to_path_buf(),
    })
}

/// File-backed channel definitions, one `<id>.json` per channel.
#[derive(Debug, Clone)]
pub struct ChannelStore {
    dir: PathBuf,
}

impl ChannelStore {
    pub fn new<P: Into<PathBuf>>(dir: P) -> StoreResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| StoreError::Io {
            source,
            path: dir.clone(),
        })?;
        Ok(Self { dir })
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    /// All channels, sorted by channel number. Unreadable files are
    /// logged and skipped so one corrupt record cannot hide the rest.
    pub fn list(&self) -> StoreResult<Vec<Channel>> {
        let mut channels = Vec::new();
        let entries = fs::read_dir(&self.dir).map_err(|source| StoreError::Io {
            source,
            path: self.dir.clone(),
        })?;
        for entry in entries {
            let entry = entry.map_err(|source| StoreError::Io {
                source,
                path: self.dir.clone(),
            })?;
            let path = entry.path();
            if path.extension().map(|ext| ext == "json").unwrap_or(false) {
                match read_json::<Channel>(&path) {
                    Ok(channel) => channels.push(channel),
                    Err(error) => {
                        warn!(path = %path.display(), %error, "skipping unreadable channel file");
                    }
                }
            }
        }
        channels.sort_by_key(|channel| channel.number);
        Ok(channels)
    }

    pub fn get(&self, id: &str) -> StoreResult<Option<Channel>> {
        let path = self.path_for(id);
        if !path.exists() {
            return Ok(None);
        }
        read_json(&path).map(Some)
    }

    /// Persists a new channel, filling in a generated id and bumping a
    /// taken channel number past the highest in use.
    pub fn create(&self, mut channel: Channel) -> StoreResult<Channel> {
        if channel.id.is_empty() {
            channel.id = Uuid::new_v4().to_string();
        }
        let existing = self.list()?;
        let used: std::collections::HashSet<u32> =
            existing.iter().map(|existing| existing.number).collect();
        if used.contains(&channel.number) {
            channel.number = used.iter().max().copied().unwrap_or(0) + 1;
        }
        write_json(&self.path_for(&channel.id), &channel)?;
        Ok(channel)
    }

    pub fn update(&self, id: &str, mut channel: Channel) -> StoreResult<Option<Channel>> {
        let path = self.path_for(id);
        if !path.exists() {
            return Ok(None);
        }
        channel.id = id.to_string();
        write_json(&path, &channel)?;
        Ok(Some(channel))
    }

    pub fn delete(&self, id: &str) -> StoreResult<bool> {
        let path = self.path_for(id);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path).map_err(|source| StoreError::Io { source, path })?;
        Ok(true)
    }
}

/// File-backed playlists, one `<id>.json` per playlist.
#[derive(Debug, Clone)]
pub struct PlaylistStore {
    dir: PathBuf,
}

impl PlaylistStore {
    pub fn new<P: Into<PathBuf>>(dir: P) -> StoreResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| StoreError::Io {
            source,
            path: dir.clone(),
        })?;
        Ok(Self { dir })
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    /// All playlists, sorted by case-insensitive name.
    pub fn list(&self) -> StoreResult<Vec<Playlist>> {
        let mut playlists = Vec::new();
        let entries = fs::read_dir(&self.dir).map_err(|source| StoreError::Io {
            source,
            path: self.dir.clone(),
        })?;
        for entry in entries {
            let entry = entry.map_err(|source| StoreError::Io {
                source,
                path: self.dir.clone(),
            })?;
            let path = entry.path();
            let is_json = path.extension().map(|ext| ext == "json").unwrap_or(false);
            let hidden = path
                .file_name()
                .and_then(|name| name.to_str())
                .map(|name| name.starts_with('_'))
                .unwrap_or(false);
            if is_json && !hidden {
                match read_json::<Playlist>(&path) {
                    Ok(playlist) => playlists.push(playlist),
                    Err(error) => {
                        warn!(path = %path.display(), %error, "skipping unreadable playlist file");
                    }
                }
            }
        }
        playlists.sort_by_key(|playlist| playlist.name.to_lowercase());
        Ok(playlists)
    }

    pub fn get(&self, id: &str) -> StoreResult<Option<Playlist>> {
        let path = self.path_for(id);
        if !path.exists() {
            return Ok(None);
        }
        read_json(&path).map(Some)
    }

    pub fn create(&self, mut playlist: Playlist) -> StoreResult<Playlist> {
        if playlist.id.is_empty() {
            playlist.id = Uuid::new_v4().to_string();
        }
        write_json(&self.path_for(&playlist.id), &playlist)?;
        Ok(playlist)
    }

    pub fn update(&self, id: &str, mut playlist: Playlist) -> StoreResult<Option<Playlist>> {
        let path = self.path_for(id);
        if !path.exists() {
            return Ok(None);
        }
        playlist.id = id.to_string();
        playlist.updated_at = chrono::Utc::now();
        write_json(&path, &playlist)?;
        Ok(Some(playlist))
    }

    pub fn delete(&self, id: &str) -> StoreResult<bool> {
        let path = self.path_for(id);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path).map_err(|source| StoreError::Io { source, path })?;
        Ok(true)
    }

    /// Whether any channel in `channels` references this playlist.
    pub fn is_in_use(&self, playlist_id: &str, channels: &ChannelStore) -> StoreResult<bool> {
        let channels = channels.list()?;
        Ok(channels
            .iter()
            .any(|channel| channel.playlist_id.as_deref() == Some(playlist_id)))
    }
}
