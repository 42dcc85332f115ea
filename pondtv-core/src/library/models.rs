use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One entry of a playlist. Order within the playlist is the air
/// order; `duration` must be known (> 0) for the item to be
/// schedulable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlaylistItem {
    pub file_path: String,
    /// Duration in whole seconds.
    pub duration: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Playlist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub items: Vec<PlaylistItem>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Playlist {
    /// Total airtime in seconds; zero means nothing is schedulable.
    pub fn total_duration(&self) -> i64 {
        self.items.iter().map(|item| item.duration).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TranscodePreset {
    #[default]
    SoftwareFast,
    SoftwareMedium,
    Qsv,
    Nvenc,
}

impl TranscodePreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            TranscodePreset::SoftwareFast => "software_fast",
            TranscodePreset::SoftwareMedium => "software_medium",
            TranscodePreset::Qsv => "qsv",
            TranscodePreset::Nvenc => "nvenc",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StreamSettings {
    /// Video bitrate cap in kbps.
    pub video_bitrate: u32,
    /// Audio bitrate in kbps.
    pub audio_bitrate: u32,
    /// HLS segment length in seconds.
    pub segment_duration: u32,
    /// Number of segments kept in the rolling manifest window.
    pub playlist_size: u32,
    pub transcode_preset: TranscodePreset,
    /// Output resolution as "WxH", or "original" for no scaling.
    pub resolution: String,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            video_bitrate: 3000,
            audio_bitrate: 128,
            segment_duration: 6,
            playlist_size: 10,
            transcode_preset: TranscodePreset::SoftwareFast,
            resolution: "1280x720".to_string(),
        }
    }
}

/// A simulated linear channel. `start_time` anchors the schedule; when
/// absent the channel behaves as if it had been airing since the Unix
/// epoch, which gives every viewer the same globally-synchronized
/// position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    pub name: String,
    pub number: u32,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub playlist_id: Option<String>,
    #[serde(rename = "loop", default = "default_true")]
    pub loop_playlist: bool,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub stream_settings: StreamSettings,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_category() -> String {
    "General".to_string()
}

fn default_true() -> bool {
    true
}
