pub mod models;
pub mod store;

pub use models::{Channel, Playlist, PlaylistItem, StreamSettings, TranscodePreset};
pub use store::{ChannelStore, PlaylistStore, StoreError, StoreResult};
