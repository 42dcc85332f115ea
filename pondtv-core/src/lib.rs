pub mod config;
pub mod guide;
pub mod library;
pub mod playout;

pub use config::{load_config, load_config_or_default, ConfigError, PondtvConfig, Result};
pub use guide::{render_m3u, render_xmltv, MANIFEST_NAME};
pub use library::{
    Channel, ChannelStore, Playlist, PlaylistItem, PlaylistStore, StoreError, StreamSettings,
    TranscodePreset,
};
pub use playout::{
    build_hls_command, current_position, detect_acceleration, probe_duration, spawn_reaper,
    total_duration, upcoming_slots, AccelMode, CommandExecutor, PlayoutPosition, ProcessLauncher,
    ProgramSlot, StreamError, StreamStatus, StreamSupervisor, SystemCommandExecutor,
    SystemProcessLauncher,
};
