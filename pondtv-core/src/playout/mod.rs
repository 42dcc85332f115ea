pub mod command;
pub mod schedule;
pub mod supervisor;

use std::io;

use tokio::process::{Child, Command};

pub use command::{build_hls_command, detect_acceleration, probe_duration, AccelMode};
pub use schedule::{current_position, total_duration, upcoming_slots, PlayoutPosition, ProgramSlot};
pub use supervisor::{spawn_reaper, StreamError, StreamStatus, StreamSupervisor};

/// Seam for one-shot external invocations (capability probe, ffprobe)
/// so tests can substitute canned output.
#[async_trait::async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn run(&self, command: &mut Command) -> io::Result<std::process::Output>;
}

#[derive(Debug, Default)]
pub struct SystemCommandExecutor;

#[async_trait::async_trait]
impl CommandExecutor for SystemCommandExecutor {
    async fn run(&self, command: &mut Command) -> io::Result<std::process::Output> {
        command.output().await
    }
}

/// Seam for spawning the long-running transcoder. The supervisor only
/// needs a [`Child`]; tests launch a harmless stand-in process instead
/// of ffmpeg.
pub trait ProcessLauncher: Send + Sync {
    fn launch(&self, command: &mut Command) -> io::Result<Child>;
}

#[derive(Debug, Default)]
pub struct SystemProcessLauncher;

impl ProcessLauncher for SystemProcessLauncher {
    fn launch(&self, command: &mut Command) -> io::Result<Child> {
        command.spawn()
    }
}
