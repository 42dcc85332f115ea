//! FFmpeg invocation building and capability probing.

use std::path::Path;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, warn};

use crate::guide::MANIFEST_NAME;
use crate::library::{StreamSettings, TranscodePreset};

use super::CommandExecutor;

const ENCODER_PROBE_TIMEOUT: Duration = Duration::from_secs(5);
const DURATION_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Hardware acceleration available on this host. A process-wide fact:
/// probe once at startup and pass the result down, never per stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccelMode {
    Qsv,
    Nvenc,
    Software,
}

impl AccelMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccelMode::Qsv => "qsv",
            AccelMode::Nvenc => "nvenc",
            AccelMode::Software => "software",
        }
    }
}

/// Runs `ffmpeg -encoders` and scans the listing for hardware encoder
/// names. Any failure (missing binary, timeout) degrades to software.
pub async fn detect_acceleration(executor: &dyn CommandExecutor, ffmpeg_path: &str) -> AccelMode {
    let mut command = Command::new(ffmpeg_path);
    command.arg("-hide_banner").arg("-encoders");

    let output = match tokio::time::timeout(ENCODER_PROBE_TIMEOUT, executor.run(&mut command)).await
    {
        Ok(Ok(output)) => output,
        Ok(Err(error)) => {
            warn!(%error, "encoder probe failed, assuming software encoding");
            return AccelMode::Software;
        }
        Err(_) => {
            warn!("encoder probe timed out, assuming software encoding");
            return AccelMode::Software;
        }
    };

    let listing = format!(
        "{}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    let mode = if listing.contains("h264_qsv") {
        AccelMode::Qsv
    } else if listing.contains("h264_nvenc") {
        AccelMode::Nvenc
    } else {
        AccelMode::Software
    };
    debug!(mode = mode.as_str(), "hardware acceleration detected");
    mode
}

/// Effective preset after checking the hardware actually supports the
/// requested path; hardware presets degrade to software_fast.
fn effective_preset(requested: TranscodePreset, accel: AccelMode) -> TranscodePreset {
    match (requested, accel) {
        (TranscodePreset::Qsv, AccelMode::Qsv) => TranscodePreset::Qsv,
        (TranscodePreset::Nvenc, AccelMode::Nvenc) => TranscodePreset::Nvenc,
        (TranscodePreset::Qsv | TranscodePreset::Nvenc, _) => TranscodePreset::SoftwareFast,
        (software, _) => software,
    }
}

/// Builds the argument list for one live HLS transcode.
///
/// The seek is applied before `-i` (coarse input seek): startup is
/// fast at the cost of up to one keyframe interval of positioning
/// inaccuracy. `omit_endlist` keeps the manifest live forever; the
/// rolling window deletes old segments as new ones land.
pub fn build_hls_command(
    input_file: &str,
    output_dir: &Path,
    seek: f64,
    settings: &StreamSettings,
    accel: AccelMode,
    log_level: &str,
) -> std::io::Result<Vec<String>> {
    std::fs::create_dir_all(output_dir)?;

    let mut args: Vec<String> = vec![
        "-hide_banner".into(),
        "-loglevel".into(),
        log_level.into(),
        "-re".into(),
    ];

    if seek > 0.0 {
        args.push("-ss".into());
        args.push(format!("{seek:.3}"));
    }
    args.push("-i".into());
    args.push(input_file.into());

    match effective_preset(settings.transcode_preset, accel) {
        TranscodePreset::Qsv => {
            args.extend(["-c:v".into(), "h264_qsv".into()]);
            args.extend(["-preset".into(), "veryfast".into()]);
            args.extend(["-global_quality".into(), "23".into()]);
        }
        TranscodePreset::Nvenc => {
            args.extend(["-c:v".into(), "h264_nvenc".into()]);
            args.extend(["-preset".into(), "fast".into()]);
            args.extend(["-cq".into(), "23".into()]);
        }
        TranscodePreset::SoftwareMedium => {
            args.extend(["-c:v".into(), "libx264".into()]);
            args.extend(["-preset".into(), "medium".into()]);
            args.extend(["-crf".into(), "23".into()]);
        }
        TranscodePreset::SoftwareFast => {
            args.extend(["-c:v".into(), "libx264".into()]);
            args.extend(["-preset".into(), "veryfast".into()]);
            args.extend(["-crf".into(), "23".into()]);
        }
    }

    args.extend(["-maxrate".into(), format!("{}k", settings.video_bitrate)]);
    args.extend(["-bufsize".into(), format!("{}k", settings.video_bitrate * 2)]);

    if !settings.resolution.is_empty() && settings.resolution != "original" {
        args.extend(["-s".into(), settings.resolution.clone()]);
    }

    // Audio is always normalized to AAC at a fixed sample rate.
    args.extend(["-c:a".into(), "aac".into()]);
    args.extend(["-b:a".into(), format!("{}k", settings.audio_bitrate)]);
    args.extend(["-ar".into(), "48000".into()]);

    args.extend(["-f".into(), "hls".into()]);
    args.extend(["-hls_time".into(), settings.segment_duration.to_string()]);
    args.extend(["-hls_list_size".into(), settings.playlist_size.to_string()]);
    args.extend(["-hls_flags".into(), "delete_segments+omit_endlist".into()]);
    args.extend(["-hls_segment_type".into(), "mpegts".into()]);
    args.extend([
        "-hls_segment_filename".into(),
        output_dir.join("segment_%03d.ts").to_string_lossy().into_owned(),
    ]);
    args.push(output_dir.join(MANIFEST_NAME).to_string_lossy().into_owned());

    Ok(args)
}

/// Asks ffprobe for a file's duration. Bounded and fail-soft: any
/// failure is reported as an unknown duration, never an error.
pub async fn probe_duration(
    executor: &dyn CommandExecutor,
    ffprobe_path: &str,
    file_path: &str,
) -> Option<f64> {
    let mut command = Command::new(ffprobe_path);
    command
        .arg("-v")
        .arg("error")
        .arg("-show_entries")
        .arg("format=duration")
        .arg("-of")
        .arg("json")
        .arg(file_path);

    let output = match tokio::time::timeout(DURATION_PROBE_TIMEOUT, executor.run(&mut command)).await
    {
        Ok(Ok(output)) if output.status.success() => output,
        Ok(Ok(output)) => {
            debug!(
                file = file_path,
                status = output.status.code(),
                "ffprobe returned an error"
            );
            return None;
        }
        Ok(Err(error)) => {
            debug!(file = file_path, %error, "ffprobe could not be run");
            return None;
        }
        Err(_) => {
            debug!(file = file_path, "ffprobe timed out");
            return None;
        }
    };

    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).ok()?;
    parsed
        .get("format")?
        .get("duration")?
        .as_str()?
        .parse::<f64>()
        .ok()
}
