use std::env;
use std::path::PathBuf;
use anyhow::{Context, Result};

/// `-analyzeduration` hint passed to ffmpeg. Sized for transport
/// streams coming out of a tuner; adjust to the recorder settings.
pub const ANALYZE_DURATION: &str = "10M";
/// `-probesize` hint passed to ffmpeg.
pub const PROBE_SIZE: &str = "32M";

/// Immutable configuration for a single encode run, built once at
/// startup from the environment the recorder hands us.
#[derive(Debug, Clone)]
pub struct EncodeConfig {
    /// Path to the ffmpeg binary (`FFMPEG`)
    pub ffmpeg_bin: PathBuf,
    /// Path to the ffprobe binary (`FFPROBE`)
    pub ffprobe_bin: PathBuf,
    /// Source media file (`INPUT`)
    pub input: PathBuf,
    /// Destination file (`OUTPUT`)
    pub output: PathBuf,
    /// Broadcast audio component type (`AUDIOCOMPONENTTYPE`); 2 marks
    /// a dual mono track
    pub audio_component_type: Option<u32>,
}

impl EncodeConfig {
    /// Load the run configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            ffmpeg_bin: required("FFMPEG")?.into(),
            ffprobe_bin: required("FFPROBE")?.into(),
            input: required("INPUT")?.into(),
            output: required("OUTPUT")?.into(),
            audio_component_type: env::var("AUDIOCOMPONENTTYPE")
                .ok()
                .and_then(|v| v.parse().ok()),
        })
    }

    /// True when the input carries a dual mono audio track (two
    /// independent mono signals in one stereo-coded stream).
    pub fn is_dual_mono(&self) -> bool {
        self.audio_component_type == Some(2)
    }
}

fn required(name: &str) -> Result<String> {
    env::var(name).with_context(|| format!("environment variable {} is not set", name))
}
