use std::path::Path;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Per-quality encoding profile.
///
/// `copy_codec` names the codec family that signals the input is
/// already encoded to the target; `video_options` is an ordered token
/// list inserted verbatim into the ffmpeg invocation on the transcode
/// path. All codec/quality tuning lives here, not in the builder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscodeProfile {
    pub copy_codec: String,
    pub video_options: Vec<String>,
}

impl TranscodeProfile {
    /// H.264 VAAPI profile: deinterlace, scale to 1080 lines, QP 24.
    pub fn h264_vaapi() -> Self {
        Self {
            copy_codec: "h264".to_string(),
            video_options: [
                "-vf",
                "deinterlace_vaapi,scale_vaapi=w=-2:h=1080",
                "-c:v",
                "h264_vaapi",
                "-qp",
                "24",
            ]
            .map(String::from)
            .to_vec(),
        }
    }

    /// HEVC VAAPI profile: quality-targeted rate control.
    pub fn hevc_vaapi() -> Self {
        Self {
            copy_codec: "hevc".to_string(),
            video_options: [
                "-vf",
                "deinterlace_vaapi,scale_vaapi=w=-2:h=1080",
                "-c:v",
                "hevc_vaapi",
                "-preset",
                "veryslow",
                "-vsync",
                "1",
                "-global_quality",
                "26",
                "-q:v",
                "26",
                "-qp",
                "0",
                "-b:v",
                "0",
                "-maxrate:v",
                "0",
            ]
            .map(String::from)
            .to_vec(),
        }
    }

    /// Resolve a `--profile` argument: a built-in name, or a path to a
    /// profile file. Defaults to the H.264 VAAPI profile.
    pub fn resolve(arg: Option<&str>) -> Result<Self> {
        match arg {
            None | Some("h264_vaapi") => Ok(Self::h264_vaapi()),
            Some("hevc_vaapi") => Ok(Self::hevc_vaapi()),
            Some(path) => Self::load(Path::new(path)),
        }
    }

    /// Load a profile from a file: TOML by extension, JSON otherwise.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read profile file: {}", path.display()))?;

        if path.extension().and_then(|s| s.to_str()) == Some("toml") {
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse TOML profile: {}", path.display()))
        } else {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON profile: {}", path.display()))
        }
    }
}
