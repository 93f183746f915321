use std::path::Path;
use log::debug;
use serde::Deserialize;
use tokio::process::Command;

use crate::config::EncodeConfig;
use crate::error::{EncodeError, EncodeResult};

/// Everything one ffprobe pass yields for the run: the container
/// duration and every stream's codec name, in stream order.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaProbe {
    /// Duration in seconds, always positive. Denominator for the
    /// progress percent computation.
    pub duration: f64,
    /// Codec name per declared stream. A stream without a codec name
    /// contributes an empty string so stream order stays intact.
    pub codecs: Vec<String>,
}

impl MediaProbe {
    /// True when any stream is already encoded in `codec`, which makes
    /// re-encoding redundant.
    pub fn has_codec(&self, codec: &str) -> bool {
        self.codecs.iter().any(|c| c == codec)
    }
}

/// ffprobe JSON output, trimmed to the fields we read.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_name: Option<String>,
}

/// Run ffprobe once against `path` and parse its JSON output.
pub async fn probe_file(cfg: &EncodeConfig, path: &Path) -> EncodeResult<MediaProbe> {
    let output = Command::new(&cfg.ffprobe_bin)
        .args(["-v", "0", "-show_format", "-show_streams", "-of", "json"])
        .arg(path)
        .output()
        .await
        .map_err(|e| {
            EncodeError::Probe(format!(
                "failed to execute {}: {}",
                cfg.ffprobe_bin.display(),
                e
            ))
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(EncodeError::Probe(format!(
            "ffprobe exited with {:?} for {}: {}",
            output.status.code(),
            path.display(),
            stderr.trim()
        )));
    }

    parse_probe_output(&output.stdout)
}

fn parse_probe_output(stdout: &[u8]) -> EncodeResult<MediaProbe> {
    let parsed: FfprobeOutput = serde_json::from_slice(stdout)
        .map_err(|e| EncodeError::Probe(format!("unparsable ffprobe output: {}", e)))?;

    let duration = parsed
        .format
        .duration
        .as_deref()
        .and_then(|d| d.parse::<f64>().ok())
        .ok_or_else(|| EncodeError::Probe("ffprobe output has no format.duration".to_string()))?;

    if !(duration > 0.0) {
        return Err(EncodeError::Probe(format!(
            "ffprobe reported a non-positive duration: {}",
            duration
        )));
    }

    let codecs = parsed
        .streams
        .iter()
        .map(|s| s.codec_name.clone().unwrap_or_default())
        .collect();

    let probe = MediaProbe { duration, codecs };
    debug!("probe result: {:?}", probe);

    Ok(probe)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_duration_and_codecs_in_stream_order() {
        let json = br#"{
            "streams": [
                {"index": 0, "codec_name": "mpeg2video", "codec_type": "video"},
                {"index": 1, "codec_name": "aac", "codec_type": "audio"},
                {"index": 2, "codec_type": "data"}
            ],
            "format": {"filename": "in.m2ts", "duration": "1754.321000"}
        }"#;

        let probe = parse_probe_output(json).unwrap();
        assert!((probe.duration - 1754.321).abs() < 1e-9);
        assert_eq!(probe.codecs, vec!["mpeg2video", "aac", ""]);
        assert!(probe.has_codec("aac"));
        assert!(!probe.has_codec("h264"));
    }

    #[test]
    fn missing_duration_is_a_probe_failure() {
        let json = br#"{"streams": [], "format": {"filename": "x"}}"#;
        let err = parse_probe_output(json).unwrap_err();
        assert!(matches!(err, EncodeError::Probe(_)));
        assert!(err.to_string().contains("format.duration"));
    }

    #[test]
    fn unparsable_duration_is_a_probe_failure() {
        let json = br#"{"streams": [], "format": {"duration": "N/A"}}"#;
        assert!(parse_probe_output(json).is_err());
    }

    #[test]
    fn non_positive_duration_is_a_probe_failure() {
        let json = br#"{"streams": [], "format": {"duration": "0.0"}}"#;
        assert!(parse_probe_output(json).is_err());
    }

    #[test]
    fn garbage_output_is_a_probe_failure() {
        assert!(parse_probe_output(b"not json at all").is_err());
    }

    #[tokio::test]
    async fn missing_binary_is_a_probe_failure() {
        let cfg = EncodeConfig {
            ffmpeg_bin: "/nonexistent/ffmpeg".into(),
            ffprobe_bin: "/nonexistent/ffprobe".into(),
            input: "/rec/in.m2ts".into(),
            output: "/rec/out.mp4".into(),
            audio_component_type: None,
        };

        let err = probe_file(&cfg, &cfg.input).await.unwrap_err();
        assert!(matches!(err, EncodeError::Probe(_)));
    }
}
