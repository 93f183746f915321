use std::path::Path;
use log::debug;

use crate::config::{ANALYZE_DURATION, PROBE_SIZE};
use crate::ffprobe::MediaProbe;
use crate::profile::TranscodeProfile;

/// Build the complete ffmpeg argument vector for one run.
///
/// Pure function of its inputs. If any probed stream is already in the
/// profile's copy codec the streams are repackaged without re-encoding;
/// repeated invocations over already-converted files stay cheap.
pub fn build_args(
    probe: &MediaProbe,
    profile: &TranscodeProfile,
    dual_mono: bool,
    input: &Path,
    output: &Path,
) -> Vec<String> {
    let mut args: Vec<String> = [
        "-y",
        "-analyzeduration",
        ANALYZE_DURATION,
        "-probesize",
        PROBE_SIZE,
        "-fflags",
        "+discardcorrupt",
    ]
    .map(String::from)
    .to_vec();

    if probe.has_codec(&profile.copy_codec) {
        // Already in the target codec family: copy both streams.
        args.push("-i".to_string());
        args.push(input.to_string_lossy().into_owned());

        args.extend(["-c:v", "copy", "-c:a", "copy"].map(String::from));
    } else {
        // Hardware acceleration setup
        args.extend(
            [
                "-hwaccel",
                "vaapi",
                "-hwaccel_device",
                "/dev/dri/card0",
                "-hwaccel_output_format",
                "vaapi",
            ]
            .map(String::from),
        );

        args.push("-i".to_string());
        args.push(input.to_string_lossy().into_owned());

        // Metadata up front, unknown streams dropped
        args.extend(["-movflags", "faststart", "-ignore_unknown"].map(String::from));

        // Video tuning comes verbatim from the profile
        args.extend(profile.video_options.iter().cloned());

        if dual_mono {
            // Split the dual mono track into two tagged mono streams
            args.extend(
                [
                    "-filter_complex",
                    "channelsplit[FL][FR]",
                    "-map",
                    "0:v",
                    "-map",
                    "[FL]",
                    "-map",
                    "[FR]",
                    "-metadata:s:a:0",
                    "language=jpn",
                    "-metadata:s:a:1",
                    "language=eng",
                    "-c:a",
                    "ac3",
                    "-ar",
                    "48000",
                    "-ab",
                    "256k",
                ]
                .map(String::from),
            );
        } else {
            // Copy audio; ADTS-framed AAC needs reframing for mp4
            args.extend(["-c:a", "copy", "-bsf:a", "aac_adtstoasc"].map(String::from));
        }
    }

    args.push("-f".to_string());
    args.push("mp4".to_string());
    args.push(output.to_string_lossy().into_owned());

    debug!("ffmpeg args: {}", args.join(" "));

    args
}
