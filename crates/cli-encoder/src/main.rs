use anyhow::{Context, Result};
use clap::Parser;
use encoder::{
    build_args, ffprobe, run_encode, EncodeConfig, Emitter, Event, RunOutcome, TranscodeProfile,
};
use log::{error, info};

/// Single-run transcode orchestrator. Reads its run parameters from
/// the environment (FFMPEG, FFPROBE, INPUT, OUTPUT,
/// AUDIOCOMPONENTTYPE) and writes newline-delimited JSON progress
/// events to stdout.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Encoding profile: a built-in name (h264_vaapi, hevc_vaapi) or a
    /// path to a TOML/JSON profile file
    #[arg(short, long)]
    profile: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries only the event stream
    env_logger::Builder::from_default_env()
        .format_timestamp_secs()
        .init();

    let args = Args::parse();

    let cfg = EncodeConfig::from_env().context("Failed to load configuration")?;
    let profile = TranscodeProfile::resolve(args.profile.as_deref())
        .context("Failed to load encoding profile")?;

    info!(
        "encoding {} -> {}",
        cfg.input.display(),
        cfg.output.display()
    );
    info!(
        "profile: copy codec {}, {} video option tokens, dual mono: {}",
        profile.copy_codec,
        profile.video_options.len(),
        cfg.is_dual_mono()
    );

    let probe = ffprobe::probe_file(&cfg, &cfg.input).await?;
    info!(
        "probed duration {:.3}s, codecs: {:?}",
        probe.duration, probe.codecs
    );

    let argv = build_args(&probe, &profile, cfg.is_dual_mono(), &cfg.input, &cfg.output);

    let mut emitter = Emitter::new(std::io::stdout());
    match run_encode(&cfg, &argv, probe.duration, &mut emitter).await? {
        RunOutcome::Success => {
            emitter.emit(&Event::Success)?;
            info!("encode finished: {}", cfg.output.display());
            Ok(())
        }
        RunOutcome::Cancelled => {
            info!("encode cancelled");
            std::process::exit(130);
        }
        RunOutcome::Failure(e) => {
            emitter.emit(&Event::Failure { log: e.to_string() })?;
            error!("encode failed: {}", e);
            Err(e.into())
        }
    }
}
