use std::future::Future;
use std::io::Write;
use std::pin::pin;
use std::process::Stdio;
use std::time::Duration;

use log::{debug, info, warn};
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};

use crate::config::EncodeConfig;
use crate::emit::{Emitter, Event};
use crate::error::{EncodeError, EncodeResult};
use crate::progress::{LineBuffer, ProgressParser};

/// How long the child gets to wind down after SIGINT before it is
/// killed outright.
const INT_GRACE: Duration = Duration::from_secs(10);

/// Terminal state of one supervised run.
#[derive(Debug)]
pub enum RunOutcome {
    Success,
    Failure(EncodeError),
    Cancelled,
}

/// Spawn ffmpeg with `args` and supervise it to completion.
///
/// The child's stderr is pumped through the progress parser as it
/// arrives; every recognized report becomes one emitted event. Ctrl-C
/// forwards SIGINT to the child and resolves the run as `Cancelled`.
/// The stderr stream is always drained before the outcome is
/// finalized, so no trailing progress line is lost.
pub async fn run_encode<W: Write>(
    cfg: &EncodeConfig,
    args: &[String],
    duration_secs: f64,
    emitter: &mut Emitter<W>,
) -> EncodeResult<RunOutcome> {
    debug!("spawning: {} {}", cfg.ffmpeg_bin.display(), args.join(" "));

    let mut child = Command::new(&cfg.ffmpeg_bin)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| EncodeError::Spawn {
            bin: cfg.ffmpeg_bin.clone(),
            source,
        })?;

    let stderr = child.stderr.take().ok_or_else(|| {
        EncodeError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            "ffmpeg stderr was not captured",
        ))
    })?;

    let parser = ProgressParser::new(duration_secs);
    let cancel = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    supervise(child, stderr, &parser, emitter, cancel).await
}

/// Core supervision loop, generic over the diagnostic stream and the
/// cancellation signal so tests can inject both.
async fn supervise<R, W, C>(
    mut child: Child,
    stderr: R,
    parser: &ProgressParser,
    emitter: &mut Emitter<W>,
    cancel: C,
) -> EncodeResult<RunOutcome>
where
    R: AsyncRead + Unpin,
    W: Write,
    C: Future<Output = ()>,
{
    let mut pump = pin!(pump_progress(stderr, parser, emitter));
    let mut pump_done = false;
    let mut cancel = pin!(cancel);

    let status = loop {
        tokio::select! {
            res = &mut pump, if !pump_done => {
                res?;
                pump_done = true;
            }
            status = child.wait() => {
                break status?;
            }
            _ = &mut cancel => {
                info!("interrupt received, forwarding SIGINT to ffmpeg");
                interrupt(&child);

                match tokio::time::timeout(INT_GRACE, child.wait()).await {
                    Ok(res) => {
                        res?;
                    }
                    Err(_) => {
                        warn!("ffmpeg ignored SIGINT for {:?}, killing it", INT_GRACE);
                        child.kill().await?;
                    }
                }
                if !pump_done {
                    pump.await?;
                }
                return Ok(RunOutcome::Cancelled);
            }
        }
    };

    // The child can exit while stderr still holds buffered progress
    // lines; drain them before the outcome is finalized.
    if !pump_done {
        pump.await?;
    }

    if status.success() {
        Ok(RunOutcome::Success)
    } else {
        Ok(RunOutcome::Failure(EncodeError::FfmpegExit {
            code: status.code(),
        }))
    }
}

/// Deliver SIGINT to the child, as if it had received Ctrl-C itself;
/// ffmpeg finalizes the output file on SIGINT.
fn interrupt(child: &Child) {
    if let Some(pid) = child.id() {
        if let Err(e) = signal::kill(Pid::from_raw(pid as i32), Signal::SIGINT) {
            warn!("failed to signal ffmpeg (pid {}): {}", pid, e);
        }
    }
}

/// Read the diagnostic stream to exhaustion: split it into lines, log
/// every line, emit an event for each recognized progress report.
async fn pump_progress<R, W>(
    mut stream: R,
    parser: &ProgressParser,
    emitter: &mut Emitter<W>,
) -> EncodeResult<()>
where
    R: AsyncRead + Unpin,
    W: Write,
{
    let mut buffer = LineBuffer::default();
    let mut chunk = [0u8; 4096];

    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        for line in buffer.push(&chunk[..n]) {
            handle_line(&line, parser, emitter)?;
        }
    }
    if let Some(line) = buffer.finish() {
        handle_line(&line, parser, emitter)?;
    }

    Ok(())
}

fn handle_line<W: Write>(
    line: &str,
    parser: &ProgressParser,
    emitter: &mut Emitter<W>,
) -> EncodeResult<()> {
    // Recognized or not, every line goes to the log channel.
    debug!(target: "ffmpeg", "{}", line);

    if let Some(progress) = parser.parse_line(line) {
        emitter.emit(&Event::progress(&progress))?;
    }
    Ok(())
}
