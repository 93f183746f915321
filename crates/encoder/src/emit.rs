use std::io::Write;
use serde::Serialize;

use crate::error::EncodeResult;
use crate::progress::Progress;

/// One event on the machine-readable stdout stream. Everything else
/// (diagnostics, ffmpeg pass-through) goes to the log channel.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    Progress { percent: f64, log: String },
    Success,
    Failure { log: String },
}

impl Event {
    pub fn progress(p: &Progress) -> Self {
        Event::Progress {
            percent: p.percent,
            log: p.summary(),
        }
    }
}

/// Writes newline-delimited JSON events, one compact object per line,
/// in the order they are handed in.
pub struct Emitter<W: Write> {
    out: W,
}

impl<W: Write> Emitter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn emit(&mut self, event: &Event) -> EncodeResult<()> {
        serde_json::to_writer(&mut self.out, event)?;
        self.out.write_all(b"\n")?;
        self.out.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
