use regex::Regex;

/// One recognized ffmpeg progress report, decoded from a single
/// stderr line.
#[derive(Debug, Clone, PartialEq)]
pub struct Progress {
    pub frame: u64,
    pub fps: f64,
    pub q: f64,
    pub size_bytes: u64,
    /// Elapsed media time as printed by ffmpeg (`HH:MM:SS.ff`)
    pub time: String,
    pub elapsed_secs: f64,
    pub bitrate_kbps: f64,
    /// Duplicated frames; ffmpeg omits the field on some code paths,
    /// in which case it defaults to 0.
    pub dup: u64,
    /// Dropped frames; defaults to 0 when absent.
    pub drop: u64,
    pub speed: f64,
    /// Completion fraction, elapsed time over probed duration.
    /// Deliberately unclamped: ffmpeg can report past the probed
    /// duration when the prober under-reports it.
    pub percent: f64,
    /// The raw line the report was decoded from.
    pub line: String,
}

impl Progress {
    /// Fixed-format one-line summary carried in the emitted event.
    pub fn summary(&self) -> String {
        format!(
            "frame= {} fps={} time={} bitrate={}kbps size={:.1}MB drop={} speed={}",
            self.frame,
            self.fps,
            self.time,
            self.bitrate_kbps,
            self.size_bytes as f64 / (1024.0 * 1024.0),
            self.drop,
            self.speed
        )
    }
}

/// Recognizes ffmpeg's periodic progress lines.
///
/// The stderr stream is unversioned free text, so anything that does
/// not match the pattern is ignored by design; only the progress
/// report format is structured enough to decode.
pub struct ProgressParser {
    pattern: Regex,
    duration_secs: f64,
}

impl ProgressParser {
    /// `duration_secs` is the probed media duration, the denominator
    /// for `percent`.
    pub fn new(duration_secs: f64) -> Self {
        // Example:
        // frame= 5159 fps= 11 q=29.0 size=  122624kB time=00:02:51.84 bitrate=5845.8kbits/s dup=19 drop=0 speed=0.372x
        let pattern = Regex::new(
            r"frame=\s*(?P<frame>\d+)\s+fps=\s*(?P<fps>\d+(?:\.\d+)?)\s+q=\s*(?P<q>[+-]?\d+(?:\.\d+)?)\s+L?size=\s*(?P<size>\d+(?:\.\d+)?)kB\s+time=\s*(?P<time>\d+[\d:.]*)\s+bitrate=\s*(?P<bitrate>\d+(?:\.\d+)?)kbits/s(?:\s+dup=\s*(?P<dup>\d+))?(?:\s+drop=\s*(?P<drop>\d+))?\s+speed=\s*(?P<speed>\d+(?:\.\d+)?)x",
        )
        .expect("progress pattern compiles");

        Self {
            pattern,
            duration_secs,
        }
    }

    /// Decode one line. Returns `None` for anything that is not a
    /// progress report.
    pub fn parse_line(&self, line: &str) -> Option<Progress> {
        let caps = self.pattern.captures(line)?;

        let frame = caps["frame"].parse().ok()?;
        let fps = caps["fps"].parse().ok()?;
        let q = caps["q"].parse().ok()?;
        let size_kb: f64 = caps["size"].parse().ok()?;
        let time = caps["time"].to_string();
        let bitrate_kbps = caps["bitrate"].parse().ok()?;
        let dup = match caps.name("dup") {
            Some(m) => m.as_str().parse().ok()?,
            None => 0,
        };
        let drop = match caps.name("drop") {
            Some(m) => m.as_str().parse().ok()?,
            None => 0,
        };
        let speed = caps["speed"].parse().ok()?;

        let elapsed_secs = parse_elapsed(&time)?;
        let percent = elapsed_secs / self.duration_secs;

        Some(Progress {
            frame,
            fps,
            q,
            size_bytes: (size_kb * 1024.0) as u64,
            time,
            elapsed_secs,
            bitrate_kbps,
            dup,
            drop,
            speed,
            percent,
            line: line.to_string(),
        })
    }
}

/// Convert an ffmpeg elapsed time (`H:MM:SS.ff`) to seconds.
fn parse_elapsed(time: &str) -> Option<f64> {
    let mut secs = 0.0;
    for (i, part) in time.split(':').take(3).enumerate() {
        let v: f64 = part.parse().ok()?;
        secs += match i {
            0 => v * 3600.0,
            1 => v * 60.0,
            _ => v,
        };
    }
    Some(secs)
}

/// Incremental line splitter for the child's diagnostic stream.
///
/// ffmpeg terminates periodic progress updates with `\r` and ordinary
/// log lines with `\n`; both count as line terminators here. Bytes
/// accumulate until a terminator arrives, so a report split across
/// read chunks is reassembled before decoding.
#[derive(Debug, Default)]
pub struct LineBuffer {
    partial: Vec<u8>,
}

impl LineBuffer {
    /// Feed one chunk; returns every completed line it closed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for &byte in chunk {
            match byte {
                b'\n' | b'\r' => {
                    if !self.partial.is_empty() {
                        lines.push(String::from_utf8_lossy(&self.partial).into_owned());
                        self.partial.clear();
                    }
                }
                _ => self.partial.push(byte),
            }
        }
        lines
    }

    /// Flush the trailing unterminated line once the stream closes.
    pub fn finish(&mut self) -> Option<String> {
        if self.partial.is_empty() {
            return None;
        }
        let line = String::from_utf8_lossy(&self.partial).into_owned();
        self.partial.clear();
        Some(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const SAMPLE: &str = "frame= 5159 fps= 11 q=29.0 size=  122624kB time=00:02:51.84 bitrate=5845.8kbits/s dup=19 drop=0 speed=0.372x";

    #[test]
    fn decodes_the_reference_line() {
        let parser = ProgressParser::new(1000.0);
        let p = parser.parse_line(SAMPLE).unwrap();

        assert_eq!(p.frame, 5159);
        assert_eq!(p.fps, 11.0);
        assert_eq!(p.q, 29.0);
        assert_eq!(p.size_bytes, 122624 * 1024);
        assert_eq!(p.time, "00:02:51.84");
        assert!((p.elapsed_secs - 171.84).abs() < 1e-9);
        assert_eq!(p.bitrate_kbps, 5845.8);
        assert_eq!(p.dup, 19);
        assert_eq!(p.drop, 0);
        assert_eq!(p.speed, 0.372);
        assert!((p.percent - 0.17184).abs() < 1e-9);
        assert_eq!(p.line, SAMPLE);
    }

    #[test]
    fn missing_dup_and_drop_default_to_zero() {
        let parser = ProgressParser::new(1000.0);
        let line = "frame=  100 fps= 25 q=28.0 size=    2048kB time=00:00:04.00 bitrate=4194.3kbits/s speed=1.01x";
        let p = parser.parse_line(line).unwrap();

        assert_eq!(p.dup, 0);
        assert_eq!(p.drop, 0);
        assert_eq!(p.frame, 100);
    }

    #[test]
    fn final_lsize_report_is_recognized() {
        let parser = ProgressParser::new(1000.0);
        let line = "frame= 9000 fps= 30 q=-1.0 Lsize=  500000kB time=00:05:00.00 bitrate=13653.3kbits/s speed=1.2x";
        let p = parser.parse_line(line).unwrap();
        assert_eq!(p.frame, 9000);
        assert!((p.elapsed_secs - 300.0).abs() < 1e-9);
    }

    #[test]
    fn non_progress_lines_yield_nothing() {
        let parser = ProgressParser::new(1000.0);
        for line in [
            "ffmpeg version 6.1 Copyright (c) 2000-2023 the FFmpeg developers",
            "Stream #0:0: Video: mpeg2video (Main), yuv420p(tv, bt709)",
            "[mpegts @ 0x5600] PES packet size mismatch",
            "",
            "frame=garbage",
        ] {
            assert_eq!(parser.parse_line(line), None, "line: {:?}", line);
        }
    }

    #[test]
    fn percent_is_exactly_one_at_full_duration() {
        let parser = ProgressParser::new(1000.0);
        let line = "frame= 25000 fps= 25 q=28.0 size=  100000kB time=00:16:40.00 bitrate=819.2kbits/s speed=1x";
        let p = parser.parse_line(line).unwrap();
        assert_eq!(p.percent, 1.0);
    }

    #[test]
    fn percent_past_duration_is_unclamped() {
        let parser = ProgressParser::new(100.0);
        let line = "frame= 5000 fps= 25 q=28.0 size=  100000kB time=00:03:20.00 bitrate=819.2kbits/s speed=1x";
        let p = parser.parse_line(line).unwrap();
        assert!(p.percent > 1.0);
        assert!((p.percent - 2.0).abs() < 1e-9);
    }

    #[test]
    fn summary_matches_fixed_format() {
        let parser = ProgressParser::new(1000.0);
        let p = parser.parse_line(SAMPLE).unwrap();
        assert_eq!(
            p.summary(),
            "frame= 5159 fps=11 time=00:02:51.84 bitrate=5845.8kbps size=119.8MB drop=0 speed=0.372"
        );
    }

    #[test]
    fn line_buffer_splits_on_both_terminators() {
        let mut buf = LineBuffer::default();
        let lines = buf.push(b"first log line\nframe= 1 ...\rpartial");
        assert_eq!(lines, vec!["first log line", "frame= 1 ..."]);
        assert_eq!(buf.finish().as_deref(), Some("partial"));
        assert_eq!(buf.finish(), None);
    }

    #[test]
    fn line_buffer_reassembles_across_chunks() {
        let mut buf = LineBuffer::default();
        assert!(buf.push(b"frame= 10 fps= 5").is_empty());
        let lines = buf.push(b" q=2.0 ...\r");
        assert_eq!(lines, vec!["frame= 10 fps= 5 q=2.0 ..."]);
    }

    #[test]
    fn elapsed_time_arithmetic() {
        assert_eq!(parse_elapsed("01:02:03.5"), Some(3723.5));
        assert_eq!(parse_elapsed("00:00:00.00"), Some(0.0));
        assert_eq!(parse_elapsed("garbage"), None);
    }

    proptest! {
        /// Percent is monotonically non-decreasing over a sequence of
        /// reports with non-decreasing elapsed time (a property of the
        /// arithmetic, not something the parser enforces).
        #[test]
        fn percent_is_monotone_in_elapsed_time(
            mut seconds in proptest::collection::vec(0u32..36_000, 1..20),
        ) {
            seconds.sort_unstable();
            let parser = ProgressParser::new(1800.0);

            let mut last = f64::NEG_INFINITY;
            for s in seconds {
                let line = format!(
                    "frame= {f} fps= 30 q=28.0 size=  1024kB time={h:02}:{m:02}:{sec:02}.00 bitrate=100.0kbits/s speed=1x",
                    f = s,
                    h = s / 3600,
                    m = (s % 3600) / 60,
                    sec = s % 60,
                );
                let p = parser.parse_line(&line).expect("well-formed report");
                prop_assert!(p.percent >= last);
                last = p.percent;
            }
        }
    }
}
