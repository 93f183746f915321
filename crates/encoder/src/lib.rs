pub mod args;
pub mod config;
pub mod emit;
pub mod error;
pub mod ffmpeg;
pub mod ffprobe;
pub mod profile;
pub mod progress;

pub use args::build_args;
pub use config::EncodeConfig;
pub use emit::{Emitter, Event};
pub use error::{EncodeError, EncodeResult};
pub use ffmpeg::{run_encode, RunOutcome};
pub use ffprobe::MediaProbe;
pub use profile::TranscodeProfile;
pub use progress::{Progress, ProgressParser};
