//! Raw audio samples in, word-level transcript with timestamps out.
//!
//! **wordstamp** reads a JSON request holding PCM samples and a sample rate,
//! transcribes it with whisper.cpp (via whisper-rs, behind the `whisper`
//! feature), force-aligns the words, and writes the words, the joined text and
//! the processing time as JSON. When the engine is not compiled in, or fails at
//! any stage, a deterministic mock transcript is produced instead.
//!
//! # Quick start
//!
//! ```rust,no_run
//! # fn main() -> wordstamp::Result<()> {
//! let transcriber = wordstamp::Transcriber::new();
//! let stdin = std::io::stdin();
//! let stdout = std::io::stdout();
//! let result = wordstamp::run(stdin.lock(), stdout.lock(), &transcriber)?;
//! eprintln!("{} words", result.words.len());
//! # Ok(())
//! # }
//! ```

pub mod align;
pub mod audio;
pub mod config;
pub mod engine;
pub mod error;
pub mod mock;
pub mod model;
pub mod output;
pub mod transcribe;
pub mod types;
#[cfg(feature = "whisper")]
pub mod whisper;

pub use config::{ComputeType, Device, EngineConfig, Language, Model};
pub use engine::{probe_engine, EngineProbe};
pub use error::{Error, Result};
pub use mock::MockTranscriber;
pub use transcribe::Transcriber;
pub use types::{AudioBuffer, TranscriptResult, TranscriptSource, Word};

use std::io::{Read, Write};
use std::time::Instant;

use tracing::info;

/// Read a request from `input`, transcribe it, and write the result to `output`.
///
/// `processing_time` covers the transcription only, not parsing or writing.
/// On error nothing has been written to `output`.
pub fn run<R: Read, W: Write>(
    input: R,
    output: W,
    transcriber: &Transcriber,
) -> Result<TranscriptResult> {
    let audio = audio::read_audio(input)?;

    let started = Instant::now();
    let transcription = transcriber.transcribe(&audio);
    let processing_time = started.elapsed().as_secs_f64();

    info!(
        words = transcription.words.len(),
        source = ?transcription.source,
        processing_time = format!("{processing_time:.3}"),
        "transcript ready"
    );

    let result = TranscriptResult::new(transcription.words, processing_time, audio.sample_rate());
    output::write_result(output, &result)?;
    Ok(result)
}
