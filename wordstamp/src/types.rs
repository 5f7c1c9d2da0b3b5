use serde::{Deserialize, Serialize};

/// Confidence assigned to aligned words the aligner could not score.
pub const DEFAULT_WORD_CONFIDENCE: f32 = 0.9;

/// Raw mono samples at a known sample rate. Immutable once read.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl AudioBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Duration in seconds.
    pub fn duration(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// A single word with timing and confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    pub text: String,
    pub start: f64,
    pub end: f64,
    pub confidence: f32,
}

/// Which path produced a transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscriptSource {
    Engine,
    Mock,
}

/// Words produced by the adapter, before timing metadata is attached.
#[derive(Debug, Clone)]
pub struct Transcription {
    pub words: Vec<Word>,
    pub source: TranscriptSource,
}

/// The document written to stdout on success.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptResult {
    pub words: Vec<Word>,
    pub text: String,
    pub processing_time: f64,
    pub sample_rate: u32,
}

impl TranscriptResult {
    /// Build a result; `text` is always derived from `words`.
    pub fn new(words: Vec<Word>, processing_time: f64, sample_rate: u32) -> Self {
        let text = join_words(&words);
        Self {
            words,
            text,
            processing_time: processing_time.max(0.0),
            sample_rate,
        }
    }
}

/// Space-join word texts in order.
pub fn join_words(words: &[Word]) -> String {
    words
        .iter()
        .map(|w| w.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// A token as reported by the engine, timestamps in seconds.
///
/// `bytes` is the token's raw text. A multi-byte character may be split
/// across neighbouring tokens, so a single token is not always valid UTF-8.
#[derive(Debug, Clone, PartialEq)]
pub struct RawToken {
    pub bytes: Vec<u8>,
    pub start: f64,
    pub end: f64,
    pub probability: f32,
}

/// An engine transcription segment. `tokens` is empty when the engine
/// did not produce token-level timings.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
    pub tokens: Vec<RawToken>,
}

/// Engine transcription output.
#[derive(Debug, Clone)]
pub struct RawTranscript {
    pub segments: Vec<RawSegment>,
    /// Detected language code, if the engine reported one.
    pub language: Option<String>,
}

/// A word after forced alignment.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedWord {
    pub word: String,
    pub start: f64,
    pub end: f64,
    pub confidence: Option<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlignedSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
    pub words: Vec<AlignedWord>,
}

/// Flatten aligned words across segments into one sequence ordered by start time.
pub fn flatten_words(segments: &[AlignedSegment]) -> Vec<Word> {
    let mut words: Vec<Word> = segments
        .iter()
        .flat_map(|s| s.words.iter())
        .map(|w| Word {
            text: w.word.clone(),
            start: w.start,
            end: w.end,
            confidence: w.confidence.unwrap_or(DEFAULT_WORD_CONFIDENCE),
        })
        .collect();
    words.sort_by(|a, b| a.start.total_cmp(&b.start));
    words
}
