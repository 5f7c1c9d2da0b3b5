use tracing::debug;

use crate::config::{Device, Language};
use crate::engine::AlignModel;
use crate::error::{Error, Result};
use crate::types::{AlignedSegment, AlignedWord, RawSegment, RawToken};

/// Per-language alignment settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignMetadata {
    pub language: Language,
    /// When false every token is its own word.
    pub word_delimited: bool,
}

impl AlignMetadata {
    pub fn for_language(code: &str) -> Result<Self> {
        let language = Language::new(code)?;
        Ok(Self {
            word_delimited: language.is_word_delimited(),
            language,
        })
    }
}

/// Aligns words using the engine's token timestamps.
///
/// Sub-word tokens are merged into words: a token that starts with whitespace
/// opens a new word, anything else is glued onto the current one. In languages
/// without spaces every character is its own word; tokens carrying pieces of
/// one character are merged until the bytes decode. Special tokens (`[_BEG_]`,
/// `<|endoftext|>`, ...) are dropped. A word's confidence is the mean
/// probability of its tokens.
///
/// Segments without token timings get their words spread evenly over the
/// segment span, with no confidence.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenAligner;

impl AlignModel for TokenAligner {
    fn align(
        &self,
        segments: &[RawSegment],
        metadata: &AlignMetadata,
        audio: &[f32],
        device: Device,
    ) -> Result<Vec<AlignedSegment>> {
        let audio_end = audio.len() as f64 / crate::audio::ENGINE_SAMPLE_RATE as f64;
        debug!(
            segments = segments.len(),
            language = %metadata.language,
            %device,
            "aligning segments"
        );

        segments
            .iter()
            .map(|segment| {
                if segment.start > segment.end {
                    return Err(Error::Alignment(format!(
                        "segment ends before it starts ({:.2}s > {:.2}s)",
                        segment.start, segment.end
                    )));
                }

                let mut words = if segment.tokens.is_empty() {
                    interpolate_words(segment, metadata.word_delimited)
                } else {
                    merge_tokens(&segment.tokens, metadata.word_delimited)
                };
                for word in &mut words {
                    word.start = word.start.clamp(0.0, audio_end);
                    word.end = word.end.clamp(word.start, audio_end);
                }

                Ok(AlignedSegment {
                    start: segment.start,
                    end: segment.end,
                    text: segment.text.trim().to_string(),
                    words,
                })
            })
            .collect()
    }
}

fn is_special(token: &[u8]) -> bool {
    matches!(token.first(), Some(b'[' | b'<'))
}

struct WordBuilder {
    bytes: Vec<u8>,
    start: f64,
    end: f64,
    probability_sum: f32,
    scored: usize,
}

impl WordBuilder {
    fn new(token: &RawToken) -> Self {
        let mut builder = Self {
            bytes: Vec::new(),
            start: token.start,
            end: token.end,
            probability_sum: 0.0,
            scored: 0,
        };
        builder.push(token);
        builder
    }

    fn push(&mut self, token: &RawToken) {
        self.bytes.extend_from_slice(token.bytes.trim_ascii());
        self.end = self.end.max(token.end);
        if token.probability.is_finite() {
            self.probability_sum += token.probability.clamp(0.0, 1.0);
            self.scored += 1;
        }
    }

    /// False while the bytes end inside a multi-byte character.
    fn is_complete(&self) -> bool {
        match std::str::from_utf8(&self.bytes) {
            Ok(_) => true,
            Err(e) => e.error_len().is_some(),
        }
    }

    fn finish(self) -> AlignedWord {
        let confidence = (self.scored > 0).then(|| self.probability_sum / self.scored as f32);
        AlignedWord {
            word: String::from_utf8_lossy(&self.bytes).trim().to_string(),
            start: self.start,
            end: self.end,
            confidence,
        }
    }
}

fn merge_tokens(tokens: &[RawToken], word_delimited: bool) -> Vec<AlignedWord> {
    let mut words = Vec::new();
    let mut current: Option<WordBuilder> = None;

    for token in tokens {
        let trimmed = token.bytes.trim_ascii();
        if trimmed.is_empty() || is_special(trimmed) {
            continue;
        }

        let opens_word = if word_delimited {
            token.bytes.first().is_some_and(u8::is_ascii_whitespace)
        } else {
            current.as_ref().is_none_or(WordBuilder::is_complete)
        };
        match current.as_mut() {
            Some(word) if !opens_word => word.push(token),
            _ => {
                if let Some(done) = current.replace(WordBuilder::new(token)) {
                    words.push(done.finish());
                }
            }
        }
    }

    if let Some(done) = current {
        words.push(done.finish());
    }
    words
}

fn interpolate_words(segment: &RawSegment, word_delimited: bool) -> Vec<AlignedWord> {
    let pieces: Vec<String> = if word_delimited {
        segment.text.split_whitespace().map(str::to_string).collect()
    } else {
        segment
            .text
            .chars()
            .filter(|c| !c.is_whitespace())
            .map(String::from)
            .collect()
    };
    if pieces.is_empty() {
        return Vec::new();
    }

    let step = (segment.end - segment.start) / pieces.len() as f64;
    pieces
        .into_iter()
        .enumerate()
        .map(|(i, word)| AlignedWord {
            word,
            start: segment.start + step * i as f64,
            end: segment.start + step * (i + 1) as f64,
            confidence: None,
        })
        .collect()
}
