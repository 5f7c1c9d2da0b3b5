use std::time::Duration;

use rand::Rng;
use tracing::info;

use crate::types::{AudioBuffer, Word};

/// Placeholder vocabulary, emitted in order.
pub const MOCK_VOCABULARY: [&str; 9] = [
    "hello",
    "world",
    "this",
    "is",
    "a",
    "test",
    "of",
    "speech",
    "recognition",
];

/// Spacing between mock word onsets, in seconds.
pub const MOCK_WORD_SPACING: f64 = 0.3;
/// Length of each mock word, in seconds.
pub const MOCK_WORD_LENGTH: f64 = 0.2;

const MOCK_MIN_CONFIDENCE: f32 = 0.85;
/// Largest f32 below 1.0.
const MOCK_MAX_CONFIDENCE: f32 = 1.0 - f32::EPSILON / 2.0;
const CONFIDENCE_DRAWS: usize = 4;
const MOCK_DELAY: Duration = Duration::from_secs(1);

/// Deterministic stand-in for the real engine.
///
/// Word count and timing depend only on the audio duration; the only
/// nondeterminism is the confidence draw. Sleeps before returning to
/// mimic real processing cost.
#[derive(Debug, Clone)]
pub struct MockTranscriber {
    delay: Duration,
}

impl Default for MockTranscriber {
    fn default() -> Self {
        Self { delay: MOCK_DELAY }
    }
}

impl MockTranscriber {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the simulated latency.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn transcribe(&self, audio: &AudioBuffer) -> Vec<Word> {
        info!(
            samples = audio.samples().len(),
            sample_rate = audio.sample_rate(),
            "mock transcribing audio"
        );

        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }

        mock_words(audio.duration(), &mut rand::rng())
    }
}

/// Number of mock words for `duration` seconds of audio.
pub fn mock_word_count(duration: f64) -> usize {
    if !duration.is_finite() || duration <= 0.0 {
        return 0;
    }
    let slots = (duration / MOCK_WORD_SPACING).floor();
    (slots as usize).min(MOCK_VOCABULARY.len())
}

/// Generate evenly spaced placeholder words covering `duration` seconds.
pub fn mock_words<R: Rng>(duration: f64, rng: &mut R) -> Vec<Word> {
    (0..mock_word_count(duration))
        .map(|i| {
            let start = i as f64 * MOCK_WORD_SPACING;
            Word {
                text: MOCK_VOCABULARY[i].to_string(),
                start,
                end: start + MOCK_WORD_LENGTH,
                confidence: mock_confidence(rng),
            }
        })
        .collect()
}

/// A confidence in [0.85, 1.0).
///
/// rand's float range sampling can round up to the upper bound, so draws of
/// 1.0 are rejected.
fn mock_confidence<R: Rng>(rng: &mut R) -> f32 {
    for _ in 0..CONFIDENCE_DRAWS {
        let confidence = rng.random_range(MOCK_MIN_CONFIDENCE..1.0);
        if confidence < 1.0 {
            return confidence;
        }
    }
    MOCK_MAX_CONFIDENCE
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::{RngCore, SeedableRng};

    use super::*;
    use crate::types::join_words;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn test_one_second_yields_three_words() {
        let words = mock_words(1.0, &mut rng());
        let texts: Vec<&str> = words.iter().map(|w| w.text.as_str()).collect();
        assert_eq!(texts, ["hello", "world", "this"]);
        assert!((words[0].start - 0.0).abs() < 1e-9);
        assert!((words[1].start - 0.3).abs() < 1e-9);
        assert!((words[2].start - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_word_count_formula() {
        assert_eq!(mock_word_count(0.0), 0);
        assert_eq!(mock_word_count(0.29), 0);
        assert_eq!(mock_word_count(0.3), 1);
        assert_eq!(mock_word_count(1.0), 3);
        assert_eq!(mock_word_count(2.0), 6);
        assert_eq!(mock_word_count(2.8), 9);
        assert_eq!(mock_word_count(60.0), 9);
    }

    #[test]
    fn test_word_count_degenerate_durations() {
        assert_eq!(mock_word_count(f64::NAN), 0);
        assert_eq!(mock_word_count(f64::INFINITY), 0);
        assert_eq!(mock_word_count(-1.0), 0);
    }

    #[test]
    fn test_timing_grid() {
        let words = mock_words(10.0, &mut rng());
        assert_eq!(words.len(), 9);
        for (i, w) in words.iter().enumerate() {
            assert_eq!(w.start, i as f64 * 0.3);
            assert_eq!(w.end, w.start + 0.2);
        }
    }

    #[test]
    fn test_confidence_range() {
        let mut rng = rng();
        for _ in 0..200 {
            for w in mock_words(5.0, &mut rng) {
                assert!(
                    w.confidence >= 0.85 && w.confidence < 1.0,
                    "confidence {} out of range",
                    w.confidence
                );
            }
        }
    }

    /// Always yields the maximal draw.
    struct MaxRng;

    impl RngCore for MaxRng {
        fn next_u32(&mut self) -> u32 {
            u32::MAX
        }

        fn next_u64(&mut self) -> u64 {
            u64::MAX
        }

        fn fill_bytes(&mut self, dst: &mut [u8]) {
            dst.fill(0xff);
        }
    }

    #[test]
    fn test_confidence_below_one_on_maximal_draw() {
        let words = mock_words(1.0, &mut MaxRng);
        assert_eq!(words.len(), 3);
        for w in words {
            assert!(w.confidence < 1.0, "confidence {}", w.confidence);
            assert!(w.confidence >= 0.85);
        }
    }

    #[test]
    fn test_max_confidence_is_below_one() {
        assert!(MOCK_MAX_CONFIDENCE < 1.0);
        assert!(MOCK_MAX_CONFIDENCE > 0.999_999);
    }

    #[test]
    fn test_words_join_into_sentence() {
        let words = mock_words(3.0, &mut rng());
        assert_eq!(
            join_words(&words),
            "hello world this is a test of speech recognition"
        );
    }

    #[test]
    fn test_transcribe_uses_buffer_duration() {
        let mock = MockTranscriber::new().with_delay(Duration::ZERO);
        let audio = AudioBuffer::new(vec![0.0; 8_000], 8_000);
        let words = mock.transcribe(&audio);
        assert_eq!(words.len(), 3);
    }

    #[test]
    fn test_default_delay_is_one_second() {
        assert_eq!(MockTranscriber::new().delay(), Duration::from_secs(1));
    }

    #[test]
    fn test_transcribe_sleeps() {
        let mock = MockTranscriber::new().with_delay(Duration::from_millis(20));
        let audio = AudioBuffer::new(vec![0.0; 100], 16_000);
        let started = std::time::Instant::now();
        assert!(mock.transcribe(&audio).is_empty());
        assert!(started.elapsed() >= Duration::from_millis(20));
    }
}
