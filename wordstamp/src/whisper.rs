use tracing::{debug, info};
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use crate::align::{AlignMetadata, TokenAligner};
use crate::audio::ENGINE_SAMPLE_RATE;
use crate::config::{Device, EngineConfig};
use crate::engine::{AlignModel, Engine, SpeechModel};
use crate::error::{Error, Result};
use crate::model;
use crate::types::{RawSegment, RawToken, RawTranscript};

/// Length of one whisper decoding window, in seconds.
const WINDOW_SECS: usize = 30;

/// Samples decoded per whisper call for `batch_size` windows.
fn batch_samples(batch_size: usize) -> Result<usize> {
    batch_size
        .max(1)
        .checked_mul(WINDOW_SECS * ENGINE_SAMPLE_RATE as usize)
        .ok_or_else(|| Error::InvalidOption(format!("batch size {batch_size} is too large")))
}

/// whisper.cpp reports timestamps in centiseconds.
fn centis_to_secs(t: i64) -> f64 {
    t as f64 / 100.0
}

/// whisper.cpp through whisper-rs.
#[derive(Debug, Default)]
pub struct WhisperEngine;

impl WhisperEngine {
    pub fn new() -> Self {
        Self
    }
}

impl Engine for WhisperEngine {
    fn name(&self) -> &str {
        "whisper.cpp"
    }

    /// GPU support is decided at build time: it is reported whenever the
    /// `cuda` or `vulkan` feature is compiled in, without checking for a
    /// device. On a machine without one, whisper.cpp falls back to its CPU
    /// backend when the context is created.
    fn is_available(&self, device: Device) -> bool {
        match device {
            Device::Cpu => true,
            Device::Gpu => cfg!(any(feature = "cuda", feature = "vulkan")),
        }
    }

    fn load_model(&self, config: &EngineConfig, device: Device) -> Result<Box<dyn SpeechModel>> {
        let cache_dir = config.resolve_models_dir();
        let model_path = model::ensure_model(&config.model, config.compute_type, &cache_dir)?;

        info!(
            model = %model_path.display(),
            %device,
            compute_type = %config.compute_type,
            "loading whisper model"
        );

        let mut ctx_params = WhisperContextParameters::new();
        ctx_params.use_gpu(device == Device::Gpu);
        ctx_params.gpu_device(0);

        let ctx = WhisperContext::new_with_params(
            model_path
                .to_str()
                .ok_or_else(|| Error::Model("model path contains invalid UTF-8".into()))?,
            ctx_params,
        )?;

        Ok(Box::new(WhisperModel { ctx }))
    }

    fn load_align_model(
        &self,
        language: &str,
        _device: Device,
    ) -> Result<(Box<dyn AlignModel>, AlignMetadata)> {
        let metadata = AlignMetadata::for_language(language)?;
        debug!(language = %metadata.language, word_delimited = metadata.word_delimited, "alignment model ready");
        Ok((Box::new(TokenAligner), metadata))
    }

    fn release(&self, device: Device) {
        // Contexts free their ggml buffers on drop; nothing is pooled across calls.
        debug!(%device, "accelerator memory released");
    }
}

struct WhisperModel {
    ctx: WhisperContext,
}

impl SpeechModel for WhisperModel {
    fn transcribe(&mut self, audio: &[f32], batch_size: usize) -> Result<RawTranscript> {
        let mut state = self.ctx.create_state()?;

        let chunk_len = batch_samples(batch_size)?;
        let mut segments = Vec::new();
        let mut language: Option<String> = None;

        for (index, chunk) in audio.chunks(chunk_len).enumerate() {
            let offset = (index * chunk_len) as f64 / ENGINE_SAMPLE_RATE as f64;

            // Detect on the first batch, then keep that language for the rest.
            let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 5 });
            params.set_language(Some(language.as_deref().unwrap_or("auto")));
            params.set_token_timestamps(true);
            params.set_print_progress(false);
            params.set_print_realtime(false);
            params.set_print_timestamps(false);

            info!(batch = index, samples = chunk.len(), "running transcription");
            state.full(params, chunk)?;

            if language.is_none() {
                let lang_id = state.full_lang_id_from_state();
                language = whisper_rs::get_lang_str(lang_id).map(str::to_string);
            }

            let num_segments = state.full_n_segments();
            debug!(batch = index, num_segments, "batch complete");

            for i in 0..num_segments {
                let segment = state
                    .get_segment(i)
                    .ok_or_else(|| Error::Transcription(format!("segment {i} not found")))?;

                let text = segment
                    .to_str_lossy()
                    .map_err(|e| Error::Transcription(format!("segment text error: {e}")))?
                    .into_owned();

                let mut tokens = Vec::new();
                for t in 0..segment.n_tokens() {
                    let Some(token) = segment.get_token(t) else {
                        continue;
                    };
                    // Raw bytes: a token may hold part of a multi-byte character.
                    let Ok(bytes) = token.to_bytes() else {
                        continue;
                    };
                    let data = token.token_data();
                    tokens.push(RawToken {
                        bytes: bytes.to_vec(),
                        start: offset + centis_to_secs(data.t0),
                        end: offset + centis_to_secs(data.t1),
                        probability: data.p,
                    });
                }

                segments.push(RawSegment {
                    start: offset + centis_to_secs(segment.start_timestamp()),
                    end: offset + centis_to_secs(segment.end_timestamp()),
                    text,
                    tokens,
                });
            }
        }

        Ok(RawTranscript { segments, language })
    }
}
