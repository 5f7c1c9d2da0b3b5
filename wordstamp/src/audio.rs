use std::io::Read;

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::types::AudioBuffer;

/// Sample rate whisper.cpp expects.
pub const ENGINE_SAMPLE_RATE: u32 = 16_000;

/// The JSON document read from stdin.
#[derive(Debug, Deserialize)]
struct AudioRequest {
    audio_data: Vec<f32>,
    sample_rate: u32,
}

/// Read a whole JSON request from `reader` and turn it into an [`AudioBuffer`].
pub fn read_audio<R: Read>(mut reader: R) -> Result<AudioBuffer> {
    let mut raw = String::new();
    reader.read_to_string(&mut raw)?;
    parse_audio(&raw)
}

/// Parse a JSON request of the form `{"audio_data": [...], "sample_rate": N}`.
pub fn parse_audio(raw: &str) -> Result<AudioBuffer> {
    let request: AudioRequest = serde_json::from_str(raw)?;

    if request.sample_rate == 0 {
        return Err(Error::InvalidInput("sample_rate must be greater than zero".into()));
    }

    let audio = AudioBuffer::new(request.audio_data, request.sample_rate);
    info!(
        samples = audio.samples().len(),
        sample_rate = audio.sample_rate(),
        duration_secs = format!("{:.2}", audio.duration()),
        "audio received"
    );
    Ok(audio)
}

const RESAMPLE_CHUNK: usize = 1024;

/// Band-limited resampling to `target_rate` with a windowed sinc filter.
///
/// The output holds `len * target_rate / from_rate` samples (rounded), aligned
/// with the input: the filter delay is trimmed off the front. Returns a copy
/// when the rate already matches.
pub fn resample(samples: &[f32], from_rate: u32, target_rate: u32) -> Result<Vec<f32>> {
    if from_rate == target_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let ratio = f64::from(target_rate) / f64::from(from_rate);
    let out_len = (samples.len() as f64 * ratio).round().max(1.0) as usize;

    let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, RESAMPLE_CHUNK, 1)
        .map_err(|e| Error::Transcription(format!("resampler init: {e}")))?;
    let delay = resampler.output_delay();
    let needed = delay + out_len;

    debug!(from_rate, target_rate, out_len, delay, "resampling audio");

    let mut output = Vec::with_capacity(needed + RESAMPLE_CHUNK);
    let mut chunks = samples.chunks(RESAMPLE_CHUNK);
    let mut input = vec![vec![0.0f32; RESAMPLE_CHUNK]];

    // Past the end of the input, zeros flush the filter tail.
    while output.len() < needed {
        let frame = &mut input[0];
        frame.fill(0.0);
        if let Some(chunk) = chunks.next() {
            frame[..chunk.len()].copy_from_slice(chunk);
        }

        let resampled = resampler
            .process(&input, None)
            .map_err(|e| Error::Transcription(format!("resample: {e}")))?;
        match resampled.first() {
            Some(channel) if !channel.is_empty() => output.extend_from_slice(channel),
            _ => return Err(Error::Transcription("resampler produced no output".into())),
        }
    }

    output.drain(..delay);
    output.truncate(out_len);
    Ok(output)
}

/// Samples of `audio` at the engine's sample rate.
pub fn to_engine_rate(audio: &AudioBuffer) -> Result<Vec<f32>> {
    resample(audio.samples(), audio.sample_rate(), ENGINE_SAMPLE_RATE)
}
