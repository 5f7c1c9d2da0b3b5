//! The speech engine seam.
//!
//! An [`Engine`] loads a [`SpeechModel`] for transcription and an [`AlignModel`]
//! for word-level forced alignment. The real implementation wraps whisper.cpp
//! and is compiled in with the `whisper` feature; [`probe_engine`] reports
//! whether it is present so callers can branch to the mock path explicitly.

use std::fmt;

use crate::align::AlignMetadata;
use crate::config::{Device, EngineConfig};
use crate::error::Result;
use crate::types::{AlignedSegment, RawSegment, RawTranscript};

/// A loaded transcription model.
pub trait SpeechModel {
    /// Transcribe 16 kHz mono samples, decoding `batch_size` windows per engine call.
    fn transcribe(&mut self, audio: &[f32], batch_size: usize) -> Result<RawTranscript>;
}

/// A loaded alignment model.
pub trait AlignModel {
    fn align(
        &self,
        segments: &[RawSegment],
        metadata: &AlignMetadata,
        audio: &[f32],
        device: Device,
    ) -> Result<Vec<AlignedSegment>>;
}

pub trait Engine {
    /// Short engine name for logs.
    fn name(&self) -> &str;

    fn is_available(&self, device: Device) -> bool;

    fn load_model(&self, config: &EngineConfig, device: Device) -> Result<Box<dyn SpeechModel>>;

    fn load_align_model(
        &self,
        language: &str,
        device: Device,
    ) -> Result<(Box<dyn AlignModel>, AlignMetadata)>;

    /// Reclaim accelerator memory after the model handles have been dropped.
    fn release(&self, _device: Device) {}
}

/// Result of looking for a speech engine.
pub enum EngineProbe {
    Available(Box<dyn Engine>),
    Unavailable { reason: String },
}

impl EngineProbe {
    pub fn is_available(&self) -> bool {
        matches!(self, EngineProbe::Available(_))
    }
}

impl fmt::Debug for EngineProbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineProbe::Available(engine) => {
                f.debug_tuple("Available").field(&engine.name()).finish()
            }
            EngineProbe::Unavailable { reason } => f
                .debug_struct("Unavailable")
                .field("reason", reason)
                .finish(),
        }
    }
}

/// Look for the compiled-in speech engine.
#[cfg(feature = "whisper")]
pub fn probe_engine() -> EngineProbe {
    EngineProbe::Available(Box::new(crate::whisper::WhisperEngine::new()))
}

/// Look for the compiled-in speech engine.
#[cfg(not(feature = "whisper"))]
pub fn probe_engine() -> EngineProbe {
    EngineProbe::Unavailable {
        reason: "built without the `whisper` feature".into(),
    }
}

/// Pick the accelerator when the engine can use one.
pub fn select_device(engine: &dyn Engine) -> Device {
    if engine.is_available(Device::Gpu) {
        Device::Gpu
    } else {
        Device::Cpu
    }
}
