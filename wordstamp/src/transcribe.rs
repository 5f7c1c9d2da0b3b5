use std::fmt;

use tracing::{info, warn};

use crate::audio;
use crate::config::EngineConfig;
use crate::engine::{probe_engine, select_device, Engine, EngineProbe};
use crate::error::{Error, Result};
use crate::mock::MockTranscriber;
use crate::types::{flatten_words, AudioBuffer, TranscriptSource, Transcription, Word};

/// Pipeline stage, reported when the engine path fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Configure,
    LoadModel,
    Transcribe,
    LoadAlignModel,
    Align,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Configure => "configure",
            Stage::LoadModel => "load_model",
            Stage::Transcribe => "transcribe",
            Stage::LoadAlignModel => "load_align_model",
            Stage::Align => "align",
        };
        f.write_str(name)
    }
}

/// An engine-path failure together with the stage that raised it.
#[derive(Debug)]
pub struct StageError {
    pub stage: Stage,
    pub error: Error,
}

trait AtStage<T> {
    fn at(self, stage: Stage) -> std::result::Result<T, StageError>;
}

impl<T> AtStage<T> for Result<T> {
    fn at(self, stage: Stage) -> std::result::Result<T, StageError> {
        self.map_err(|error| StageError { stage, error })
    }
}

type ConfigLoader = Box<dyn Fn() -> Result<EngineConfig>>;

/// Turns audio into words, through the speech engine when there is one and
/// through the mock generator otherwise.
pub struct Transcriber {
    probe: EngineProbe,
    mock: MockTranscriber,
    load_config: ConfigLoader,
}

impl Default for Transcriber {
    fn default() -> Self {
        Self::new()
    }
}

impl Transcriber {
    /// Probe for the compiled-in engine; configuration comes from the environment.
    pub fn new() -> Self {
        Self::with_probe(probe_engine())
    }

    pub fn with_probe(probe: EngineProbe) -> Self {
        Self {
            probe,
            mock: MockTranscriber::new(),
            load_config: Box::new(EngineConfig::from_env),
        }
    }

    pub fn mock(mut self, mock: MockTranscriber) -> Self {
        self.mock = mock;
        self
    }

    /// Replace the environment as the source of engine configuration.
    pub fn config_loader<F>(mut self, load: F) -> Self
    where
        F: Fn() -> Result<EngineConfig> + 'static,
    {
        self.load_config = Box::new(load);
        self
    }

    pub fn probe(&self) -> &EngineProbe {
        &self.probe
    }

    /// Transcribe `audio`. Engine failures degrade to the mock path; this never fails.
    pub fn transcribe(&self, audio: &AudioBuffer) -> Transcription {
        match &self.probe {
            EngineProbe::Available(engine) => match self.run_engine(engine.as_ref(), audio) {
                Ok(words) => {
                    return Transcription {
                        words,
                        source: TranscriptSource::Engine,
                    }
                }
                Err(StageError { stage, error }) => {
                    warn!(engine = engine.name(), %stage, %error, "engine failed, falling back to mock");
                }
            },
            EngineProbe::Unavailable { reason } => {
                info!(%reason, "speech engine unavailable, using mock");
            }
        }

        Transcription {
            words: self.mock.transcribe(audio),
            source: TranscriptSource::Mock,
        }
    }

    fn run_engine(
        &self,
        engine: &dyn Engine,
        audio: &AudioBuffer,
    ) -> std::result::Result<Vec<Word>, StageError> {
        let config = (self.load_config)().at(Stage::Configure)?;
        let device = select_device(engine);
        info!(
            engine = engine.name(),
            %device,
            model = config.model.name(),
            batch_size = config.batch_size,
            "processing with speech engine"
        );

        let mut model = engine.load_model(&config, device).at(Stage::LoadModel)?;
        let samples = audio::to_engine_rate(audio).at(Stage::Transcribe)?;
        let transcript = model
            .transcribe(&samples, config.batch_size)
            .at(Stage::Transcribe)?;

        let language = transcript
            .language
            .clone()
            .unwrap_or_else(|| config.language.code().to_string());
        info!(%language, segments = transcript.segments.len(), "transcription complete");

        let (align_model, metadata) = engine
            .load_align_model(&language, device)
            .at(Stage::LoadAlignModel)?;
        let aligned = align_model
            .align(&transcript.segments, &metadata, &samples, device)
            .at(Stage::Align)?;

        let words = flatten_words(&aligned);

        drop(model);
        drop(align_model);
        engine.release(device);

        Ok(words)
    }
}
