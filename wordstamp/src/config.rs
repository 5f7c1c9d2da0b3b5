use std::fmt;
use std::path::PathBuf;

use crate::error::{Error, Result};

pub const ENV_MODEL: &str = "WHISPERX_MODEL";
pub const ENV_LANGUAGE: &str = "WHISPERX_LANGUAGE";
pub const ENV_BATCH_SIZE: &str = "WHISPERX_BATCH_SIZE";
pub const ENV_COMPUTE_TYPE: &str = "WHISPERX_COMPUTE_TYPE";
pub const ENV_MODELS_DIR: &str = "WHISPERX_MODELS_DIR";

const DEFAULT_BATCH_SIZE: usize = 16;
/// Upper bound on 30 s windows per decoding call (about eight and a half hours).
pub const MAX_BATCH_SIZE: usize = 1024;

/// Whisper's language table as (code, full name) pairs.
const LANGUAGES: &[(&str, &str)] = &[
    ("en", "english"),
    ("zh", "chinese"),
    ("de", "german"),
    ("es", "spanish"),
    ("ru", "russian"),
    ("ko", "korean"),
    ("fr", "french"),
    ("ja", "japanese"),
    ("pt", "portuguese"),
    ("tr", "turkish"),
    ("pl", "polish"),
    ("ca", "catalan"),
    ("nl", "dutch"),
    ("ar", "arabic"),
    ("sv", "swedish"),
    ("it", "italian"),
    ("id", "indonesian"),
    ("hi", "hindi"),
    ("fi", "finnish"),
    ("vi", "vietnamese"),
    ("he", "hebrew"),
    ("uk", "ukrainian"),
    ("el", "greek"),
    ("ms", "malay"),
    ("cs", "czech"),
    ("ro", "romanian"),
    ("da", "danish"),
    ("hu", "hungarian"),
    ("ta", "tamil"),
    ("no", "norwegian"),
    ("th", "thai"),
    ("ur", "urdu"),
    ("hr", "croatian"),
    ("bg", "bulgarian"),
    ("lt", "lithuanian"),
    ("la", "latin"),
    ("mi", "maori"),
    ("ml", "malayalam"),
    ("cy", "welsh"),
    ("sk", "slovak"),
    ("te", "telugu"),
    ("fa", "persian"),
    ("lv", "latvian"),
    ("bn", "bengali"),
    ("sr", "serbian"),
    ("az", "azerbaijani"),
    ("sl", "slovenian"),
    ("kn", "kannada"),
    ("et", "estonian"),
    ("mk", "macedonian"),
    ("br", "breton"),
    ("eu", "basque"),
    ("is", "icelandic"),
    ("hy", "armenian"),
    ("ne", "nepali"),
    ("mn", "mongolian"),
    ("bs", "bosnian"),
    ("kk", "kazakh"),
    ("sq", "albanian"),
    ("sw", "swahili"),
    ("gl", "galician"),
    ("mr", "marathi"),
    ("pa", "punjabi"),
    ("si", "sinhala"),
    ("km", "khmer"),
    ("sn", "shona"),
    ("yo", "yoruba"),
    ("so", "somali"),
    ("af", "afrikaans"),
    ("oc", "occitan"),
    ("ka", "georgian"),
    ("be", "belarusian"),
    ("tg", "tajik"),
    ("sd", "sindhi"),
    ("gu", "gujarati"),
    ("am", "amharic"),
    ("yi", "yiddish"),
    ("lo", "lao"),
    ("uz", "uzbek"),
    ("fo", "faroese"),
    ("ht", "haitian creole"),
    ("ps", "pashto"),
    ("tk", "turkmen"),
    ("nn", "nynorsk"),
    ("mt", "maltese"),
    ("sa", "sanskrit"),
    ("lb", "luxembourgish"),
    ("my", "myanmar"),
    ("bo", "tibetan"),
    ("tl", "tagalog"),
    ("mg", "malagasy"),
    ("as", "assamese"),
    ("tt", "tatar"),
    ("haw", "hawaiian"),
    ("ln", "lingala"),
    ("ha", "hausa"),
    ("ba", "bashkir"),
    ("jw", "javanese"),
    ("su", "sundanese"),
    ("yue", "cantonese"),
];

/// Languages written without spaces between words.
const UNDELIMITED_LANGUAGES: &[&str] = &["zh", "ja", "th", "lo", "km", "my", "yue", "bo"];

/// A validated whisper language.
///
/// Accepts both short codes ("en", "de") and full names ("english", "german"),
/// and always normalizes to the short code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Language {
    code: &'static str,
}

impl Language {
    /// Create a language from a code or full name.
    pub fn new(lang: &str) -> Result<Self> {
        let lower = lang.trim().to_lowercase();
        LANGUAGES
            .iter()
            .find(|(code, name)| *code == lower || *name == lower)
            .map(|&(code, _)| Language { code })
            .ok_or_else(|| Error::UnsupportedLanguage(lang.to_string()))
    }

    /// Short language code (e.g. "en").
    pub fn code(&self) -> &'static str {
        self.code
    }

    /// Whether words in this language are separated by whitespace.
    pub fn is_word_delimited(&self) -> bool {
        !UNDELIMITED_LANGUAGES.contains(&self.code)
    }

    /// List all supported languages as (code, full_name) pairs.
    pub fn supported() -> &'static [(&'static str, &'static str)] {
        LANGUAGES
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code)
    }
}

impl Default for Language {
    fn default() -> Self {
        Language { code: "en" }
    }
}

/// Whisper model sizes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Model {
    Tiny,
    TinyEn,
    Base,
    BaseEn,
    Small,
    SmallEn,
    Medium,
    MediumEn,
    LargeV2,
    LargeV3,
    LargeV3Turbo,
    /// User-provided ggml file path.
    Custom(PathBuf),
}

impl Model {
    /// All named models with their approximate download size.
    pub const KNOWN: &'static [(&'static str, &'static str)] = &[
        ("tiny", "75 MB"),
        ("tiny.en", "75 MB"),
        ("base", "142 MB"),
        ("base.en", "142 MB"),
        ("small", "466 MB"),
        ("small.en", "466 MB"),
        ("medium", "1.5 GB"),
        ("medium.en", "1.5 GB"),
        ("large-v2", "2.9 GB"),
        ("large-v3", "2.9 GB"),
        ("large-v3-turbo", "~1.6 GB"),
    ];

    /// Model filename as published for whisper.cpp, for the given weight precision.
    pub fn filename(&self, compute_type: ComputeType) -> String {
        match self {
            Model::Custom(path) => path
                .file_name()
                .map(|f| f.to_string_lossy().into_owned())
                .unwrap_or_else(|| "custom-model".into()),
            _ => format!("ggml-{}{}.bin", self.name(), compute_type.weights_suffix()),
        }
    }

    /// Human-readable name.
    pub fn name(&self) -> &str {
        match self {
            Model::Tiny => "tiny",
            Model::TinyEn => "tiny.en",
            Model::Base => "base",
            Model::BaseEn => "base.en",
            Model::Small => "small",
            Model::SmallEn => "small.en",
            Model::Medium => "medium",
            Model::MediumEn => "medium.en",
            Model::LargeV2 => "large-v2",
            Model::LargeV3 => "large-v3",
            Model::LargeV3Turbo => "large-v3-turbo",
            Model::Custom(_) => "custom",
        }
    }

    /// Parse a model name. `large` is an alias for the newest large model.
    pub fn parse_name(s: &str) -> Option<Self> {
        match s {
            "tiny" => Some(Model::Tiny),
            "tiny.en" => Some(Model::TinyEn),
            "base" => Some(Model::Base),
            "base.en" => Some(Model::BaseEn),
            "small" => Some(Model::Small),
            "small.en" => Some(Model::SmallEn),
            "medium" => Some(Model::Medium),
            "medium.en" => Some(Model::MediumEn),
            "large-v2" => Some(Model::LargeV2),
            "large" | "large-v3" => Some(Model::LargeV3),
            "large-v3-turbo" | "turbo" => Some(Model::LargeV3Turbo),
            _ => None,
        }
    }

    /// Parse a model name, or treat the value as a path to a ggml file.
    pub fn from_setting(s: &str) -> Result<Self> {
        if let Some(model) = Model::parse_name(s) {
            return Ok(model);
        }
        let path = PathBuf::from(s);
        if path.extension().is_some_and(|ext| ext == "bin") || path.exists() {
            Ok(Model::Custom(path))
        } else {
            Err(Error::InvalidOption(format!(
                "unknown model \"{s}\" — expected a model name or a path to a .bin file"
            )))
        }
    }
}

/// Numeric precision of the model weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ComputeType {
    #[default]
    Float16,
    Float32,
    Int8,
}

impl ComputeType {
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "float16" | "fp16" => Ok(ComputeType::Float16),
            "float32" | "fp32" => Ok(ComputeType::Float32),
            "int8" | "int8_float16" | "int8_float32" => Ok(ComputeType::Int8),
            other => Err(Error::InvalidOption(format!(
                "unknown compute type \"{other}\" — expected float16, float32 or int8"
            ))),
        }
    }

    /// Filename suffix of the matching ggml weights. whisper.cpp publishes
    /// f16 weights only, so float32 loads those and upcasts at runtime.
    fn weights_suffix(self) -> &'static str {
        match self {
            ComputeType::Float16 | ComputeType::Float32 => "",
            ComputeType::Int8 => "-q8_0",
        }
    }
}

impl fmt::Display for ComputeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComputeType::Float16 => write!(f, "float16"),
            ComputeType::Float32 => write!(f, "float32"),
            ComputeType::Int8 => write!(f, "int8"),
        }
    }
}

/// Where inference runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    Cpu,
    Gpu,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => write!(f, "cpu"),
            Device::Gpu => write!(f, "gpu"),
        }
    }
}

/// Engine settings, read from the environment once per invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub model: Model,
    /// Used when the engine does not report a detected language.
    pub language: Language,
    pub batch_size: usize,
    pub compute_type: ComputeType,
    pub models_dir: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            model: Model::Base,
            language: Language::default(),
            batch_size: DEFAULT_BATCH_SIZE,
            compute_type: ComputeType::default(),
            models_dir: None,
        }
    }
}

impl EngineConfig {
    /// Read the `WHISPERX_*` variables from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. Unset or blank keys keep their default.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(model) = get(ENV_MODEL) {
            config.model = Model::from_setting(model.trim())?;
        }
        if let Some(lang) = get(ENV_LANGUAGE) {
            config.language = Language::new(&lang)?;
        }
        if let Some(size) = get(ENV_BATCH_SIZE) {
            config.batch_size = match size.trim().parse::<usize>() {
                Ok(n) if (1..=MAX_BATCH_SIZE).contains(&n) => n,
                _ => {
                    return Err(Error::InvalidOption(format!(
                        "{ENV_BATCH_SIZE} must be an integer from 1 to {MAX_BATCH_SIZE}, got \"{size}\""
                    )))
                }
            };
        }
        if let Some(ct) = get(ENV_COMPUTE_TYPE) {
            config.compute_type = ComputeType::parse(&ct)?;
        }
        if let Some(dir) = get(ENV_MODELS_DIR) {
            config.models_dir = Some(PathBuf::from(dir));
        }

        Ok(config)
    }

    /// Resolve the model cache directory, defaulting to ~/.cache/wordstamp/models.
    pub fn resolve_models_dir(&self) -> PathBuf {
        self.models_dir.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from(".cache"))
                .join("wordstamp")
                .join("models")
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_config_defaults() {
        let config = EngineConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.model, Model::Base);
        assert_eq!(config.language.code(), "en");
        assert_eq!(config.batch_size, 16);
        assert_eq!(config.compute_type, ComputeType::Float16);
        assert!(config.models_dir.is_none());
    }

    #[test]
    fn test_config_overrides() {
        let config = EngineConfig::from_lookup(lookup(&[
            (ENV_MODEL, "small.en"),
            (ENV_LANGUAGE, "German"),
            (ENV_BATCH_SIZE, "4"),
            (ENV_COMPUTE_TYPE, "int8"),
            (ENV_MODELS_DIR, "/srv/models"),
        ]))
        .unwrap();
        assert_eq!(config.model, Model::SmallEn);
        assert_eq!(config.language.code(), "de");
        assert_eq!(config.batch_size, 4);
        assert_eq!(config.compute_type, ComputeType::Int8);
        assert_eq!(config.resolve_models_dir(), PathBuf::from("/srv/models"));
    }

    #[test]
    fn test_config_blank_values_keep_defaults() {
        let config =
            EngineConfig::from_lookup(lookup(&[(ENV_MODEL, ""), (ENV_BATCH_SIZE, "  ")])).unwrap();
        assert_eq!(config.model, Model::Base);
        assert_eq!(config.batch_size, 16);
    }

    #[test]
    fn test_config_rejects_bad_batch_size() {
        for bad in ["0", "-3", "sixteen", "1025"] {
            let err = EngineConfig::from_lookup(lookup(&[(ENV_BATCH_SIZE, bad)])).unwrap_err();
            assert!(matches!(err, Error::InvalidOption(_)), "{bad}");
        }
    }

    #[test]
    fn test_config_rejects_oversized_batch_size() {
        // 2^56 windows of 480000 samples wraps to zero in usize arithmetic
        let err = EngineConfig::from_lookup(lookup(&[(ENV_BATCH_SIZE, "72057594037927936")]))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidOption(_)));

        let max = MAX_BATCH_SIZE.to_string();
        let config = EngineConfig::from_lookup(lookup(&[(ENV_BATCH_SIZE, max.as_str())])).unwrap();
        assert_eq!(config.batch_size, MAX_BATCH_SIZE);
    }

    #[test]
    fn test_config_rejects_bad_compute_type() {
        let err = EngineConfig::from_lookup(lookup(&[(ENV_COMPUTE_TYPE, "bfloat12")])).unwrap_err();
        assert!(err.to_string().contains("bfloat12"));
    }

    #[test]
    fn test_config_rejects_unknown_language() {
        let err = EngineConfig::from_lookup(lookup(&[(ENV_LANGUAGE, "klingon")])).unwrap_err();
        assert!(matches!(err, Error::UnsupportedLanguage(_)));
    }

    #[test]
    fn test_config_custom_model_path() {
        let config =
            EngineConfig::from_lookup(lookup(&[(ENV_MODEL, "/opt/models/ggml-custom.bin")]))
                .unwrap();
        assert_eq!(
            config.model,
            Model::Custom(PathBuf::from("/opt/models/ggml-custom.bin"))
        );
    }

    #[test]
    fn test_config_unknown_model_name() {
        let err = EngineConfig::from_lookup(lookup(&[(ENV_MODEL, "gigantic")])).unwrap_err();
        assert!(matches!(err, Error::InvalidOption(_)));
    }

    #[test]
    fn test_language_normalizes_names() {
        assert_eq!(Language::new("ENGLISH").unwrap().code(), "en");
        assert_eq!(Language::new("ja").unwrap().code(), "ja");
        assert_eq!(Language::new("cantonese").unwrap().to_string(), "yue");
    }

    #[test]
    fn test_language_word_delimiters() {
        assert!(Language::new("en").unwrap().is_word_delimited());
        assert!(Language::new("de").unwrap().is_word_delimited());
        assert!(!Language::new("zh").unwrap().is_word_delimited());
        assert!(!Language::new("ja").unwrap().is_word_delimited());
    }

    #[test]
    fn test_language_supported_count() {
        assert_eq!(Language::supported().len(), 100);
        assert!(Language::supported().iter().any(|(c, _)| *c == "haw"));
    }

    #[test]
    fn test_model_filenames() {
        assert_eq!(Model::Base.filename(ComputeType::Float16), "ggml-base.bin");
        assert_eq!(Model::Base.filename(ComputeType::Float32), "ggml-base.bin");
        assert_eq!(Model::Base.filename(ComputeType::Int8), "ggml-base-q8_0.bin");
        assert_eq!(
            Model::LargeV3Turbo.filename(ComputeType::Float16),
            "ggml-large-v3-turbo.bin"
        );
        assert_eq!(
            Model::Custom(PathBuf::from("/m/my-model.bin")).filename(ComputeType::Int8),
            "my-model.bin"
        );
    }

    #[test]
    fn test_model_large_alias() {
        assert_eq!(Model::parse_name("large"), Some(Model::LargeV3));
        assert_eq!(Model::parse_name("huge"), None);
    }

    #[test]
    fn test_known_models_parse() {
        for (name, _) in Model::KNOWN {
            let model = Model::parse_name(name).unwrap();
            assert_eq!(model.name(), *name);
        }
    }

    #[test]
    fn test_compute_type_aliases() {
        assert_eq!(ComputeType::parse("FP16").unwrap(), ComputeType::Float16);
        assert_eq!(ComputeType::parse("int8_float16").unwrap(), ComputeType::Int8);
        assert_eq!(ComputeType::Float32.to_string(), "float32");
    }
}
