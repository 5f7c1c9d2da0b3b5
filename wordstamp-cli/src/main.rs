use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use wordstamp::{EngineConfig, Language, Model, Transcriber};

/// Read `{"audio_data": [...], "sample_rate": N}` from stdin and write a
/// word-level transcript as JSON to stdout.
///
/// Engine settings come from WHISPERX_MODEL, WHISPERX_LANGUAGE,
/// WHISPERX_BATCH_SIZE, WHISPERX_COMPUTE_TYPE and WHISPERX_MODELS_DIR.
#[derive(Parser)]
#[command(name = "wordstamp", version)]
struct Cli {
    /// List available models and the ones already cached.
    #[arg(long)]
    list_models: bool,

    /// List supported languages.
    #[arg(long)]
    list_languages: bool,

    /// Download a model without transcribing.
    #[arg(long, value_name = "NAME")]
    download_model: Option<String>,

    /// Model cache directory (overrides WHISPERX_MODELS_DIR).
    #[arg(long, value_name = "PATH")]
    models_dir: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("wordstamp=info".parse().unwrap()),
        )
        .with_writer(io::stderr)
        .with_ansi(false)
        .init();

    if cli.list_languages {
        println!("{:<6} LANGUAGE", "CODE");
        println!("{:<6} --------", "----");
        for (code, name) in Language::supported() {
            println!("{code:<6} {name}");
        }
        return ExitCode::SUCCESS;
    }

    if cli.list_models {
        return list_models(cli.models_dir);
    }

    if let Some(name) = &cli.download_model {
        return download_model(name, cli.models_dir);
    }

    let models_dir = cli.models_dir;
    let transcriber = Transcriber::new().config_loader(move || engine_config(models_dir.clone()));
    match wordstamp::run(io::stdin().lock(), io::stdout().lock(), &transcriber) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "transcription request failed");
            let message = e.to_string();
            if let Err(report) = wordstamp::output::write_error(io::stderr().lock(), &message) {
                eprintln!("error: {message} (could not write error report: {report})");
            }
            ExitCode::FAILURE
        }
    }
}

fn engine_config(models_dir: Option<PathBuf>) -> Result<EngineConfig, wordstamp::Error> {
    let mut config = EngineConfig::from_env()?;
    if models_dir.is_some() {
        config.models_dir = models_dir;
    }
    Ok(config)
}

fn list_models(models_dir: Option<PathBuf>) -> ExitCode {
    println!("{:<16} SIZE", "MODEL");
    println!("{:<16} ----", "-----");
    for (name, size) in Model::KNOWN {
        println!("{name:<16} {size}");
    }

    let config = match engine_config(models_dir) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };
    let cache_dir = config.resolve_models_dir();
    let cached = wordstamp::model::list_cached_models(&cache_dir);
    if !cached.is_empty() {
        println!("\nCached models in {}:", cache_dir.display());
        for path in cached {
            let size = std::fs::metadata(&path)
                .map(|m| format_bytes(m.len()))
                .unwrap_or_default();
            println!(
                "  {} ({})",
                path.file_name()
                    .map(|f| f.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                size
            );
        }
    }
    let _ = io::stdout().flush();
    ExitCode::SUCCESS
}

fn download_model(name: &str, models_dir: Option<PathBuf>) -> ExitCode {
    let Some(model) = Model::parse_name(name) else {
        eprintln!("Unknown model: {name}");
        eprintln!("Use --list-models to see available models");
        return ExitCode::FAILURE;
    };
    let config = match engine_config(models_dir) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };
    let cache_dir = config.resolve_models_dir();
    match wordstamp::model::ensure_model(&model, config.compute_type, &cache_dir) {
        Ok(path) => {
            println!("Model ready: {}", path.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn format_bytes(bytes: u64) -> String {
    if bytes >= 1_000_000_000 {
        format!("{:.1} GB", bytes as f64 / 1_000_000_000.0)
    } else if bytes >= 1_000_000 {
        format!("{:.0} MB", bytes as f64 / 1_000_000.0)
    } else {
        format!("{:.0} KB", bytes as f64 / 1_000.0)
    }
}
