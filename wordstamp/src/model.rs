use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use crate::config::{ComputeType, Model};
use crate::error::{Error, Result};

const HUGGINGFACE_BASE: &str = "https://huggingface.co/ggerganov/whisper.cpp/resolve/main";

/// Anything smaller is an error page, not a model.
const MIN_MODEL_BYTES: u64 = 1_000_000;

/// Ensure a model is available locally, downloading if necessary.
/// Returns the path to the model file.
pub fn ensure_model(model: &Model, compute_type: ComputeType, cache_dir: &Path) -> Result<PathBuf> {
    if let Model::Custom(path) = model {
        return if path.exists() {
            Ok(path.clone())
        } else {
            Err(Error::ModelNotFound { path: path.clone() })
        };
    }

    let filename = model.filename(compute_type);
    let model_path = cache_dir.join(&filename);

    if model_path.exists() {
        info!(path = %model_path.display(), "model already cached");
        return Ok(model_path);
    }

    std::fs::create_dir_all(cache_dir).map_err(|e| {
        Error::Model(format!("failed to create cache dir {}: {e}", cache_dir.display()))
    })?;

    let url = format!("{HUGGINGFACE_BASE}/{filename}");
    info!(%url, "downloading model");
    download_model(&url, &model_path)?;

    Ok(model_path)
}

fn download_model(url: &str, dest: &Path) -> Result<()> {
    let response = reqwest::blocking::get(url)?
        .error_for_status()
        .map_err(|e| Error::ModelDownload(format!("HTTP error: {e}")))?;

    let total_size = response.content_length().unwrap_or(0);

    let pb = ProgressBar::new(total_size);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg}\n{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})")
            .map_err(|e| Error::ModelDownload(format!("progress template: {e}")))?
            .progress_chars("#>-"),
    );
    pb.set_message(format!(
        "Downloading {}",
        dest.file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default()
    ));

    // Write to a temp file first, then rename
    let tmp_path = dest.with_extension("bin.part");
    let mut file = File::create(&tmp_path)?;
    let copied = std::io::copy(&mut pb.wrap_read(response), &mut file);
    if let Err(e) = copied {
        std::fs::remove_file(&tmp_path).ok();
        return Err(Error::ModelDownload(format!("transfer interrupted: {e}")));
    }
    file.flush()?;
    drop(file);

    let file_size = std::fs::metadata(&tmp_path)?.len();
    if file_size < MIN_MODEL_BYTES {
        std::fs::remove_file(&tmp_path).ok();
        return Err(Error::ModelDownload(format!(
            "downloaded file too small ({file_size} bytes) — likely an error page"
        )));
    }

    std::fs::rename(&tmp_path, dest)?;
    pb.finish_with_message("Download complete");

    if total_size > 0 && file_size != total_size {
        warn!(
            expected = total_size,
            actual = file_size,
            "file size mismatch — model may be corrupt"
        );
    }

    info!(path = %dest.display(), size = file_size, "model saved");
    Ok(())
}

/// List all cached models.
pub fn list_cached_models(cache_dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(cache_dir) else {
        return Vec::new();
    };

    let mut models: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "bin"))
        .collect();
    models.sort();
    models
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("wordstamp_test_{name}_{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_list_cached_models_empty_dir() {
        let tmp = scratch_dir("empty_cache");
        assert!(list_cached_models(&tmp).is_empty());
        fs::remove_dir_all(&tmp).ok();
    }

    #[test]
    fn test_list_cached_models_nonexistent_dir() {
        assert!(list_cached_models(Path::new("/nonexistent/path")).is_empty());
    }

    #[test]
    fn test_list_cached_models_finds_bin_files() {
        let tmp = scratch_dir("list_cache");

        fs::write(tmp.join("ggml-tiny.bin"), b"fake model").unwrap();
        fs::write(tmp.join("ggml-base-q8_0.bin"), b"fake model").unwrap();
        fs::write(tmp.join("ggml-tiny.bin.part"), b"partial").unwrap(); // excluded
        fs::write(tmp.join("readme.txt"), b"not a model").unwrap(); // excluded

        let models = list_cached_models(&tmp);
        assert_eq!(models.len(), 2);
        assert!(models.iter().all(|p| p.extension().unwrap() == "bin"));
        assert!(models[0].ends_with("ggml-base-q8_0.bin"));

        fs::remove_dir_all(&tmp).ok();
    }

    #[test]
    fn test_ensure_model_custom_exists() {
        let tmp = scratch_dir("custom_model");
        let path = tmp.join("my-model.bin");
        fs::write(&path, b"fake model data").unwrap();

        let model = Model::Custom(path.clone());
        let result = ensure_model(&model, ComputeType::Int8, Path::new("/unused")).unwrap();
        assert_eq!(result, path);

        fs::remove_dir_all(&tmp).ok();
    }

    #[test]
    fn test_ensure_model_custom_not_found() {
        let model = Model::Custom(PathBuf::from("/nonexistent/model.bin"));
        let err = ensure_model(&model, ComputeType::Float16, Path::new("/unused")).unwrap_err();
        assert!(matches!(err, Error::ModelNotFound { .. }));
    }

    #[test]
    fn test_ensure_model_uses_cache() {
        let tmp = scratch_dir("model_cache");
        let model_path = tmp.join("ggml-tiny.bin");
        fs::write(&model_path, b"fake cached model").unwrap();

        let result = ensure_model(&Model::Tiny, ComputeType::Float16, &tmp).unwrap();
        assert_eq!(result, model_path);

        fs::remove_dir_all(&tmp).ok();
    }

    #[test]
    fn test_ensure_model_cache_respects_compute_type() {
        let tmp = scratch_dir("quantized_cache");
        let quantized = tmp.join("ggml-tiny-q8_0.bin");
        fs::write(&quantized, b"fake quantized model").unwrap();

        let result = ensure_model(&Model::Tiny, ComputeType::Int8, &tmp).unwrap();
        assert_eq!(result, quantized);

        fs::remove_dir_all(&tmp).ok();
    }
}
