use crate::config::types::{ExtractionConfig, SummarizerConfig};
use crate::ConfigError;
use std::path::PathBuf;

/// Looks up an executable on PATH
pub fn which(bin: &str) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(bin))
        .find(|candidate| candidate.is_file())
}

/// Resolves the tesseract binary used by the OCR tier
///
/// An explicitly configured path must exist. Otherwise `tesseract` is looked
/// up on PATH. Either way a missing binary is a configuration error so that
/// an extraction run fails before it touches any link.
pub fn resolve_tesseract(config: &ExtractionConfig) -> Result<PathBuf, ConfigError> {
    match &config.tesseract_path {
        Some(path) => {
            let path = PathBuf::from(path);
            if path.is_file() {
                Ok(path)
            } else {
                Err(ConfigError::MissingTool(format!(
                    "tesseract not found at {}",
                    path.display()
                )))
            }
        }
        None => which("tesseract")
            .ok_or_else(|| ConfigError::MissingTool("tesseract is not on PATH".to_string())),
    }
}

/// Reads the summarizer API key from the configured environment variable
pub fn resolve_api_key(config: &SummarizerConfig) -> Result<String, ConfigError> {
    std::env::var(&config.api_key_env)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ConfigError::MissingEnv(config.api_key_env.clone()))
}
