use crate::config::types::{
    Config, CrawlDriver, CrawlerConfig, ExtractionConfig, FetchConfig, OutputConfig,
    SummarizerConfig, UserAgentConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_fetch_config(&config.fetch)?;
    validate_extraction_config(&config.extraction)?;
    validate_output_config(&config.output)?;
    if let Some(summarizer) = &config.summarizer {
        validate_summarizer_config(summarizer)?;
    }
    Ok(())
}

/// Validates crawl session configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.driver == CrawlDriver::Browser && !cfg!(feature = "browser") {
        return Err(ConfigError::Validation(
            "driver = \"browser\" requires building with the `browser` feature".to_string(),
        ));
    }

    if config.page_delay_ms > 60_000 {
        return Err(ConfigError::Validation(format!(
            "page-delay-ms must be <= 60000ms, got {}ms",
            config.page_delay_ms
        )));
    }

    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max-pages must be >= 1, got {}",
            config.max_pages
        )));
    }

    if config.navigation_timeout_secs < 1 || config.navigation_timeout_secs > 120 {
        return Err(ConfigError::Validation(format!(
            "navigation-timeout-secs must be between 1 and 120, got {}",
            config.navigation_timeout_secs
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler-name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler-name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    if config.crawler_version.trim().is_empty() {
        return Err(ConfigError::Validation(
            "crawler-version cannot be empty".to_string(),
        ));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact-url: {}", e)))?;

    Ok(())
}

/// Validates fetch configuration; the timeout must be finite and bounded
fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.timeout_secs < 1 || config.timeout_secs > 120 {
        return Err(ConfigError::Validation(format!(
            "fetch timeout-secs must be between 1 and 120, got {}",
            config.timeout_secs
        )));
    }
    Ok(())
}

/// Validates extraction configuration
fn validate_extraction_config(config: &ExtractionConfig) -> Result<(), ConfigError> {
    if config.batch_size < 1 {
        return Err(ConfigError::Validation(
            "batch-size must be >= 1".to_string(),
        ));
    }

    if config.max_attempts < 1 {
        return Err(ConfigError::Validation(
            "max-attempts must be >= 1".to_string(),
        ));
    }

    if config.concurrency < 1 || config.concurrency > 32 {
        return Err(ConfigError::Validation(format!(
            "concurrency must be between 1 and 32, got {}",
            config.concurrency
        )));
    }

    if config.max_text_chars < 1 {
        return Err(ConfigError::Validation(
            "max-text-chars must be >= 1".to_string(),
        ));
    }

    if !config.heading_font_size.is_finite() || config.heading_font_size <= 0.0 {
        return Err(ConfigError::Validation(format!(
            "heading-font-size must be a positive number, got {}",
            config.heading_font_size
        )));
    }

    if config.summary_sentences < 1 {
        return Err(ConfigError::Validation(
            "summary-sentences must be >= 1".to_string(),
        ));
    }

    if config.keywords.iter().any(|k| k.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "keywords cannot contain empty entries".to_string(),
        ));
    }

    if config.ocr_dpi < 72 || config.ocr_dpi > 600 {
        return Err(ConfigError::Validation(format!(
            "ocr-dpi must be between 72 and 600, got {}",
            config.ocr_dpi
        )));
    }

    if config.ocr_language.is_empty()
        || !config
            .ocr_language
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '+')
    {
        return Err(ConfigError::Validation(format!(
            "ocr-language must be a tesseract language code, got '{}'",
            config.ocr_language
        )));
    }

    if config.ocr_timeout_secs < 1 || config.ocr_timeout_secs > 600 {
        return Err(ConfigError::Validation(format!(
            "ocr-timeout-secs must be between 1 and 600, got {}",
            config.ocr_timeout_secs
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Validates summarizer configuration
fn validate_summarizer_config(config: &SummarizerConfig) -> Result<(), ConfigError> {
    let endpoint = Url::parse(&config.endpoint)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid summarizer endpoint: {}", e)))?;
    if endpoint.scheme() != "http" && endpoint.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "Summarizer endpoint must be HTTP(S), got '{}'",
            config.endpoint
        )));
    }

    if config.model.trim().is_empty() {
        return Err(ConfigError::Validation(
            "summarizer model cannot be empty".to_string(),
        ));
    }

    if config.api_key_env.trim().is_empty() {
        return Err(ConfigError::Validation(
            "summarizer api-key-env cannot be empty".to_string(),
        ));
    }

    if config.timeout_secs < 1 || config.timeout_secs > 300 {
        return Err(ConfigError::Validation(format!(
            "summarizer timeout-secs must be between 1 and 300, got {}",
            config.timeout_secs
        )));
    }

    Ok(())
}
