use serde::Deserialize;

/// Main configuration structure for Policy Harvester
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub summarizer: Option<SummarizerConfig>,
}

/// How listing pages are loaded and paginated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrawlDriver {
    /// Fetch listing pages over HTTP and follow the "next" anchor's href
    Http,
    /// Render listing pages in headless Chromium and click "next"
    Browser,
}

/// Crawl session behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    #[serde(default = "default_driver")]
    pub driver: CrawlDriver,

    /// Fixed delay between page visits (milliseconds)
    #[serde(rename = "page-delay-ms", default = "default_page_delay_ms")]
    pub page_delay_ms: u64,

    /// Upper bound on listing pages visited in one session
    #[serde(rename = "max-pages", default = "default_max_pages")]
    pub max_pages: u32,

    /// Timeout for a single browser navigation or interaction (seconds)
    #[serde(
        rename = "navigation-timeout-secs",
        default = "default_navigation_timeout_secs"
    )]
    pub navigation_timeout_secs: u64,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,
}

/// HTTP fetch configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// Whole-request timeout (seconds)
    #[serde(rename = "timeout-secs", default = "default_fetch_timeout_secs")]
    pub timeout_secs: u64,
}

/// Text extraction and batch scheduling configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractionConfig {
    /// Default number of links per batch
    #[serde(rename = "batch-size", default = "default_batch_size")]
    pub batch_size: usize,

    /// Links are no longer selected once they failed this many times
    #[serde(rename = "max-attempts", default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Links processed concurrently within one batch
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Persisted text is truncated to this many characters
    #[serde(rename = "max-text-chars", default = "default_max_text_chars")]
    pub max_text_chars: usize,

    /// Spans with a larger font size (points) are collected as headings
    #[serde(rename = "heading-font-size", default = "default_heading_font_size")]
    pub heading_font_size: f32,

    /// Number of leading sentences used as the summary
    #[serde(rename = "summary-sentences", default = "default_summary_sentences")]
    pub summary_sentences: usize,

    /// Words emphasised in summary and full text
    #[serde(default = "default_keywords")]
    pub keywords: Vec<String>,

    /// Rasterisation resolution for OCR
    #[serde(rename = "ocr-dpi", default = "default_ocr_dpi")]
    pub ocr_dpi: u32,

    /// Tesseract language code
    #[serde(rename = "ocr-language", default = "default_ocr_language")]
    pub ocr_language: String,

    /// Per-page Tesseract timeout (seconds)
    #[serde(rename = "ocr-timeout-secs", default = "default_ocr_timeout_secs")]
    pub ocr_timeout_secs: u64,

    /// Explicit path to the tesseract binary; looked up on PATH when unset
    #[serde(rename = "tesseract-path", default)]
    pub tesseract_path: Option<String>,

    /// Directory containing the pdfium shared library; system library when unset
    #[serde(rename = "pdfium-library", default)]
    pub pdfium_library: Option<String>,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// Chat-completions service used for policy analysis
#[derive(Debug, Clone, Deserialize)]
pub struct SummarizerConfig {
    #[serde(default = "default_summarizer_endpoint")]
    pub endpoint: String,

    pub model: String,

    /// Name of the environment variable holding the API key
    #[serde(rename = "api-key-env", default = "default_api_key_env")]
    pub api_key_env: String,

    /// Sent as the Referer header
    #[serde(default)]
    pub referer: Option<String>,

    #[serde(rename = "timeout-secs", default = "default_summarizer_timeout_secs")]
    pub timeout_secs: u64,

    /// Pause between consecutive per-sector prompts (milliseconds)
    #[serde(rename = "throttle-ms", default = "default_throttle_ms")]
    pub throttle_ms: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            driver: default_driver(),
            page_delay_ms: default_page_delay_ms(),
            max_pages: default_max_pages(),
            navigation_timeout_secs: default_navigation_timeout_secs(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_fetch_timeout_secs(),
        }
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            max_attempts: default_max_attempts(),
            concurrency: default_concurrency(),
            max_text_chars: default_max_text_chars(),
            heading_font_size: default_heading_font_size(),
            summary_sentences: default_summary_sentences(),
            keywords: default_keywords(),
            ocr_dpi: default_ocr_dpi(),
            ocr_language: default_ocr_language(),
            ocr_timeout_secs: default_ocr_timeout_secs(),
            tesseract_path: None,
            pdfium_library: None,
        }
    }
}

fn default_driver() -> CrawlDriver {
    CrawlDriver::Http
}

fn default_page_delay_ms() -> u64 {
    2000
}

fn default_max_pages() -> u32 {
    500
}

fn default_navigation_timeout_secs() -> u64 {
    10
}

fn default_fetch_timeout_secs() -> u64 {
    15
}

fn default_batch_size() -> usize {
    100
}

fn default_max_attempts() -> u32 {
    3
}

fn default_concurrency() -> usize {
    1
}

fn default_max_text_chars() -> usize {
    10_000
}

fn default_heading_font_size() -> f32 {
    12.0
}

fn default_summary_sentences() -> usize {
    5
}

pub(crate) fn default_keywords() -> Vec<String> {
    ["policy", "impact", "regulation", "sector", "compliance"]
        .iter()
        .map(|k| k.to_string())
        .collect()
}

fn default_ocr_dpi() -> u32 {
    300
}

fn default_ocr_language() -> String {
    "eng".to_string()
}

fn default_ocr_timeout_secs() -> u64 {
    60
}

fn default_summarizer_endpoint() -> String {
    "https://openrouter.ai/api/v1/chat/completions".to_string()
}

fn default_api_key_env() -> String {
    "OPENROUTER_API_KEY".to_string()
}

fn default_summarizer_timeout_secs() -> u64 {
    30
}

fn default_throttle_ms() -> u64 {
    1000
}
