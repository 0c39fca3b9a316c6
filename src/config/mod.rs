//! Configuration module for Policy Harvester
//!
//! This module handles loading, parsing, and validating TOML configuration files,
//! and resolving the external tools and secrets the configuration refers to.
//!
//! # Example
//!
//! ```no_run
//! use policy_harvester::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("config.toml")).unwrap();
//! println!("Batch size: {}", config.extraction.batch_size);
//! ```

mod parser;
mod resolve;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlDriver, CrawlerConfig, ExtractionConfig, FetchConfig, OutputConfig,
    SummarizerConfig, UserAgentConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};

pub use resolve::{resolve_api_key, resolve_tesseract, which};
