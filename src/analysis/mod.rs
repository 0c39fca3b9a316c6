//! Policy analysis
//!
//! Derives a title and date from document text with simple patterns, then
//! asks a chat-completions model for a summary, the affected groups and a
//! short impact statement per sector.

mod client;

pub use client::{ModelClient, ModelReply};

use crate::extract::truncate_chars;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Characters of document text sent with the summary and affected prompts
const DOCUMENT_PROMPT_CHARS: usize = 2000;
/// Characters of document text sent with each sector prompt
const SECTOR_PROMPT_CHARS: usize = 1500;

/// Sectors asked about, with the phrase used in the prompt
pub const SECTORS: [(&str, &str); 9] = [
    ("Banking", "banking sector"),
    ("Insurance", "insurance sector"),
    ("Healthcare", "healthcare sector"),
    ("Legal", "legal sector"),
    ("Technology", "technology sector"),
    ("Education", "education sector"),
    ("Public", "public sector"),
    ("Environment", "environmental sector"),
    ("Employment", "employment sector"),
];

const NO_SECTOR: &str = "None";
const NO_SECTOR_TEXT: &str = "No sector significantly mentioned.";
const NO_DATE: &str = "Not specified";

static TITLE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)cited as the (.*?) Act").expect("valid title pattern"));

static DATE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b\d{1,2}(st|nd|rd|th)?\s+(January|February|March|April|May|June|July|August|September|October|November|December)\s+\d{4}",
    )
    .expect("valid date pattern")
});

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Model did not return text: {0}")]
    Model(String),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

/// Result of analysing one policy document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyAnalysis {
    pub title: String,
    pub date: String,
    pub summary: String,
    pub affected: String,
    /// Sector name to impact statement, only for sectors the model addressed
    pub sector_impacts: BTreeMap<String, String>,
    pub most_sector: String,
    pub most_text: String,
}

/// Extracts a title and a date from document text
///
/// The title comes from a "cited as the ... Act" clause when present,
/// otherwise from the first line of the first 100 characters. The date is
/// the first "12th March 2021" style date, or "Not specified".
///
/// # Examples
///
/// ```
/// use policy_harvester::analysis::extract_title_and_date;
///
/// let (title, date) =
///     extract_title_and_date("This may be cited as the Data Protection Act, 3rd May 2018.");
/// assert_eq!(title, "Data Protection Act");
/// assert_eq!(date, "3rd May 2018");
/// ```
pub fn extract_title_and_date(text: &str) -> (String, String) {
    let title = match TITLE_PATTERN.captures(text).and_then(|c| c.get(1)) {
        Some(m) => format!("{} Act", m.as_str().trim()),
        None => truncate_chars(text, 100)
            .split('\n')
            .next()
            .unwrap_or_default()
            .trim()
            .to_string(),
    };

    let date = DATE_PATTERN
        .find(text)
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| NO_DATE.to_string());

    (title, date)
}

/// Analyses document text with the model
///
/// # Arguments
///
/// * `text` - Raw document text
/// * `client` - Chat-completions client
/// * `throttle` - Pause after each sector prompt
///
/// # Returns
///
/// * `Ok(PolicyAnalysis)` - Summary and affected groups were produced
/// * `Err(AnalysisError::Model)` - The summary or affected prompt got no text
pub async fn analyze_document(
    text: &str,
    client: &ModelClient,
    throttle: Duration,
) -> Result<PolicyAnalysis, AnalysisError> {
    let (title, date) = extract_title_and_date(text);
    info!("Analysing \"{}\" with {}", title, client.model());

    let excerpt = truncate_chars(text, DOCUMENT_PROMPT_CHARS);
    let summary = client
        .ask(&format!(
            "Provide a clear professional summary (5-7 lines) for the following policy document.\n\n{}",
            excerpt
        ))
        .await
        .into_text()?;

    let affected = client
        .ask(&format!(
            "From the text, briefly list (in 2-3 lines) which groups, individuals, or sectors are affected by this policy.\n\n{}",
            excerpt
        ))
        .await
        .into_text()?;

    let impacts = sector_impacts(text, client, throttle).await;
    let (most_sector, most_text) = most_affected(&impacts);

    Ok(PolicyAnalysis {
        title,
        date,
        summary,
        affected,
        sector_impacts: impacts.into_iter().collect(),
        most_sector,
        most_text,
    })
}

/// Asks about each sector in order; sectors without a usable answer are left out
async fn sector_impacts(
    text: &str,
    client: &ModelClient,
    throttle: Duration,
) -> Vec<(String, String)> {
    let excerpt = truncate_chars(text, SECTOR_PROMPT_CHARS);
    let mut impacts = Vec::new();

    for (sector, phrase) in SECTORS {
        let prompt = format!(
            "From the following policy document, provide a short professional summary (4-6 lines) \
             of how this policy affects the {}. Use only what's stated in the text.\n\n{}",
            phrase, excerpt
        );
        match client.ask(&prompt).await {
            ModelReply::Text(answer) if is_substantive(&answer) => {
                impacts.push((sector.to_string(), answer));
            }
            reply => debug!("No impact recorded for {}: {:?}", sector, reply),
        }
        if !throttle.is_zero() {
            tokio::time::sleep(throttle).await;
        }
    }

    impacts
}

fn is_substantive(answer: &str) -> bool {
    let lower = answer.trim().to_lowercase();
    !matches!(lower.as_str(), "" | "not mentioned" | "none" | "n/a")
}

/// Picks the sector with the longest answer by word count; earlier sectors win ties
fn most_affected(impacts: &[(String, String)]) -> (String, String) {
    let mut best: Option<(&String, &String, usize)> = None;
    for (sector, answer) in impacts {
        let words = answer.split_whitespace().count();
        if best.map_or(true, |(_, _, most)| words > most) {
            best = Some((sector, answer, words));
        }
    }

    match best {
        Some((sector, answer, _)) => (sector.clone(), answer.clone()),
        None => (NO_SECTOR.to_string(), NO_SECTOR_TEXT.to_string()),
    }
}
