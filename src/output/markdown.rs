//! Markdown report generation
//!
//! Renders a stored policy analysis as a human-readable markdown document.

use crate::analysis::PolicyAnalysis;
use crate::Result;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes a markdown report for an analysis
///
/// # Arguments
///
/// * `analysis` - The analysis to render
/// * `source` - Name of the analysed file or URL
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote the report
/// * `Err(HarvestError)` - Failed to write the report
pub fn write_analysis_report(
    analysis: &PolicyAnalysis,
    source: &str,
    output_path: &Path,
) -> Result<()> {
    let markdown = format_analysis_report(analysis, source);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats an analysis as markdown
pub fn format_analysis_report(analysis: &PolicyAnalysis, source: &str) -> String {
    let mut md = String::new();

    md.push_str(&format!("# {}\n\n", analysis.title));

    md.push_str(&format!("- **Source**: {}\n", source));
    md.push_str(&format!("- **Date**: {}\n", analysis.date));
    md.push_str(&format!(
        "- **Most affected sector**: {}\n\n",
        analysis.most_sector
    ));

    md.push_str("## Summary\n\n");
    md.push_str(&analysis.summary);
    md.push_str("\n\n");

    md.push_str("## Affected Groups\n\n");
    md.push_str(&analysis.affected);
    md.push_str("\n\n");

    md.push_str("## Sector Impacts\n\n");
    if analysis.sector_impacts.is_empty() {
        md.push_str(&analysis.most_text);
        md.push_str("\n");
    } else {
        for (sector, impact) in &analysis.sector_impacts {
            md.push_str(&format!("### {}\n\n{}\n\n", sector, impact));
        }
    }

    md
}
