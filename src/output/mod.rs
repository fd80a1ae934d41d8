//! Output formatters for pattern matches

mod json;
mod text;

pub use json::JsonFormatter;
pub use text::TextFormatter;

use crate::config::OutputFormat;
use crate::engine::RunStats;
use crate::recorder::PatternMatch;

/// Output formatter trait
pub trait OutputFormatter: Send + Sync {
    /// Format the whole report
    fn format(&self, matches: &[PatternMatch], stats: &RunStats) -> String;

    /// Format a single match
    fn format_match(&self, found: &PatternMatch) -> String;
}

/// Formatter for a configured format
pub fn formatter_for(format: OutputFormat, colored: bool) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::Text if colored => Box::new(TextFormatter::new()),
        OutputFormat::Text => Box::new(TextFormatter::new().without_color()),
        OutputFormat::Json => Box::new(JsonFormatter::new().pretty()),
    }
}
