//! Plain text report

use super::OutputFormatter;
use crate::engine::RunStats;
use crate::recorder::PatternMatch;
use colored::*;

/// Text formatter with optional color support
pub struct TextFormatter {
    /// Enable colored output
    pub colored: bool,

    /// Show the per-pattern counters
    pub show_counts: bool,

    /// Show variables recorded by write-to-graph roles
    pub show_variables: bool,
}

impl Default for TextFormatter {
    fn default() -> Self {
        Self {
            colored: true,
            show_counts: true,
            show_variables: true,
        }
    }
}

impl TextFormatter {
    /// Create a new text formatter
    pub fn new() -> Self {
        Self::default()
    }

    /// Disable colors
    pub fn without_color(mut self) -> Self {
        self.colored = false;
        self
    }

    fn highlight(&self, text: &str) -> ColoredString {
        if self.colored {
            text.yellow().bold()
        } else {
            text.normal()
        }
    }
}

impl OutputFormatter for TextFormatter {
    fn format(&self, matches: &[PatternMatch], stats: &RunStats) -> String {
        let mut output = format!("Total matches: {}\n", matches.len());
        if self.show_counts {
            for (name, count) in &stats.per_pattern {
                output.push_str(&format!("{} matches: {}\n", name, count));
            }
        }
        for found in matches {
            output.push_str(&self.format_match(found));
        }
        output
    }

    fn format_match(&self, found: &PatternMatch) -> String {
        let mut output = String::new();

        for entry in &found.trace {
            let tabs = "\t".repeat(entry.depth);
            if !entry.pattern_name.is_empty() {
                if entry.depth == 0 {
                    output.push('\n');
                }
                output.push_str(&format!(
                    "{}Pattern '{}' has been found on '{}'\n",
                    tabs,
                    self.highlight(&entry.pattern_name),
                    entry.node_name
                ));
                if let Some(position) = &entry.position {
                    output.push_str(&format!("{}Source : {}\n", tabs, position));
                }
            }

            output.push_str(&format!(
                "{}Role '{}' fits on '{}' (nodeid '{}')",
                tabs, entry.role, entry.node_name, entry.node
            ));
            if let Some(position) = &entry.position {
                output.push_str(&format!(", {}", position));
            }
            output.push('\n');

            if self.show_variables {
                for variable in found.variables.iter().filter(|v| v.node == entry.node) {
                    output.push_str(&format!("{}\t- {} : {}\n", tabs, variable.name, variable.value));
                }
            }
        }

        if let Some(message) = &found.message {
            output.push_str(&format!("{}\n", message));
        }
        output
    }
}
