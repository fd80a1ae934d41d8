//! JSON output formatter

use super::OutputFormatter;
use crate::engine::RunStats;
use crate::recorder::PatternMatch;
use serde::Serialize;
use std::collections::BTreeMap;

/// JSON formatter for machine-readable output
#[derive(Default)]
pub struct JsonFormatter {
    /// Pretty print with indentation
    pub pretty: bool,
}

impl JsonFormatter {
    /// Create a new JSON formatter
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable pretty printing
    pub fn pretty(mut self) -> Self {
        self.pretty = true;
        self
    }

    fn to_string<T: Serialize>(&self, value: &T) -> String {
        let result = if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };
        result.unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
    }
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    matches: &'a [PatternMatch],
    summary: JsonSummary<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonSummary<'a> {
    total_matches: usize,
    per_pattern: &'a BTreeMap<String, usize>,
    nodes_visited: usize,
    documents: usize,
    evaluations: usize,
    failed_documents: usize,
    duration_ms: u128,
}

impl OutputFormatter for JsonFormatter {
    fn format(&self, matches: &[PatternMatch], stats: &RunStats) -> String {
        let output = JsonOutput {
            matches,
            summary: JsonSummary {
                total_matches: matches.len(),
                per_pattern: &stats.per_pattern,
                nodes_visited: stats.nodes_visited,
                documents: stats.documents,
                evaluations: stats.evaluations,
                failed_documents: stats.failed_documents,
                duration_ms: stats.duration.as_millis(),
            },
        };
        self.to_string(&output)
    }

    fn format_match(&self, found: &PatternMatch) -> String {
        self.to_string(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::PatternMeta;
    use crate::model::{MemoryGraph, NodeKind};
    use crate::recorder::{Recorder, TraceRecorder};

    #[test]
    fn test_json_report() {
        let mut graph = MemoryGraph::new();
        graph.add_node(1, NodeKind::Class).attr("name", "Utils");
        let mut recorder = TraceRecorder::new();
        recorder.begin_trace();
        recorder.add_trace_entry(1, "c", "UtilityClass", 0);
        recorder.emit_warning(&graph, 1, &PatternMeta::new("UtilityClass", "c"), None);

        let mut stats = RunStats {
            nodes_visited: 1,
            documents: 1,
            evaluations: 1,
            matches: 1,
            ..Default::default()
        };
        stats.per_pattern.insert("UtilityClass".into(), 1);

        let output = JsonFormatter::new().format(recorder.matches(), &stats);
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["summary"]["totalMatches"], 1);
        assert_eq!(value["summary"]["perPattern"]["UtilityClass"], 1);
        assert_eq!(value["matches"][0]["patternName"], "UtilityClass");
        assert_eq!(value["matches"][0]["warningName"], "UtilityClass_warning");
        assert_eq!(value["matches"][0]["trace"][0]["role"], "c");
        assert_eq!(value["matches"][0]["priority"], "Minor");
    }
}
