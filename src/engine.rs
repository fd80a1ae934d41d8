//! Pattern engine - runs every document against every node of a graph

use crate::condition::Condition;
use crate::config::NameFilter;
use crate::context::{EvaluationContext, RoleTable};
use crate::document::PatternDocument;
use crate::model::{CodeGraph, NodeKind};
use crate::recorder::{PatternMatch, Recorder, TraceRecorder};
use log::{debug, error, info};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Result of a run over one graph
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunStats {
    /// Nodes visited in preorder
    pub nodes_visited: usize,

    /// Documents taking part in the run
    pub documents: usize,

    /// (node, document) evaluations performed
    pub evaluations: usize,

    /// Warnings emitted
    pub matches: usize,

    /// Warnings per pattern name
    pub per_pattern: BTreeMap<String, usize>,

    /// Documents disabled by an evaluation error
    pub failed_documents: usize,

    /// Processing duration
    pub duration: Duration,
}

impl RunStats {
    pub fn has_matches(&self) -> bool {
        self.matches > 0
    }

    /// Get exit code (0 = no matches, 1 = matches found)
    pub fn exit_code(&self) -> u8 {
        if self.has_matches() {
            1
        } else {
            0
        }
    }

    /// Merge another result into this one
    pub fn merge(&mut self, other: RunStats) {
        self.nodes_visited += other.nodes_visited;
        self.documents = self.documents.max(other.documents);
        self.evaluations += other.evaluations;
        self.matches += other.matches;
        self.failed_documents += other.failed_documents;
        self.duration += other.duration;
        for (name, count) in other.per_pattern {
            *self.per_pattern.entry(name).or_insert(0) += count;
        }
    }
}

/// Holds compiled documents and drives their evaluation
#[derive(Debug, Default)]
pub struct Engine {
    documents: Vec<PatternDocument>,
}

impl Engine {
    pub fn new(documents: Vec<PatternDocument>) -> Self {
        Self { documents }
    }

    /// Drop documents whose name the filter rejects
    pub fn with_filter(mut self, filter: &NameFilter) -> Self {
        self.documents.retain(|doc| {
            let allowed = filter.allows(doc.name());
            if !allowed {
                debug!("Skipping pattern '{}'", doc.name());
            }
            allowed
        });
        self
    }

    pub fn documents(&self) -> &[PatternDocument] {
        &self.documents
    }

    /// Evaluate every document on every node in preorder
    pub fn run(&self, graph: &dyn CodeGraph, recorder: &mut dyn Recorder) -> RunStats {
        let start = Instant::now();
        let mut stats = RunStats {
            documents: self.documents.len(),
            ..RunStats::default()
        };

        let tables: Vec<RoleTable> = self.documents.iter().map(|d| d.roles.clone()).collect();
        let mut disabled = vec![false; self.documents.len()];
        let mut ctx = EvaluationContext::new(tables, recorder);

        for node in graph.preorder() {
            stats.nodes_visited += 1;

            for (index, doc) in self.documents.iter().enumerate() {
                if disabled[index] {
                    continue;
                }
                ctx.set_document(index);
                ctx.recorder().begin_trace();
                stats.evaluations += 1;

                match doc.root.test(graph, node, &mut ctx) {
                    Ok(true) => {
                        let is_member = graph
                            .kind(node)
                            .is_some_and(|k| graph.is_subtype(k, NodeKind::Member));
                        if is_member {
                            if matches!(doc.root, Condition::Script(_)) {
                                ctx.recorder().add_trace_entry(node, "", doc.name(), 0);
                            }
                            let message = ctx.take_message();
                            ctx.recorder()
                                .emit_warning(graph, node, &doc.meta, message.as_deref());
                            info!("[Found on '{}']", node);
                            stats.matches += 1;
                            *stats.per_pattern.entry(doc.name().to_string()).or_insert(0) += 1;
                        } else {
                            debug!("Pattern '{}' matched non-member node {}", doc.name(), node);
                        }
                    }
                    Ok(false) => {}
                    Err(e) => {
                        error!(
                            "Pattern '{}' ({}) aborted on node {}: {}",
                            doc.name(),
                            doc.source.display(),
                            node,
                            e
                        );
                        disabled[index] = true;
                        stats.failed_documents += 1;
                    }
                }
                ctx.reset_document();
            }
        }

        stats.duration = start.elapsed();
        stats
    }

    /// Run with a fresh [`TraceRecorder`] and return its matches
    pub fn run_traced(&self, graph: &dyn CodeGraph) -> (RunStats, Vec<PatternMatch>) {
        let mut recorder = TraceRecorder::new();
        let stats = self.run(graph, &mut recorder);
        (stats, recorder.into_matches())
    }
}
