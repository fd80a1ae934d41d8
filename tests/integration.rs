//! Integration tests for lim-patterns

use lim_patterns::{
    config::Config,
    loader::{LoadError, PatternLoader},
    model::MemoryGraph,
    output::{JsonFormatter, OutputFormatter, TextFormatter},
    CompileError, Engine, NodeBinding, NodeKind, ScriptCondition, ScriptError, ScriptHost,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn fixture(name: &str) -> String {
    fixtures_path().join(name).display().to_string()
}

fn load_graph() -> MemoryGraph {
    MemoryGraph::from_file(&fixtures_path().join("graph.json")).unwrap()
}

#[test]
fn test_load_graph_fixture() {
    let graph = load_graph();
    assert_eq!(graph.len(), 12);
}

#[test]
fn test_load_patterns_folder() {
    let report = PatternLoader::new().load(&[fixture("patterns")]);
    assert!(!report.has_failures(), "{:?}", report.failures);

    let names: Vec<_> = report.documents.iter().map(|d| d.name()).collect();
    assert_eq!(
        names,
        vec!["LargeClass", "LongMethod", "LongParameterList", "UtilityClass"]
    );
}

#[test]
fn test_run_patterns_on_graph() {
    let report = PatternLoader::new().load(&[fixture("patterns")]);
    let engine = Engine::new(report.documents);
    let (stats, matches) = engine.run_traced(&load_graph());

    assert_eq!(stats.nodes_visited, 12);
    assert_eq!(stats.failed_documents, 0);
    assert_eq!(stats.matches, 4);

    let found: Vec<_> = matches
        .iter()
        .map(|m| (m.pattern_name.as_str(), m.node_name.as_str()))
        .collect();
    assert_eq!(
        found,
        vec![
            ("UtilityClass", "MathUtils"),
            ("LargeClass", "Shape"),
            ("LongMethod", "area"),
            ("LongParameterList", "area"),
        ]
    );
    assert_eq!(stats.exit_code(), 1);
}

#[test]
fn test_text_report() {
    let report = PatternLoader::new().load(&[fixture("patterns/utility_class.yaml")]);
    let (stats, matches) = Engine::new(report.documents).run_traced(&load_graph());

    let output = TextFormatter::new().without_color().format(&matches, &stats);
    assert!(output.starts_with("Total matches: 1\nUtilityClass matches: 1\n"));
    assert!(output.contains("Pattern 'UtilityClass' has been found on 'MathUtils'\n"));
    assert!(output.contains("Source : src/math_utils.cpp [Ln:3, Col:1 - Ln:42, Col:2]\n"));
    assert!(output.contains("\tRole 'm' fits on 'max' (nodeid '3')\n"));
    assert!(output.contains("\tRole 'm' fits on 'min' (nodeid '4')\n"));
}

#[test]
fn test_json_report() {
    let report = PatternLoader::new().load(&[fixture("patterns/long_methods.yml")]);
    let (stats, matches) = Engine::new(report.documents).run_traced(&load_graph());

    let output = JsonFormatter::new().pretty().format(&matches, &stats);
    let value: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert_eq!(value["summary"]["totalMatches"], 2);
    assert_eq!(value["matches"][0]["patternName"], "LongMethod");
    assert_eq!(value["matches"][0]["position"]["path"], "src/shape.cpp");
    assert_eq!(value["matches"][1]["patternName"], "LongParameterList");
}

#[test]
fn test_broken_pattern_does_not_stop_others() {
    let report =
        PatternLoader::new().load(&[fixture("broken"), fixture("patterns/utility_class.yaml")]);
    assert_eq!(report.documents.len(), 1);
    assert_eq!(report.failures.len(), 1);
    assert!(matches!(
        &report.failures[0],
        LoadError::Compile {
            source: CompileError::UnknownKind(kind),
            ..
        } if kind == "widget"
    ));
}

#[test]
fn test_predefined_patterns() {
    let without_folder = PatternLoader::new().load(&[fixture("uses_predefined")]);
    assert!(matches!(
        &without_folder.failures[0],
        LoadError::Compile {
            source: CompileError::NoPatternsFolder(_),
            ..
        }
    ));

    let report = PatternLoader::new()
        .with_patterns_folder(fixtures_path().join("predefined"))
        .load(&[fixture("uses_predefined")]);
    assert!(!report.has_failures(), "{:?}", report.failures);

    let (_, matches) = Engine::new(report.documents).run_traced(&load_graph());
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].node_name, "Shape");
    assert!(matches[0]
        .trace
        .iter()
        .any(|t| t.pattern_name == "LongBody" && t.node_name == "area"));
}

#[test]
fn test_known_metrics_validation() {
    let content = "name: Long\nkind: method\nrole: m\nconditions: \"m.LOC > 100\"\n\
        ---\nname: Wide\nkind: class\nrole: c\nconditions: \"c.NOA > 10\"\n\
        ---\nname: Params\nkind: method\nrole: m\nconditions: \"m.parameterSize > 3\"\n";
    let report = PatternLoader::new()
        .with_metrics(["NOA"])
        .load_str(content, "yaml", Path::new("metrics.yaml"));

    // LOC is not a known metric, parameterSize is a LIM attribute
    let names: Vec<_> = report.documents.iter().map(|d| d.name()).collect();
    assert_eq!(names, vec!["Wide", "Params"]);
    assert!(matches!(
        &report.failures[0],
        LoadError::Compile {
            index: 0,
            source: CompileError::InvalidReference { segment, .. },
            ..
        } if segment == "LOC"
    ));
}

#[test]
fn test_config_filters_patterns() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join(".lim-patterns.yaml"),
        format!(
            "patterns: [\"{}\"]\nblacklist: [\"Long*\"]\noutput:\n  format: json\n",
            fixture("patterns")
        ),
    )
    .unwrap();

    let (_, config) = Config::find_and_load(temp.path()).unwrap().unwrap();
    let report = PatternLoader::new().load(&config.patterns);
    let engine = Engine::new(report.documents).with_filter(&config.name_filter().unwrap());

    let (stats, _) = engine.run_traced(&load_graph());
    assert_eq!(stats.documents, 2);
    assert_eq!(stats.matches, 2);
    assert!(stats.per_pattern.keys().all(|name| !name.starts_with("Long")));
}

#[derive(Debug)]
struct UnnamedParameters;

impl ScriptCondition for UnnamedParameters {
    fn node_kind_filter(&self) -> NodeKind {
        NodeKind::Method
    }

    fn visit(&self, node: &NodeBinding<'_>) -> Result<Option<String>, ScriptError> {
        let parameters: i64 = node.get_value("parameterSize")?.parse().unwrap_or(0);
        Ok((parameters > 3).then(|| format!("{} takes {} parameters", node.name(), parameters)))
    }

    fn name(&self) -> Option<&str> {
        Some("ManyParameters")
    }
}

struct FixedHost;

impl ScriptHost for FixedHost {
    fn load(&self, _path: &Path) -> Result<Box<dyn ScriptCondition>, ScriptError> {
        Ok(Box::new(UnnamedParameters))
    }
}

#[test]
fn test_script_patterns() {
    let temp = TempDir::new().unwrap();
    let script = temp.path().join("many_parameters.py");
    fs::write(&script, "# evaluated by the host\n").unwrap();

    let report = PatternLoader::new()
        .with_script_host(Arc::new(FixedHost))
        .load(&[temp.path().display().to_string()]);
    assert!(!report.has_failures(), "{:?}", report.failures);

    let (_, matches) = Engine::new(report.documents).run_traced(&load_graph());
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].pattern_name, "ManyParameters");
    assert_eq!(matches[0].message.as_deref(), Some("area takes 4 parameters"));
}
