//! Pattern loader - turns pattern files, folders and globs into documents

use crate::compiler::{compile_document, parse_documents, CompileError, DOCUMENT_EXTENSIONS};
use crate::document::PatternDocument;
use crate::script::{ScriptError, ScriptHost};
use log::{debug, info, warn};
use rayon::prelude::*;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Script extensions recognised when no host is registered
const SCRIPT_EXTENSIONS: [&str; 1] = ["py"];

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Pattern input not found: {0}")]
    NotFound(String),
    #[error("Invalid glob pattern '{pattern}': {source}")]
    Glob {
        pattern: String,
        source: glob::PatternError,
    },
    #[error("Unsupported pattern file: {0}")]
    Unsupported(PathBuf),
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("{path} (document {index}): {source}")]
    Compile {
        path: PathBuf,
        index: usize,
        source: CompileError,
    },
    #[error("No script host registered to load {0}")]
    NoScriptHost(PathBuf),
    #[error("Failed to load script {path}: {source}")]
    Script { path: PathBuf, source: ScriptError },
}

/// Documents that loaded and the files or documents that failed
#[derive(Debug, Default)]
pub struct LoadReport {
    pub documents: Vec<PatternDocument>,
    pub failures: Vec<LoadError>,
}

impl LoadReport {
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Append another report, keeping order
    pub fn merge(&mut self, other: LoadReport) {
        self.documents.extend(other.documents);
        self.failures.extend(other.failures);
    }

    fn failed(error: LoadError) -> Self {
        Self {
            documents: Vec::new(),
            failures: vec![error],
        }
    }
}

/// Loads and compiles pattern documents
#[derive(Default)]
pub struct PatternLoader {
    /// Folder searched for predefined pattern references
    patterns_folder: Option<PathBuf>,
    /// Known metric names; empty accepts any name
    metrics: BTreeSet<String>,
    script_host: Option<Arc<dyn ScriptHost>>,
    /// Number of parallel jobs (0 = auto)
    jobs: usize,
}

impl PatternLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_patterns_folder(mut self, folder: impl Into<PathBuf>) -> Self {
        self.patterns_folder = Some(folder.into());
        self
    }

    pub fn with_metrics<I, S>(mut self, metrics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.metrics = metrics.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_script_host(mut self, host: Arc<dyn ScriptHost>) -> Self {
        self.script_host = Some(host);
        self
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs;
        self
    }

    fn is_script(&self, extension: &str) -> bool {
        match &self.script_host {
            Some(host) => host.extensions().contains(&extension),
            None => SCRIPT_EXTENSIONS.contains(&extension),
        }
    }

    fn is_supported(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| DOCUMENT_EXTENSIONS.contains(&e) || self.is_script(e))
    }

    /// Expand files, folders (recursively) and glob patterns into pattern
    /// files, keeping the input order
    pub fn collect_files(&self, inputs: &[String]) -> (Vec<PathBuf>, Vec<LoadError>) {
        let mut files = Vec::new();
        let mut failures = Vec::new();

        for input in inputs {
            let path = Path::new(input);
            if path.is_file() {
                if self.is_supported(path) {
                    files.push(path.to_path_buf());
                } else {
                    failures.push(LoadError::Unsupported(path.to_path_buf()));
                }
                continue;
            }

            let pattern = if path.is_dir() {
                format!("{}/**/*", glob::Pattern::escape(input.trim_end_matches('/')))
            } else if input.contains(['*', '?', '[']) {
                input.clone()
            } else {
                failures.push(LoadError::NotFound(input.clone()));
                continue;
            };

            match glob::glob(&pattern) {
                Ok(entries) => {
                    let mut matched: Vec<PathBuf> = entries
                        .filter_map(Result::ok)
                        .filter(|p| p.is_file() && self.is_supported(p))
                        .collect();
                    matched.sort();
                    if matched.is_empty() && !path.is_dir() {
                        warn!("No pattern files match '{}'", input);
                    }
                    files.extend(matched);
                }
                Err(source) => failures.push(LoadError::Glob {
                    pattern: input.clone(),
                    source,
                }),
            }
        }

        (files, failures)
    }

    /// Load every input; compile failures never stop the other files
    pub fn load(&self, inputs: &[String]) -> LoadReport {
        let (files, mut failures) = self.collect_files(inputs);
        let mut report = self.load_files(&files);
        failures.append(&mut report.failures);
        report.failures = failures;

        info!(
            "Loaded {} pattern document(s) from {} file(s)",
            report.documents.len(),
            files.len()
        );
        for failure in &report.failures {
            warn!("{}", failure);
        }
        report
    }

    /// Load files in parallel, reporting in input order
    pub fn load_files(&self, files: &[PathBuf]) -> LoadReport {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(if self.jobs > 0 {
                self.jobs
            } else {
                num_cpus::get()
            })
            .build();

        let reports: Vec<LoadReport> = match pool {
            Ok(pool) => pool.install(|| files.par_iter().map(|f| self.load_file(f)).collect()),
            Err(e) => {
                debug!("Falling back to sequential loading: {}", e);
                files.iter().map(|f| self.load_file(f)).collect()
            }
        };

        let mut combined = LoadReport::default();
        for report in reports {
            combined.merge(report);
        }
        combined
    }

    /// Load one pattern or script file
    pub fn load_file(&self, path: &Path) -> LoadReport {
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        if self.is_script(extension) {
            let Some(host) = &self.script_host else {
                return LoadReport::failed(LoadError::NoScriptHost(path.to_path_buf()));
            };
            return match host.load(path) {
                Ok(script) => {
                    debug!("Loaded script {}", path.display());
                    LoadReport {
                        documents: vec![PatternDocument::from_script(script, path)],
                        failures: Vec::new(),
                    }
                }
                Err(source) => LoadReport::failed(LoadError::Script {
                    path: path.to_path_buf(),
                    source,
                }),
            };
        }

        if !DOCUMENT_EXTENSIONS.contains(&extension) {
            return LoadReport::failed(LoadError::Unsupported(path.to_path_buf()));
        }

        match fs::read_to_string(path) {
            Ok(content) => self.load_str(&content, extension, path),
            Err(source) => LoadReport::failed(LoadError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Compile the documents of one file's content; each document gets its
    /// own compiler and role table
    pub fn load_str(&self, content: &str, extension: &str, source: &Path) -> LoadReport {
        let documents = match parse_documents(content, extension) {
            Ok(documents) => documents,
            Err(e) => {
                return LoadReport::failed(LoadError::Parse {
                    path: source.to_path_buf(),
                    source: e,
                })
            }
        };

        let mut report = LoadReport::default();
        for (index, document) in documents.iter().enumerate() {
            match compile_document(document, self.patterns_folder.as_deref(), &self.metrics) {
                Ok((root, roles)) => {
                    debug!(
                        "Compiled pattern '{}' from {} (document {})",
                        root.meta.name,
                        source.display(),
                        index
                    );
                    report
                        .documents
                        .push(PatternDocument::from_node_type(root, roles, source, index));
                }
                Err(e) => report.failures.push(LoadError::Compile {
                    path: source.to_path_buf(),
                    index,
                    source: e,
                }),
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NodeKind;
    use crate::script::{NodeBinding, ScriptCondition};
    use tempfile::TempDir;

    const STATIC_MEMBERS: &str = r#"
name: UtilityClass
kind: class
role: c
conditions:
  all:
    edge: Scope_HasMember
    kind: method
    role: m
    filters: "isStatic == true"
"#;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_multi_document_yaml() {
        let content = format!(
            "{}\n---\nname: LongMethod\nkind: method\nrole: m\nconditions: \"LOC > 100\"\n",
            STATIC_MEMBERS
        );
        let report = PatternLoader::new().load_str(&content, "yaml", Path::new("p.yaml"));
        assert!(!report.has_failures());
        let names: Vec<_> = report.documents.iter().map(|d| d.name()).collect();
        assert_eq!(names, vec!["UtilityClass", "LongMethod"]);
        assert_eq!(report.documents[1].index, 1);
    }

    #[test]
    fn test_bad_document_keeps_others() {
        let content = format!("{}\n---\nname: Broken\nkind: widget\nrole: x\n", STATIC_MEMBERS);
        let report = PatternLoader::new().load_str(&content, "yml", Path::new("p.yml"));
        assert_eq!(report.documents.len(), 1);
        assert_eq!(report.failures.len(), 1);
        assert!(matches!(
            report.failures[0],
            LoadError::Compile { index: 1, source: CompileError::UnknownKind(_), .. }
        ));
    }

    #[test]
    fn test_roles_are_per_document() {
        // the same role name in two documents is not a duplicate
        let content = "name: A\nkind: class\nrole: c\n---\nname: B\nkind: class\nrole: c\n";
        let report = PatternLoader::new().load_str(content, "yaml", Path::new("p.yaml"));
        assert!(!report.has_failures());
        assert_eq!(report.documents.len(), 2);
    }

    #[test]
    fn test_json_document() {
        let content = r#"{"name": "Classes", "kind": "ndkClass", "role": "c"}"#;
        let report = PatternLoader::new().load_str(content, "json", Path::new("p.json"));
        assert_eq!(report.documents.len(), 1);
        assert_eq!(report.documents[0].name(), "Classes");
    }

    #[test]
    fn test_parse_error() {
        let report = PatternLoader::new().load_str("kind: [class", "yaml", Path::new("p.yaml"));
        assert!(matches!(report.failures[0], LoadError::Parse { .. }));
    }

    #[test]
    fn test_directory_is_recursive_and_sorted() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "b.yaml", STATIC_MEMBERS);
        write(temp.path(), "nested/a.yml", "name: Nested\nkind: class\nrole: c\n");
        write(temp.path(), "notes.txt", "not a pattern");

        let loader = PatternLoader::new();
        let (files, failures) = loader.collect_files(&[temp.path().display().to_string()]);
        assert!(failures.is_empty());
        let names: Vec<_> = files
            .iter()
            .map(|f| f.strip_prefix(temp.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(names, vec![PathBuf::from("b.yaml"), PathBuf::from("nested/a.yml")]);
    }

    #[test]
    fn test_globs_and_missing_inputs() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "one.yaml", STATIC_MEMBERS);
        write(temp.path(), "two.json", r#"{"name": "T", "kind": "class", "role": "c"}"#);

        let loader = PatternLoader::new();
        let glob = format!("{}/*.yaml", temp.path().display());
        let missing = temp.path().join("missing.yaml").display().to_string();
        let (files, failures) = loader.collect_files(&[glob, missing]);
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("one.yaml"));
        assert!(matches!(failures[0], LoadError::NotFound(_)));
    }

    #[test]
    fn test_load_keeps_input_order() {
        let temp = TempDir::new().unwrap();
        let first = write(temp.path(), "z.yaml", "name: Z\nkind: class\nrole: c\n");
        let second = write(temp.path(), "a.yaml", "name: A\nkind: class\nrole: c\n");

        let report = PatternLoader::new().with_jobs(2).load(&[
            first.display().to_string(),
            second.display().to_string(),
        ]);
        let names: Vec<_> = report.documents.iter().map(|d| d.name()).collect();
        assert_eq!(names, vec!["Z", "A"]);
    }

    #[test]
    fn test_script_without_host() {
        let temp = TempDir::new().unwrap();
        let script = write(temp.path(), "big.py", "def visit(node): pass\n");
        let report = PatternLoader::new().load_file(&script);
        assert!(matches!(report.failures[0], LoadError::NoScriptHost(_)));
    }

    #[derive(Debug)]
    struct Everything;

    impl ScriptCondition for Everything {
        fn node_kind_filter(&self) -> NodeKind {
            NodeKind::Base
        }

        fn visit(&self, _node: &NodeBinding<'_>) -> Result<Option<String>, ScriptError> {
            Ok(Some("seen".into()))
        }
    }

    struct TestHost;

    impl ScriptHost for TestHost {
        fn load(&self, _path: &Path) -> Result<Box<dyn ScriptCondition>, ScriptError> {
            Ok(Box::new(Everything))
        }
    }

    #[test]
    fn test_script_with_host() {
        let temp = TempDir::new().unwrap();
        let script = write(temp.path(), "everything.py", "");
        let report = PatternLoader::new()
            .with_script_host(Arc::new(TestHost))
            .load_file(&script);
        assert!(!report.has_failures());
        assert_eq!(report.documents[0].name(), "everything");
        assert!(report.documents[0].is_script());
    }

    #[test]
    fn test_predefined_folder_is_used() {
        let temp = TempDir::new().unwrap();
        write(
            temp.path(),
            "StaticOnly.yaml",
            "name: StaticOnly\nkind: method\nrole: s\nfilters: \"isStatic == true\"\n",
        );
        let content = "name: Uses\nkind: class\nrole: c\nconditions:\n  all:\n    edge: Scope_HasMember\n    kind: method\n    role: m\n    conditions:\n      StaticOnly: StaticOnly.yaml\n";
        let loader = PatternLoader::new().with_patterns_folder(temp.path());
        let report = loader.load_str(content, "yaml", Path::new("uses.yaml"));
        assert!(!report.has_failures(), "{:?}", report.failures);
        assert_eq!(report.documents.len(), 1);
    }
}
