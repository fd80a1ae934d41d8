//! Configuration handling for lim-patterns

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Config file names searched in each directory, in order
pub const CONFIG_NAMES: [&str; 3] = [".lim-patterns.yaml", ".lim-patterns.yml", ".lim-patterns.json"];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadFile(#[from] std::io::Error),
    #[error("Failed to parse JSON config: {0}")]
    ParseJson(#[from] serde_json::Error),
    #[error("Failed to parse YAML config: {0}")]
    ParseYaml(#[from] serde_yaml::Error),
    #[error("Invalid glob pattern: {0}")]
    InvalidGlob(#[from] globset::Error),
    #[error("Unknown output format '{0}', expected text or json")]
    UnknownFormat(String),
}

/// Report format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(ConfigError::UnknownFormat(s.to_string())),
        }
    }
}

/// Pattern-name filter built from whitelist and blacklist globs
#[derive(Debug, Clone)]
pub struct NameFilter {
    whitelist: Option<GlobSet>,
    blacklist: GlobSet,
}

impl Default for NameFilter {
    fn default() -> Self {
        Self {
            whitelist: None,
            blacklist: GlobSet::empty(),
        }
    }
}

impl NameFilter {
    pub fn new(whitelist: &[String], blacklist: &[String]) -> Result<Self, ConfigError> {
        let whitelist = if whitelist.is_empty() {
            None
        } else {
            Some(build_globset(whitelist)?)
        };
        Ok(Self {
            whitelist,
            blacklist: build_globset(blacklist)?,
        })
    }

    /// Patterns with an empty name are never filtered
    pub fn allows(&self, name: &str) -> bool {
        if name.is_empty() {
            return true;
        }
        if let Some(whitelist) = &self.whitelist {
            if !whitelist.is_match(name) {
                return false;
            }
        }
        !self.blacklist.is_match(name)
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet, ConfigError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

/// Runtime configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Pattern files, folders or globs
    pub patterns: Vec<String>,
    /// Folder holding predefined patterns
    pub patterns_folder: Option<PathBuf>,
    pub whitelist: Vec<String>,
    pub blacklist: Vec<String>,
    /// Known metric names used to validate references
    pub metrics: Vec<String>,
    pub format: OutputFormat,
    /// Report file; stdout when unset
    pub output_file: Option<PathBuf>,
    /// Number of parallel jobs (0 = auto)
    pub jobs: usize,
}

/// CLI options to merge into config
#[derive(Debug, Default)]
pub struct CliOptions {
    /// Patterns given on the command line (replace config if any)
    pub patterns: Vec<String>,
    pub patterns_folder: Option<PathBuf>,
    /// Whitelist globs (replace config if any)
    pub whitelist: Vec<String>,
    /// Blacklist globs (add to config)
    pub blacklist: Vec<String>,
    /// Metric names (replace config if any)
    pub metrics: Vec<String>,
    pub format: Option<OutputFormat>,
    pub output_file: Option<PathBuf>,
    pub jobs: Option<usize>,
}

/// Output section of the config file
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct OutputSection {
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub file: Option<PathBuf>,
}

/// Configuration file format (.lim-patterns.yaml or .lim-patterns.json)
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ConfigFile {
    /// Pattern files, folders or globs, relative to the config file
    #[serde(default)]
    pub patterns: Vec<String>,

    /// Folder with predefined patterns, relative to the config file
    #[serde(default)]
    pub patterns_folder: Option<PathBuf>,

    /// Only run patterns whose name matches one of these globs
    #[serde(default)]
    pub whitelist: Vec<String>,

    /// Skip patterns whose name matches one of these globs
    #[serde(default)]
    pub blacklist: Vec<String>,

    /// Known metric names
    #[serde(default)]
    pub metrics: Vec<String>,

    #[serde(default)]
    pub output: OutputSection,

    /// Number of parallel jobs (0 = auto)
    #[serde(default)]
    pub jobs: usize,
}

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config_file: ConfigFile = if path.extension().is_some_and(|e| e == "yaml" || e == "yml")
        {
            serde_yaml::from_str(&content)?
        } else {
            serde_json::from_str(&content)?
        };

        let base = path.parent().unwrap_or_else(|| Path::new(""));
        Self::from_config_file(config_file, base)
    }

    /// Try to find and load config, walking up from `start_dir`
    pub fn find_and_load(start_dir: &Path) -> Result<Option<(PathBuf, Self)>, ConfigError> {
        let mut current = start_dir.to_path_buf();
        loop {
            for name in &CONFIG_NAMES {
                let config_path = current.join(name);
                if config_path.exists() {
                    let config = Self::from_file(&config_path)?;
                    return Ok(Some((config_path, config)));
                }
            }

            if !current.pop() {
                break;
            }
        }

        Ok(None)
    }

    /// Build config from a ConfigFile; relative paths resolve against `base`
    fn from_config_file(file: ConfigFile, base: &Path) -> Result<Self, ConfigError> {
        // Validate globs early
        NameFilter::new(&file.whitelist, &file.blacklist)?;

        let format = match &file.output.format {
            Some(format) => format.parse()?,
            None => OutputFormat::default(),
        };

        let resolve = |p: &Path| {
            if p.is_absolute() || base.as_os_str().is_empty() {
                p.to_path_buf()
            } else {
                base.join(p)
            }
        };

        Ok(Self {
            patterns: file
                .patterns
                .iter()
                .map(|p| resolve(Path::new(p)).display().to_string())
                .collect(),
            patterns_folder: file.patterns_folder.as_deref().map(resolve),
            whitelist: file.whitelist,
            blacklist: file.blacklist,
            metrics: file.metrics,
            format,
            output_file: file.output.file,
            jobs: file.jobs,
        })
    }

    /// Merge CLI options into this config (CLI takes precedence)
    pub fn merge_cli(&mut self, opts: CliOptions) {
        if !opts.patterns.is_empty() {
            self.patterns = opts.patterns;
        }
        if opts.patterns_folder.is_some() {
            self.patterns_folder = opts.patterns_folder;
        }
        if !opts.whitelist.is_empty() {
            self.whitelist = opts.whitelist;
        }

        // CLI blacklist adds to config
        self.blacklist.extend(opts.blacklist);

        if !opts.metrics.is_empty() {
            self.metrics = opts.metrics;
        }
        if let Some(format) = opts.format {
            self.format = format;
        }
        if opts.output_file.is_some() {
            self.output_file = opts.output_file;
        }
        if let Some(jobs) = opts.jobs {
            self.jobs = jobs;
        }
    }

    /// Name filter for the configured whitelist and blacklist
    pub fn name_filter(&self) -> Result<NameFilter, ConfigError> {
        NameFilter::new(&self.whitelist, &self.blacklist)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.patterns.is_empty());
        assert_eq!(config.format, OutputFormat::Text);
        assert_eq!(config.jobs, 0);
    }

    #[test]
    fn test_yaml_config() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(".lim-patterns.yaml");
        fs::write(
            &path,
            r#"
patterns: [patterns/]
patternsFolder: predefined
whitelist: ["God*"]
blacklist: [GodMethod]
metrics: [LOC, NOA]
output:
  format: json
  file: report.json
jobs: 4
"#,
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.patterns, vec![temp.path().join("patterns/").display().to_string()]);
        assert_eq!(config.patterns_folder, Some(temp.path().join("predefined")));
        assert_eq!(config.metrics, vec!["LOC", "NOA"]);
        assert_eq!(config.format, OutputFormat::Json);
        assert_eq!(config.output_file, Some(PathBuf::from("report.json")));
        assert_eq!(config.jobs, 4);

        let filter = config.name_filter().unwrap();
        assert!(filter.allows("GodClass"));
        assert!(!filter.allows("GodMethod"));
        assert!(!filter.allows("LongMethod"));
    }

    #[test]
    fn test_json_config() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(".lim-patterns.json");
        fs::write(&path, r#"{"blacklist": ["Tmp*"], "output": {"format": "text"}}"#).unwrap();

        let config = Config::from_file(&path).unwrap();
        let filter = config.name_filter().unwrap();
        assert!(filter.allows("GodClass"));
        assert!(!filter.allows("TmpPattern"));
    }

    #[test]
    fn test_invalid_config() {
        let temp = TempDir::new().unwrap();
        let bad_glob = temp.path().join("glob.yaml");
        fs::write(&bad_glob, "whitelist: [\"[\"]\n").unwrap();
        assert!(matches!(Config::from_file(&bad_glob), Err(ConfigError::InvalidGlob(_))));

        let bad_format = temp.path().join("format.yaml");
        fs::write(&bad_format, "output: {format: xml}\n").unwrap();
        assert!(matches!(Config::from_file(&bad_format), Err(ConfigError::UnknownFormat(_))));
    }

    #[test]
    fn test_find_and_load_walks_up() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(".lim-patterns.yml"), "jobs: 2\n").unwrap();
        let nested = temp.path().join("a/b");
        fs::create_dir_all(&nested).unwrap();

        let (path, config) = Config::find_and_load(&nested).unwrap().unwrap();
        assert_eq!(path, temp.path().join(".lim-patterns.yml"));
        assert_eq!(config.jobs, 2);
    }

    #[test]
    fn test_merge_cli() {
        let mut config = Config {
            patterns: vec!["from-config".into()],
            blacklist: vec!["A".into()],
            jobs: 3,
            ..Default::default()
        };
        config.merge_cli(CliOptions {
            blacklist: vec!["B".into()],
            format: Some(OutputFormat::Json),
            ..Default::default()
        });
        assert_eq!(config.patterns, vec!["from-config"]);
        assert_eq!(config.blacklist, vec!["A", "B"]);
        assert_eq!(config.format, OutputFormat::Json);
        assert_eq!(config.jobs, 3);

        config.merge_cli(CliOptions {
            patterns: vec!["cli".into()],
            jobs: Some(1),
            ..Default::default()
        });
        assert_eq!(config.patterns, vec!["cli"]);
        assert_eq!(config.jobs, 1);
    }

    #[test]
    fn test_empty_name_never_filtered() {
        let filter = NameFilter::new(&["God*".into()], &["*".into()]).unwrap();
        assert!(filter.allows(""));
        assert!(!filter.allows("GodClass"));
    }
}
