use crate::error::{BatchError, Result};
use crate::types::{Layout, RunMode, TimestampPolicy};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs::File;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "batch.yaml";
pub const DEFAULT_EXTENSION: &str = ".txt";
pub const DEFAULT_SCRIPT_SUFFIX: &str = ".R";
pub const DEFAULT_REFERENCE_SUFFIX: &str = ".txt";

/// Written back into the data folder by the analysis script.
pub const DEFAULT_EXCLUDE: &str = "out.txt";

/// `batch.yaml`: every key optional, missing keys keep the defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub extension: Option<String>,
    pub exclude: Option<Vec<String>>,
    pub policy: Option<TimestampPolicy>,
    pub mode: Option<RunMode>,
    pub layout: Option<Layout>,
    pub folder_prefix: Option<bool>,
    pub interpreter: Option<String>,
    pub script_suffix: Option<String>,
    pub reference_suffix: Option<String>,
    pub keep_script: Option<bool>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchConfig {
    pub extension: String,
    pub exclude: BTreeSet<String>,
    pub policy: TimestampPolicy,
    pub mode: RunMode,
    pub layout: Layout,
    pub folder_prefix: bool,
    pub interpreter: Option<String>,
    pub script_suffix: String,
    pub reference_suffix: String,
    pub keep_script: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            extension: DEFAULT_EXTENSION.to_string(),
            exclude: BTreeSet::from([DEFAULT_EXCLUDE.to_string()]),
            policy: TimestampPolicy::default(),
            mode: RunMode::default(),
            layout: Layout::default(),
            folder_prefix: false,
            interpreter: None,
            script_suffix: DEFAULT_SCRIPT_SUFFIX.to_string(),
            reference_suffix: DEFAULT_REFERENCE_SUFFIX.to_string(),
            keep_script: false,
        }
    }
}

impl BatchConfig {
    pub fn merge_file(mut self, file: FileConfig) -> Self {
        if let Some(v) = file.extension {
            self.extension = v;
        }
        if let Some(v) = file.exclude {
            self.exclude = v.into_iter().collect();
        }
        if let Some(v) = file.policy {
            self.policy = v;
        }
        if let Some(v) = file.mode {
            self.mode = v;
        }
        if let Some(v) = file.layout {
            self.layout = v;
        }
        if let Some(v) = file.folder_prefix {
            self.folder_prefix = v;
        }
        if file.interpreter.is_some() {
            self.interpreter = file.interpreter;
        }
        if let Some(v) = file.script_suffix {
            self.script_suffix = v;
        }
        if let Some(v) = file.reference_suffix {
            self.reference_suffix = v;
        }
        if let Some(v) = file.keep_script {
            self.keep_script = v;
        }
        self
    }
}

pub fn load_yaml(path: &Path) -> Result<FileConfig> {
    let file = File::open(path)
        .map_err(|e| BatchError::config(format!("open {}: {}", path.display(), e)))?;
    serde_yaml::from_reader(file)
        .map_err(|e| BatchError::config(format!("parse {}: {}", path.display(), e)))
}

/// Explicit path must exist; otherwise `batch.yaml` in `cwd` is optional.
pub fn load_layered(explicit: Option<&Path>, cwd: &Path) -> Result<BatchConfig> {
    let path: Option<PathBuf> = match explicit {
        Some(p) => Some(p.to_path_buf()),
        None => {
            let p = cwd.join(DEFAULT_CONFIG_FILE);
            p.is_file().then_some(p)
        }
    };

    let cfg = BatchConfig::default();
    match path {
        Some(p) => {
            log::info!("Loaded config from: {}", p.display());
            Ok(cfg.merge_file(load_yaml(&p)?))
        }
        None => Ok(cfg),
    }
}

pub fn parse_policy(s: &str) -> Result<TimestampPolicy> {
    match s.to_lowercase().as_str() {
        "created" | "ctime" | "creation" => Ok(TimestampPolicy::Created),
        "modified" | "mtime" | "modification" => Ok(TimestampPolicy::Modified),
        other => Err(BatchError::config(format!(
            "unknown timestamp policy '{other}' (expected created|modified)"
        ))),
    }
}

pub fn parse_mode(s: &str) -> Result<RunMode> {
    match s.to_lowercase().as_str() {
        "batch" => Ok(RunMode::Batch),
        "each" => Ok(RunMode::Each),
        other => Err(BatchError::config(format!(
            "unknown run mode '{other}' (expected batch|each)"
        ))),
    }
}
