//! Runtime configuration for locating and driving MG5.
//!
//! Values are layered: environment defaults first, then an optional JSON file,
//! then whatever the caller sets explicitly (CLI flags).

use crate::domain::{Mg5Error, Mg5Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const HEP_MG5_ENV: &str = "HEP_MG5";
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 1_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mg5Config {
    pub executable: Option<PathBuf>,
    pub default_executable: Option<PathBuf>,
    pub search_roots: Vec<String>,
    pub output_force: Option<bool>,
    pub wait_timeout: Duration,
    pub work_dir: PathBuf,
}

impl Default for Mg5Config {
    fn default() -> Self {
        Self {
            executable: None,
            default_executable: None,
            search_roots: vec![".".to_string()],
            output_force: None,
            wait_timeout: Duration::from_millis(DEFAULT_WAIT_TIMEOUT_MS),
            work_dir: PathBuf::from("."),
        }
    }
}

impl Mg5Config {
    pub fn from_env() -> Self {
        Self::with_hep_mg5(std::env::var(HEP_MG5_ENV).ok())
    }

    /// Search roots become `[$HEP_MG5, "."]`, skipping an unset variable.
    pub fn with_hep_mg5(hep_mg5: Option<String>) -> Self {
        let mut search_roots = Vec::new();
        if let Some(root) = hep_mg5.filter(|root| !root.trim().is_empty()) {
            search_roots.push(root);
        }
        search_roots.push(".".to_string());
        Self {
            search_roots,
            ..Self::default()
        }
    }

    pub fn load_json_file(self, path: &Path) -> Mg5Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| {
            Mg5Error::io_system(
                "IO.CONFIG_READ",
                format!("failed to read config '{}': {}", path.display(), source),
            )
        })?;
        self.merge_json(&content).map_err(|error| {
            Mg5Error::input_validation(
                "INPUT.CONFIG_PARSE",
                format!("{} (in '{}')", error.message(), path.display()),
            )
        })
    }

    pub fn merge_json(self, content: &str) -> Mg5Result<Self> {
        let file: ConfigFile = serde_json::from_str(content).map_err(|source| {
            Mg5Error::input_validation(
                "INPUT.CONFIG_PARSE",
                format!("invalid configuration: {}", source),
            )
        })?;
        Ok(file.apply(self))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct ConfigFile {
    executable: Option<PathBuf>,
    default_executable: Option<PathBuf>,
    search_roots: Option<Vec<String>>,
    output_force: Option<bool>,
    wait_timeout_ms: Option<u64>,
    work_dir: Option<PathBuf>,
}

impl ConfigFile {
    fn apply(self, mut base: Mg5Config) -> Mg5Config {
        if self.executable.is_some() {
            base.executable = self.executable;
        }
        if self.default_executable.is_some() {
            base.default_executable = self.default_executable;
        }
        if let Some(search_roots) = self.search_roots {
            base.search_roots = search_roots;
        }
        if self.output_force.is_some() {
            base.output_force = self.output_force;
        }
        if let Some(wait_timeout_ms) = self.wait_timeout_ms {
            base.wait_timeout = Duration::from_millis(wait_timeout_ms);
        }
        if let Some(work_dir) = self.work_dir {
            base.work_dir = work_dir;
        }
        base
    }
}
