pub mod errors;

pub use errors::{Mg5Error, Mg5ErrorCategory, Mg5Result};

use serde::Serialize;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const DEFAULT_MODEL: &str = "sm";
pub const DEFAULT_LAUNCH_OPTIONS: &str = "--multicore";

/// Sentinel stored in numeric [`RunResult`] fields when the marker was absent.
pub const NOT_FOUND: i64 = -1;

/// One `output` invocation: which model to import, which processes to
/// generate and where MG5 should write the process directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRequest {
    pub model: String,
    pub extra_lines: Vec<String>,
    pub processes: Vec<String>,
    pub directory: PathBuf,
    pub force: Option<bool>,
}

impl OutputRequest {
    pub fn new<I, S>(processes: I, directory: impl Into<PathBuf>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            model: DEFAULT_MODEL.to_string(),
            extra_lines: Vec::new(),
            processes: processes.into_iter().map(Into::into).collect(),
            directory: directory.into(),
            force: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_extra_lines<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_lines = lines.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = Some(force);
        self
    }
}

/// Terminal stage of a launch. MG5 stops the pipeline after this step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LastStep {
    Auto,
    Parton,
    Pythia,
    Pgs,
    Delphes,
}

impl LastStep {
    pub const ALL: [LastStep; 5] = [
        Self::Auto,
        Self::Parton,
        Self::Pythia,
        Self::Pgs,
        Self::Delphes,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Parton => "parton",
            Self::Pythia => "pythia",
            Self::Pgs => "pgs",
            Self::Delphes => "delphes",
        }
    }
}

impl Display for LastStep {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

impl FromStr for LastStep {
    type Err = Mg5Error;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let normalized = token.trim().to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|step| step.as_str() == normalized)
            .ok_or_else(|| {
                Mg5Error::input_validation(
                    "INPUT.INVALID_LASTSTEP",
                    format!(
                        "invalid launch laststep '{}'; expected one of auto, parton, pythia, pgs, delphes",
                        token
                    ),
                )
            })
    }
}

/// One `launch` invocation against an existing process directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRequest {
    pub directory: PathBuf,
    pub run_name: Option<String>,
    pub laststep: Option<LastStep>,
    pub options: String,
}

impl LaunchRequest {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            run_name: None,
            laststep: None,
            options: DEFAULT_LAUNCH_OPTIONS.to_string(),
        }
    }

    pub fn with_run_name(mut self, run_name: impl Into<String>) -> Self {
        let run_name = run_name.into();
        self.run_name = (!run_name.is_empty()).then_some(run_name);
        self
    }

    pub fn with_laststep(mut self, laststep: LastStep) -> Self {
        self.laststep = Some(laststep);
        self
    }

    pub fn with_options(mut self, options: impl Into<String>) -> Self {
        self.options = options.into();
        self
    }
}

/// Values scraped from the output of one launch.
///
/// Cross-section and its uncertainty are always in fb. Absent values keep the
/// `-1` sentinel so that "measured zero" and "not reported" stay distinct.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    pub run_name: String,
    pub tag: String,
    pub cross_section_fb: f64,
    pub cross_section_error_fb: f64,
    pub n_events: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
}

impl Default for RunResult {
    fn default() -> Self {
        Self {
            run_name: String::new(),
            tag: String::new(),
            cross_section_fb: NOT_FOUND as f64,
            cross_section_error_fb: NOT_FOUND as f64,
            n_events: NOT_FOUND,
            output_dir: None,
        }
    }
}

impl RunResult {
    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(output_dir.into());
        self
    }

    pub fn has_summary(&self) -> bool {
        !self.run_name.is_empty()
    }

    pub fn cross_section(&self) -> Option<f64> {
        (self.cross_section_fb != NOT_FOUND as f64).then_some(self.cross_section_fb)
    }

    pub fn cross_section_error(&self) -> Option<f64> {
        (self.cross_section_error_fb != NOT_FOUND as f64).then_some(self.cross_section_error_fb)
    }

    pub fn events(&self) -> Option<u64> {
        u64::try_from(self.n_events).ok()
    }

    /// Directory holding the events of this run, if the output directory is
    /// known and MG5 produced one.
    pub fn event_dir(&self) -> Option<PathBuf> {
        let output_dir = self.output_dir.as_deref()?;
        if !self.has_summary() {
            return None;
        }
        crate::modules::events::find_event_dir(output_dir, &self.run_name)
    }
}

/// Rejects directories MG5 could be pointed at outside the working root, and
/// names MG5 would split into several command tokens.
pub fn validate_relative_dir(directory: &Path) -> Mg5Result<()> {
    if directory.as_os_str().is_empty() {
        return Err(Mg5Error::input_validation(
            "INPUT.EMPTY_PATH",
            "output directory must not be empty",
        ));
    }
    if directory.is_absolute() || directory.has_root() {
        return Err(Mg5Error::input_validation(
            "INPUT.ABSOLUTE_PATH",
            format!(
                "output directory '{}' must be a relative path for safety",
                directory.display()
            ),
        ));
    }
    if directory.to_string_lossy().chars().any(char::is_whitespace) {
        return Err(Mg5Error::input_validation(
            "INPUT.WHITESPACE_PATH",
            format!(
                "output directory '{}' must not contain whitespace",
                directory.display()
            ),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{LastStep, LaunchRequest, OutputRequest, RunResult, validate_relative_dir};
    use std::path::Path;

    #[test]
    fn output_request_defaults_to_standard_model() {
        let request = OutputRequest::new(["p p > t t~"], "ttbar");
        assert_eq!(request.model, "sm");
        assert_eq!(request.processes, vec!["p p > t t~".to_string()]);
        assert!(request.extra_lines.is_empty());
        assert_eq!(request.force, None);
    }

    #[test]
    fn laststep_parses_case_insensitively() {
        assert_eq!("Parton".parse::<LastStep>().unwrap(), LastStep::Parton);
        assert_eq!(" DELPHES ".parse::<LastStep>().unwrap(), LastStep::Delphes);
    }

    #[test]
    fn laststep_rejects_unknown_stage() {
        let error = "detector".parse::<LastStep>().expect_err("unknown stage");
        assert_eq!(error.placeholder(), "INPUT.INVALID_LASTSTEP");
        assert_eq!(error.exit_code(), 2);
    }

    #[test]
    fn empty_run_name_is_treated_as_absent() {
        let request = LaunchRequest::new("ttbar").with_run_name("");
        assert_eq!(request.run_name, None);
        assert_eq!(request.options, "--multicore");
    }

    #[test]
    fn default_result_uses_sentinels() {
        let result = RunResult::default();
        assert!(!result.has_summary());
        assert_eq!(result.cross_section_fb, -1.0);
        assert_eq!(result.cross_section_error_fb, -1.0);
        assert_eq!(result.n_events, -1);
        assert_eq!(result.cross_section(), None);
        assert_eq!(result.events(), None);
    }

    #[test]
    fn zero_cross_section_is_not_a_sentinel() {
        let result = RunResult {
            cross_section_fb: 0.0,
            n_events: 0,
            ..RunResult::default()
        };
        assert_eq!(result.cross_section(), Some(0.0));
        assert_eq!(result.events(), Some(0));
    }

    #[test]
    fn relative_dir_validation_rejects_absolute_and_empty_paths() {
        assert!(validate_relative_dir(Path::new("out/ttbar")).is_ok());
        assert_eq!(
            validate_relative_dir(Path::new("/tmp/out"))
                .unwrap_err()
                .placeholder(),
            "INPUT.ABSOLUTE_PATH"
        );
        assert_eq!(
            validate_relative_dir(Path::new("")).unwrap_err().placeholder(),
            "INPUT.EMPTY_PATH"
        );
    }

    #[test]
    fn relative_dir_validation_rejects_whitespace() {
        for path in ["my dir", "out/run 1", "tab\tdir"] {
            let error = validate_relative_dir(Path::new(path)).expect_err("whitespace is rejected");
            assert_eq!(error.placeholder(), "INPUT.WHITESPACE_PATH");
        }
        assert!(validate_relative_dir(Path::new("out/run_1")).is_ok());
    }
}
