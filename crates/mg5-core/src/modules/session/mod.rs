//! `output` and `launch` workflows on top of the script builder, the process
//! invoker and the result parser.

mod policy;

pub use policy::{AlwaysOverwrite, DEFAULT_PROMPT_TIMEOUT, NeverOverwrite, PromptOverwrite};

use crate::common::config::Mg5Config;
use crate::domain::{LaunchRequest, Mg5Error, Mg5Result, OutputRequest, RunResult};
use crate::modules::cards::{CardPlacement, place_cards};
use crate::modules::events::find_event_dir;
use crate::modules::invoker::{ProcessInvoker, StdoutSink};
use crate::modules::locate::SearchPathLocator;
use crate::modules::results::parse_run_result;
use crate::modules::traits::{ExecutableLocator, OutputSink, OverwritePolicy, ScriptRunner};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStatus {
    /// MG5 wrote a fresh process directory.
    Generated,
    /// The directory already existed and was left untouched.
    Kept,
}

/// A process directory produced (or kept) by [`Session::output`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputHandle {
    directory: PathBuf,
    resolved: PathBuf,
    status: OutputStatus,
}

impl OutputHandle {
    /// Directory as passed to MG5, relative to the session working directory.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn resolved(&self) -> &Path {
        &self.resolved
    }

    pub fn status(&self) -> OutputStatus {
        self.status
    }

    pub fn launch_request(&self) -> LaunchRequest {
        LaunchRequest::new(self.directory.clone())
    }

    pub fn events_dir(&self, run_name: &str) -> Option<PathBuf> {
        find_event_dir(&self.resolved, run_name)
    }
}

pub struct Session {
    config: Mg5Config,
    executable: PathBuf,
    runner: Box<dyn ScriptRunner>,
    overwrite: Box<dyn OverwritePolicy>,
}

impl Session {
    pub fn new(
        config: Mg5Config,
        locator: &dyn ExecutableLocator,
        runner: Box<dyn ScriptRunner>,
        overwrite: Box<dyn OverwritePolicy>,
    ) -> Mg5Result<Self> {
        let executable = locator.locate()?;
        info!(executable = %executable.display(), "using MG5 executable");
        Ok(Self {
            config,
            executable,
            runner,
            overwrite,
        })
    }

    /// Session with the standard locator, a real process invoker relaying to
    /// `sink`, and an interactive overwrite prompt.
    pub fn with_sink(config: Mg5Config, sink: Box<dyn OutputSink>) -> Mg5Result<Self> {
        let locator = SearchPathLocator::from_config(&config);
        let invoker = ProcessInvoker::new(sink)
            .with_work_dir(config.work_dir.clone())
            .with_wait_timeout(config.wait_timeout);
        Self::new(
            config,
            &locator,
            Box::new(invoker),
            Box::new(PromptOverwrite::default()),
        )
    }

    pub fn from_config(config: Mg5Config) -> Mg5Result<Self> {
        Self::with_sink(config, Box::new(StdoutSink))
    }

    pub fn with_overwrite_policy(mut self, overwrite: Box<dyn OverwritePolicy>) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    pub fn config(&self) -> &Mg5Config {
        &self.config
    }

    pub fn output(&self, request: &OutputRequest) -> Mg5Result<OutputHandle> {
        let script = request.to_script()?;
        let resolved = self.config.work_dir.join(&request.directory);
        let handle = |status| OutputHandle {
            directory: request.directory.clone(),
            resolved: resolved.clone(),
            status,
        };

        if let Ok(metadata) = fs::symlink_metadata(&resolved) {
            if !metadata.is_dir() {
                warn!(path = %resolved.display(), "path exists as non-directory; output interrupted");
                return Err(Mg5Error::input_validation(
                    "INPUT.OUTPUT_PATH_CONFLICT",
                    format!(
                        "path '{}' exists and is not a directory",
                        request.directory.display()
                    ),
                ));
            }

            let force = request.force.or(self.config.output_force);
            let overwrite = match force {
                Some(force) => force,
                None => self.overwrite.confirm_overwrite(&request.directory),
            };
            if !overwrite {
                warn!(path = %resolved.display(), "path exists; output interrupted as requested");
                return Ok(handle(OutputStatus::Kept));
            }

            fs::remove_dir_all(&resolved).map_err(|source| {
                Mg5Error::io_system(
                    "IO.OUTPUT_REMOVE",
                    format!(
                        "failed to remove existing output '{}': {}",
                        resolved.display(),
                        source
                    ),
                )
            })?;
            info!(path = %resolved.display(), "removed existing output directory");
        }

        self.runner.run_script(&self.executable, &script)?;

        if !resolved.is_dir() {
            return Err(
                Mg5Error::computation("RUN.OUTPUT_MISSING", "MG5 output seems failed.")
                    .with_command(script),
            );
        }
        Ok(handle(OutputStatus::Generated))
    }

    /// Places `cards`, launches the run and parses its summary.
    ///
    /// A result without a summary is returned as-is; MG5 gives no reliable
    /// failure signal, so judging it is left to the caller.
    pub fn launch(&self, request: &LaunchRequest, cards: &[CardPlacement]) -> Mg5Result<RunResult> {
        let script = request.to_script()?;
        let resolved = self.config.work_dir.join(&request.directory);
        if !resolved.is_dir() {
            return Err(Mg5Error::input_validation(
                "INPUT.OUTPUT_NOT_FOUND",
                format!("directory {} not found", request.directory.display()),
            ));
        }

        place_cards(&resolved, cards)?;

        let invocation = self.runner.run_script(&self.executable, &script)?;
        let result = parse_run_result(&invocation.lines)
            .map_err(|error| error.with_command(script.clone()))?
            .with_output_dir(resolved);

        if !result.has_summary() {
            warn!(
                directory = %request.directory.display(),
                "no results summary found in MG5 output; the launch may have failed"
            );
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::{AlwaysOverwrite, NeverOverwrite, OutputStatus, Session};
    use crate::common::config::Mg5Config;
    use crate::domain::{LastStep, Mg5Result, OutputRequest};
    use crate::modules::cards::{CardPlacement, CardTemplate};
    use crate::modules::invoker::Invocation;
    use crate::modules::traits::{ExecutableLocator, ScriptRunner};
    use std::cell::RefCell;
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::rc::Rc;
    use tempfile::TempDir;

    struct FixedLocator;

    impl ExecutableLocator for FixedLocator {
        fn locate(&self) -> Mg5Result<PathBuf> {
            Ok(PathBuf::from("bin/mg5_aMC"))
        }
    }

    /// Creates the output directory on `output` and prints a canned summary
    /// on `launch`, like a well-behaved MG5.
    struct FakeMg5 {
        work_dir: PathBuf,
        create_output: bool,
        scripts: Rc<RefCell<Vec<String>>>,
    }

    impl ScriptRunner for FakeMg5 {
        fn run_script(&self, _executable: &Path, script: &str) -> Mg5Result<Invocation> {
            self.scripts.borrow_mut().push(script.to_string());
            let mut lines = Vec::new();
            for line in script.lines() {
                if let Some(rest) = line.strip_prefix("output ") {
                    let dir = rest.trim_end_matches(" -f");
                    if self.create_output {
                        fs::create_dir_all(self.work_dir.join(dir).join("Cards")).unwrap();
                    }
                } else if line.starts_with("launch ") {
                    lines.push("=== Results Summary for run: run_01 tag: tag_1 ===".to_string());
                    lines.push("     Cross-section :   0.5 +- 0.01 pb".to_string());
                    lines.push("     Nb of events :  10000".to_string());
                }
            }
            Ok(Invocation {
                lines,
                status: None,
                wait_timed_out: false,
            })
        }
    }

    fn session(temp: &TempDir, create_output: bool) -> (Session, Rc<RefCell<Vec<String>>>) {
        let scripts = Rc::new(RefCell::new(Vec::new()));
        let config = Mg5Config {
            work_dir: temp.path().to_path_buf(),
            ..Mg5Config::default()
        };
        let runner = FakeMg5 {
            work_dir: temp.path().to_path_buf(),
            create_output,
            scripts: Rc::clone(&scripts),
        };
        let session = Session::new(
            config,
            &FixedLocator,
            Box::new(runner),
            Box::new(NeverOverwrite),
        )
        .unwrap();
        (session, scripts)
    }

    #[test]
    fn output_then_launch_yields_parsed_result() {
        let temp = TempDir::new().expect("tempdir should be created");
        let (session, scripts) = session(&temp, true);

        let output = session
            .output(&OutputRequest::new(["p p > t t~"], "ttbar"))
            .unwrap();
        assert_eq!(output.status(), OutputStatus::Generated);

        let request = output
            .launch_request()
            .with_run_name("run_01")
            .with_laststep(LastStep::Parton);
        let result = session.launch(&request, &[]).unwrap();

        assert_eq!(result.run_name, "run_01");
        assert_eq!(result.cross_section_fb, 500.0);
        assert_eq!(result.cross_section_error_fb, 10.0);
        assert_eq!(result.n_events, 10000);
        assert_eq!(result.output_dir.as_deref(), Some(temp.path().join("ttbar").as_path()));

        let scripts = scripts.borrow();
        assert_eq!(scripts.len(), 2);
        assert!(scripts[1].ends_with("launch ttbar --name=run_01 --laststep=parton --multicore -f"));
    }

    #[test]
    fn missing_output_directory_reports_command_text() {
        let temp = TempDir::new().expect("tempdir should be created");
        let (session, _) = session(&temp, false);

        let error = session
            .output(&OutputRequest::new(["e+ e- > mu+ mu-"], "ee"))
            .unwrap_err();
        assert_eq!(error.placeholder(), "RUN.OUTPUT_MISSING");
        assert_eq!(
            error.command(),
            Some("import model sm\ngenerate e+ e- > mu+ mu- @ 1\noutput ee -f")
        );
    }

    #[test]
    fn declined_overwrite_keeps_existing_directory() {
        let temp = TempDir::new().expect("tempdir should be created");
        fs::create_dir_all(temp.path().join("ttbar")).unwrap();
        fs::write(temp.path().join("ttbar/marker"), "keep").unwrap();
        let (session, scripts) = session(&temp, true);

        let output = session
            .output(&OutputRequest::new(["p p > t t~"], "ttbar"))
            .unwrap();

        assert_eq!(output.status(), OutputStatus::Kept);
        assert!(temp.path().join("ttbar/marker").exists());
        assert!(scripts.borrow().is_empty());
    }

    #[test]
    fn forced_output_replaces_existing_directory() {
        let temp = TempDir::new().expect("tempdir should be created");
        fs::create_dir_all(temp.path().join("ttbar")).unwrap();
        fs::write(temp.path().join("ttbar/marker"), "stale").unwrap();
        let (session, _) = session(&temp, true);
        let session = session.with_overwrite_policy(Box::new(AlwaysOverwrite));

        let output = session
            .output(&OutputRequest::new(["p p > t t~"], "ttbar"))
            .unwrap();

        assert_eq!(output.status(), OutputStatus::Generated);
        assert!(!temp.path().join("ttbar/marker").exists());
    }

    #[test]
    fn explicit_force_false_skips_policy() {
        let temp = TempDir::new().expect("tempdir should be created");
        fs::create_dir_all(temp.path().join("ttbar")).unwrap();
        let (session, _) = session(&temp, true);
        let session = session.with_overwrite_policy(Box::new(AlwaysOverwrite));

        let output = session
            .output(&OutputRequest::new(["p p > t t~"], "ttbar").with_force(false))
            .unwrap();
        assert_eq!(output.status(), OutputStatus::Kept);
    }

    #[test]
    fn file_in_place_of_output_directory_is_a_conflict() {
        let temp = TempDir::new().expect("tempdir should be created");
        fs::write(temp.path().join("ttbar"), "not a dir").unwrap();
        let (session, _) = session(&temp, true);

        let error = session
            .output(&OutputRequest::new(["p p > t t~"], "ttbar"))
            .unwrap_err();
        assert_eq!(error.placeholder(), "INPUT.OUTPUT_PATH_CONFLICT");
    }

    #[test]
    fn launch_requires_existing_output_and_places_cards() {
        let temp = TempDir::new().expect("tempdir should be created");
        let (session, scripts) = session(&temp, true);

        let error = session
            .launch(&crate::domain::LaunchRequest::new("missing"), &[])
            .unwrap_err();
        assert_eq!(error.placeholder(), "INPUT.OUTPUT_NOT_FOUND");
        assert!(scripts.borrow().is_empty());

        let output = session
            .output(&OutputRequest::new(["p p > h"], "higgs"))
            .unwrap();
        let template_path = temp.path().join("param.tmpl");
        fs::write(&template_path, "MH = %(mh)s\n").unwrap();
        let cards = [CardPlacement::new(
            "param",
            CardTemplate::new(&template_path).unwrap().with_value("mh", 125),
        )
        .unwrap()];

        session.launch(&output.launch_request(), &cards).unwrap();
        assert_eq!(
            fs::read_to_string(temp.path().join("higgs/Cards/param_card.dat")).unwrap(),
            "MH = 125\n"
        );
    }

    #[test]
    fn absolute_output_path_is_rejected_before_running() {
        let temp = TempDir::new().expect("tempdir should be created");
        let (session, scripts) = session(&temp, true);

        let error = session
            .output(&OutputRequest::new(["p p > t t~"], "/tmp/ttbar"))
            .unwrap_err();
        assert_eq!(error.placeholder(), "INPUT.ABSOLUTE_PATH");
        assert!(scripts.borrow().is_empty());
    }
}
