use crate::domain::Mg5Result;
use crate::modules::invoker::Invocation;
use std::path::{Path, PathBuf};

/// Receives every stdout line of a running MG5 process as it is produced.
pub trait OutputSink {
    fn accept_line(&mut self, line: &str);
}

/// Executes one command script against an MG5 executable.
pub trait ScriptRunner {
    fn run_script(&self, executable: &Path, script: &str) -> Mg5Result<Invocation>;
}

/// Decides whether an existing output directory may be replaced.
pub trait OverwritePolicy {
    fn confirm_overwrite(&self, path: &Path) -> bool;
}

/// Resolves the `mg5_aMC` executable to use.
pub trait ExecutableLocator {
    fn locate(&self) -> Mg5Result<PathBuf>;
}

impl<F> OutputSink for F
where
    F: FnMut(&str),
{
    fn accept_line(&mut self, line: &str) {
        self(line)
    }
}
