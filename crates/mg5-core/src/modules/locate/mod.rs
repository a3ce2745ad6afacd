use crate::common::config::Mg5Config;
use crate::domain::{Mg5Error, Mg5Result};
use crate::modules::traits::ExecutableLocator;
use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const MG5_EXECUTABLE: &str = "mg5_aMC";

/// Resolves `mg5_aMC` from, in order: the explicit path, the default path,
/// the system `PATH`, and `<root>/bin` for every search root.
#[derive(Debug, Clone, Default)]
pub struct SearchPathLocator {
    pub explicit: Option<PathBuf>,
    pub default_path: Option<PathBuf>,
    pub search_roots: Vec<String>,
    pub system_path: Option<OsString>,
}

impl SearchPathLocator {
    pub fn from_config(config: &Mg5Config) -> Self {
        Self {
            explicit: config.executable.clone(),
            default_path: config.default_executable.clone(),
            search_roots: config.search_roots.clone(),
            system_path: env::var_os("PATH"),
        }
    }

    pub fn without_system_path(mut self) -> Self {
        self.system_path = None;
        self
    }
}

impl ExecutableLocator for SearchPathLocator {
    fn locate(&self) -> Mg5Result<PathBuf> {
        if let Some(explicit) = &self.explicit {
            return resolve_command(explicit, self.system_path.as_ref()).ok_or_else(|| {
                Mg5Error::input_validation(
                    "INPUT.MG5_BIN_NOT_FOUND",
                    format!(
                        "MG5 executable, specified value \"{}\", not found",
                        explicit.display()
                    ),
                )
            });
        }

        if let Some(default_path) = &self.default_path {
            if let Some(found) = resolve_command(default_path, self.system_path.as_ref()) {
                debug!(path = %found.display(), "using default MG5 executable");
                return Ok(found);
            }
            debug!(path = %default_path.display(), "default MG5 executable is not usable");
        }

        if let Some(system_path) = &self.system_path {
            if let Some(found) = which_in(MG5_EXECUTABLE, system_path) {
                debug!(path = %found.display(), "found MG5 executable on PATH");
                return Ok(found);
            }
        }

        for root in self.search_roots.iter().filter(|root| !root.is_empty()) {
            let candidate = Path::new(root).join("bin").join(MG5_EXECUTABLE);
            if is_executable_file(&candidate) {
                debug!(path = %candidate.display(), "found MG5 executable under search root");
                return Ok(candidate);
            }
        }

        Err(Mg5Error::input_validation(
            "INPUT.MG5_BIN_NOT_FOUND",
            "MG5 executable is not found. Set it by hand or use ENV[\"HEP_MG5\"].",
        ))
    }
}

/// A bare command name is looked up on `PATH`; anything with a directory
/// component is checked in place.
fn resolve_command(command: &Path, system_path: Option<&OsString>) -> Option<PathBuf> {
    let has_directory = command
        .parent()
        .is_some_and(|parent| !parent.as_os_str().is_empty());
    if has_directory {
        return is_executable_file(command).then(|| command.to_path_buf());
    }
    let name = command.to_str()?;
    system_path.and_then(|path| which_in(name, path))
}

fn which_in(name: &str, system_path: &OsString) -> Option<PathBuf> {
    env::split_paths(system_path)
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable_file(candidate))
}

#[cfg(unix)]
pub fn is_executable_file(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|metadata| metadata.is_file() && metadata.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
pub fn is_executable_file(path: &Path) -> bool {
    path.is_file()
}
