use globset::{Glob, GlobMatcher};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const EVENTS_SUBDIR: &str = "Events";

/// Locates the event directory of `run_name` under `output_dir/Events`.
///
/// `Events/<run>` wins when present; otherwise the lexicographically greatest
/// `Events/<run>_decayed_*` directory (MadSpin output) is returned.
pub fn find_event_dir(output_dir: &Path, run_name: &str) -> Option<PathBuf> {
    let events_dir = output_dir.join(EVENTS_SUBDIR);
    let direct = events_dir.join(run_name);
    if direct.is_dir() {
        return Some(direct);
    }

    let matcher = decayed_matcher(run_name)?;
    let mut decayed = fs::read_dir(&events_dir)
        .ok()?
        .filter_map(Result::ok)
        .filter(|entry| entry.path().is_dir())
        .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
        .filter(|name| matcher.is_match(name))
        .collect::<Vec<_>>();
    decayed.sort();

    let selected = decayed.pop().map(|name| events_dir.join(name));
    debug!(run = run_name, selected = ?selected, "resolved decayed event directory");
    selected
}

fn decayed_matcher(run_name: &str) -> Option<GlobMatcher> {
    let escaped = globset::escape(run_name);
    Glob::new(&format!("{}_decayed_*", escaped))
        .ok()
        .map(|glob| glob.compile_matcher())
}

#[cfg(test)]
mod tests {
    use super::find_event_dir;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn direct_run_directory_is_preferred() {
        let temp = TempDir::new().expect("tempdir should be created");
        fs::create_dir_all(temp.path().join("Events/run_01")).unwrap();
        fs::create_dir_all(temp.path().join("Events/run_01_decayed_1")).unwrap();

        assert_eq!(
            find_event_dir(temp.path(), "run_01"),
            Some(temp.path().join("Events/run_01"))
        );
    }

    #[test]
    fn greatest_decayed_variant_is_selected() {
        let temp = TempDir::new().expect("tempdir should be created");
        for name in ["run_01_decayed_1", "run_01_decayed_3", "run_01_decayed_2", "run_02_decayed_9"] {
            fs::create_dir_all(temp.path().join("Events").join(name)).unwrap();
        }

        assert_eq!(
            find_event_dir(temp.path(), "run_01"),
            Some(temp.path().join("Events/run_01_decayed_3"))
        );
    }

    #[test]
    fn missing_events_directory_yields_none() {
        let temp = TempDir::new().expect("tempdir should be created");
        assert_eq!(find_event_dir(temp.path(), "run_01"), None);
    }
}
