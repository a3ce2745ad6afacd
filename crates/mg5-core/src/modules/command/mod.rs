//! Rendering of MG5 command scripts.
//!
//! Scripts are plain text, one MG5 command per line, fed to `mg5_aMC` on
//! standard input. Everything here is pure: inputs are validated and rendered
//! before any process or file is touched.

use crate::domain::{
    LastStep, LaunchRequest, Mg5Error, Mg5Result, OutputRequest, validate_relative_dir,
};
use std::path::Path;

pub const DISABLE_HTML_OPENING: &str = "set automatic_html_opening False";

/// Renders the script that imports `model`, defines every process and writes
/// the process directory to `directory`.
///
/// The first process is sent with `generate`, every later one with
/// `add process`; each carries its 1-based position as the `@` tag.
pub fn render_output_script<S: AsRef<str>>(
    model: &str,
    extra_lines: &[S],
    processes: &[S],
    directory: &Path,
) -> Mg5Result<String> {
    validate_relative_dir(directory)?;
    if model.trim().is_empty() {
        return Err(Mg5Error::input_validation(
            "INPUT.EMPTY_MODEL",
            "model name must not be empty",
        ));
    }
    ensure_single_line("model", model)?;
    if processes.is_empty() {
        return Err(Mg5Error::input_validation(
            "INPUT.EMPTY_PROCESS_LIST",
            "at least one process is required for output",
        ));
    }

    let mut lines = Vec::with_capacity(extra_lines.len() + processes.len() + 2);
    lines.push(format!("import model {}", model.trim()));

    for line in extra_lines {
        let line = line.as_ref();
        ensure_single_line("extra_code", line)?;
        lines.push(line.to_string());
    }

    for (index, process) in processes.iter().enumerate() {
        let process = process.as_ref().trim();
        if process.is_empty() {
            return Err(Mg5Error::input_validation(
                "INPUT.EMPTY_PROCESS",
                format!("process #{} is empty", index + 1),
            ));
        }
        ensure_single_line("process", process)?;
        let directive = if index == 0 { "generate" } else { "add process" };
        lines.push(format!("{} {} @ {}", directive, process, index + 1));
    }

    lines.push(format!("output {} -f", directory.display()));
    Ok(lines.join("\n"))
}

/// Renders the two-line launch script.
///
/// `--name=` and `--laststep=` are emitted only when given; `options` is
/// appended verbatim.
pub fn render_launch_script(
    directory: &Path,
    run_name: Option<&str>,
    laststep: Option<LastStep>,
    options: &str,
) -> Mg5Result<String> {
    validate_relative_dir(directory)?;
    ensure_single_line("options", options)?;

    let directory = directory.display().to_string();
    let mut tokens = vec!["launch".to_string(), directory];
    if let Some(name) = run_name.filter(|name| !name.is_empty()) {
        ensure_single_line("run name", name)?;
        if name.chars().any(char::is_whitespace) {
            return Err(Mg5Error::input_validation(
                "INPUT.INVALID_RUN_NAME",
                format!("run name '{}' must not contain whitespace", name),
            ));
        }
        tokens.push(format!("--name={}", name));
    }
    if let Some(step) = laststep {
        tokens.push(format!("--laststep={}", step));
    }
    let options = options.trim();
    if !options.is_empty() {
        tokens.push(options.to_string());
    }
    tokens.push("-f".to_string());

    Ok(format!("{}\n{}", DISABLE_HTML_OPENING, tokens.join(" ")))
}

impl OutputRequest {
    pub fn to_script(&self) -> Mg5Result<String> {
        render_output_script(
            &self.model,
            &self.extra_lines,
            &self.processes,
            &self.directory,
        )
    }
}

impl LaunchRequest {
    pub fn to_script(&self) -> Mg5Result<String> {
        render_launch_script(
            &self.directory,
            self.run_name.as_deref(),
            self.laststep,
            &self.options,
        )
    }
}

fn ensure_single_line(field: &str, value: &str) -> Mg5Result<()> {
    if value.contains(['\n', '\r']) {
        return Err(Mg5Error::input_validation(
            "INPUT.MULTILINE_ENTRY",
            format!("invalid \"{}\": entry must be a single line", field),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{render_launch_script, render_output_script};
    use crate::domain::{LastStep, LaunchRequest, OutputRequest};
    use std::path::Path;

    const NO_EXTRA: [&str; 0] = [];

    #[test]
    fn single_process_uses_generate_with_first_tag() {
        let script =
            render_output_script("sm", &NO_EXTRA, &["p p > t t~"], Path::new("ttbar")).unwrap();
        assert_eq!(
            script,
            "import model sm\ngenerate p p > t t~ @ 1\noutput ttbar -f"
        );
    }

    #[test]
    fn later_processes_use_add_process_with_ordinal_tags() {
        let processes = ["p p > t t~", "p p > t t~ j", "p p > t t~ j j"];
        let script =
            render_output_script("sm", &NO_EXTRA, &processes, Path::new("ttbar")).unwrap();
        let lines: Vec<&str> = script.lines().collect();

        assert_eq!(lines.len(), 5);
        assert_eq!(lines[1], "generate p p > t t~ @ 1");
        assert_eq!(lines[2], "add process p p > t t~ j @ 2");
        assert_eq!(lines[3], "add process p p > t t~ j j @ 3");
        assert_eq!(
            lines.iter().filter(|line| line.starts_with("generate ")).count(),
            1
        );
        assert_eq!(
            lines
                .iter()
                .filter(|line| line.starts_with("add process "))
                .count(),
            processes.len() - 1
        );
    }

    #[test]
    fn extra_lines_follow_model_import_verbatim() {
        let extra = ["define l+ = e+ mu+", "set group_subprocesses False"];
        let script =
            render_output_script("mssm", &extra, &["p p > l+ l-"], Path::new("dy")).unwrap();
        assert_eq!(
            script,
            "import model mssm\ndefine l+ = e+ mu+\nset group_subprocesses False\ngenerate p p > l+ l- @ 1\noutput dy -f"
        );
    }

    #[test]
    fn absolute_destination_is_rejected() {
        for path in ["/tmp/out", "/out", "/"] {
            let error = render_output_script("sm", &NO_EXTRA, &["e+ e- > mu+ mu-"], Path::new(path))
                .expect_err("absolute path must be rejected");
            assert_eq!(error.placeholder(), "INPUT.ABSOLUTE_PATH");
        }
    }

    #[test]
    fn empty_process_list_and_model_are_rejected() {
        let empty: [&str; 0] = [];
        let error = render_output_script("sm", &NO_EXTRA, &empty, Path::new("out")).unwrap_err();
        assert_eq!(error.placeholder(), "INPUT.EMPTY_PROCESS_LIST");

        let error = render_output_script(" ", &NO_EXTRA, &["a > b"], Path::new("out")).unwrap_err();
        assert_eq!(error.placeholder(), "INPUT.EMPTY_MODEL");
    }

    #[test]
    fn multiline_entries_are_contract_violations() {
        let error = render_output_script(
            "sm",
            &["define p = g u\nexit"],
            &["p p > z"],
            Path::new("out"),
        )
        .unwrap_err();
        assert_eq!(error.placeholder(), "INPUT.MULTILINE_ENTRY");
    }

    #[test]
    fn launch_script_includes_only_given_flags() {
        let script = render_launch_script(Path::new("ttbar"), None, None, "--multicore").unwrap();
        assert_eq!(
            script,
            "set automatic_html_opening False\nlaunch ttbar --multicore -f"
        );

        let script = render_launch_script(
            Path::new("ttbar"),
            Some("run_01"),
            Some(LastStep::Pythia),
            "--multicore --nb_core=4",
        )
        .unwrap();
        assert_eq!(
            script,
            "set automatic_html_opening False\nlaunch ttbar --name=run_01 --laststep=pythia --multicore --nb_core=4 -f"
        );
    }

    #[test]
    fn launch_script_with_empty_options_ends_with_force_flag() {
        let request = LaunchRequest::new("out").with_options("").with_laststep(LastStep::Auto);
        assert_eq!(
            request.to_script().unwrap(),
            "set automatic_html_opening False\nlaunch out --laststep=auto -f"
        );
    }

    #[test]
    fn request_rendering_matches_free_function() {
        let request = OutputRequest::new(["e+ e- > mu+ mu-"], "ee")
            .with_model("sm-no_b_mass")
            .with_extra_lines(["set auto_update 0"]);
        assert_eq!(
            request.to_script().unwrap(),
            "import model sm-no_b_mass\nset auto_update 0\ngenerate e+ e- > mu+ mu- @ 1\noutput ee -f"
        );
    }

    #[test]
    fn directory_with_whitespace_is_rejected_for_both_scripts() {
        let error = render_output_script("sm", &NO_EXTRA, &["p p > t t~"], Path::new("my dir"))
            .expect_err("output into 'my dir' would be split by MG5");
        assert_eq!(error.placeholder(), "INPUT.WHITESPACE_PATH");

        let error = render_launch_script(Path::new("my dir"), None, None, "--multicore")
            .expect_err("launch of 'my dir' would be split by MG5");
        assert_eq!(error.placeholder(), "INPUT.WHITESPACE_PATH");
    }
}
