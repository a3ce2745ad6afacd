use super::{CliError, GlobalArgs};
use anyhow::Context;
use mg5_core::common::config::Mg5Config;
use mg5_core::domain::{Mg5Error, RunResult};
use mg5_core::modules::cards::{CardPlacement, CardTemplate, discover_cards};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;

pub(super) const LOG_ENV: &str = "MG5HELPER_LOG";
const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn as_filter(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

/// Diagnostics go to stderr so stdout stays reserved for MG5 output and
/// command results.
pub(super) fn init_logging(level: Option<LogLevel>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level.as_filter()),
        None => EnvFilter::try_from_env(LOG_ENV)
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Environment defaults, then `--config`, then `--mg5-bin`.
pub(super) fn load_config(global: &GlobalArgs) -> Result<Mg5Config, CliError> {
    let mut config = Mg5Config::from_env();
    if let Some(path) = &global.config {
        config = config.load_json_file(path).map_err(CliError::Compute)?;
    }
    if let Some(executable) = &global.mg5_bin {
        config.executable = Some(executable.clone());
    }
    debug!(?config, "configuration loaded");
    Ok(config)
}

/// Splits `KEY=VALUE`, trimming both sides.
fn split_assignment<'a>(raw: &'a str, flag: &str) -> Result<(&'a str, &'a str), CliError> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim(), value.trim())),
        _ => Err(CliError::Compute(Mg5Error::input_validation(
            "INPUT.CLI_ASSIGNMENT",
            format!("{flag} expects KEY=VALUE, got '{raw}'"),
        ))),
    }
}

/// Builds the card list for a launch.
///
/// Cards found through `prefix` come first; an explicit `--card` for the same
/// file replaces the discovered one. `--set CARD.KEY=VALUE` attaches a
/// substitution to an explicit card.
pub(super) fn collect_cards(
    base_dir: &Path,
    prefix: Option<&str>,
    card_args: &[String],
    set_args: &[String],
) -> Result<Vec<CardPlacement>, CliError> {
    let mut values: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();
    for raw in set_args {
        let (target, value) = split_assignment(raw, "--set")?;
        let Some((card, key)) = target.split_once('.').filter(|(card, key)| {
            !card.is_empty() && !key.is_empty()
        }) else {
            return Err(CliError::Compute(Mg5Error::input_validation(
                "INPUT.CLI_ASSIGNMENT",
                format!("--set expects CARD.KEY=VALUE, got '{raw}'"),
            )));
        };
        values
            .entry(card.to_ascii_lowercase())
            .or_default()
            .insert(key.to_string(), value.to_string());
    }

    let mut placements = match prefix {
        Some(prefix) => discover_cards(base_dir, prefix).map_err(CliError::Compute)?,
        None => Vec::new(),
    };

    for raw in card_args {
        let (name, path) = split_assignment(raw, "--card")?;
        let mut template = CardTemplate::new(resolve_against(base_dir, path))
            .map_err(CliError::Compute)?;
        if let Some(card_values) = values.remove(&name.to_ascii_lowercase()) {
            template = template.with_values(card_values);
        }
        let placement = CardPlacement::new(name, template).map_err(CliError::Compute)?;
        placements.retain(|existing| existing.file_name != placement.file_name);
        placements.push(placement);
    }

    if let Some(card) = values.keys().next() {
        return Err(CliError::Compute(Mg5Error::input_validation(
            "INPUT.CLI_ASSIGNMENT",
            format!("--set targets card '{card}' but no --card {card}=PATH was given"),
        )));
    }
    Ok(placements)
}

fn resolve_against(base_dir: &Path, path: &str) -> PathBuf {
    let path = Path::new(path);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

pub(super) fn read_log_lines(path: &Path) -> Result<Vec<String>, CliError> {
    let bytes =
        fs::read(path).with_context(|| format!("failed to read MG5 log '{}'", path.display()))?;
    Ok(String::from_utf8_lossy(&bytes)
        .lines()
        .map(str::to_string)
        .collect())
}

pub(super) fn print_result(result: &RunResult, json: bool) -> Result<(), CliError> {
    if json {
        let rendered = serde_json::to_string_pretty(result)
            .context("failed to serialize run result")?;
        println!("{rendered}");
    } else {
        println!("{}", render_human_result(result));
    }
    Ok(())
}

pub(super) fn render_human_result(result: &RunResult) -> String {
    if !result.has_summary() {
        return "No results summary found.".to_string();
    }

    let mut lines = vec![format!("Run: {} (tag: {})", result.run_name, result.tag)];
    lines.push(match (result.cross_section(), result.cross_section_error()) {
        (Some(value), Some(error)) => format!("Cross-section: {value} +- {error} fb"),
        (Some(value), None) => format!("Cross-section: {value} fb"),
        _ => "Cross-section: not reported".to_string(),
    });
    lines.push(match result.events() {
        Some(events) => format!("Events: {events}"),
        None => "Events: not reported".to_string(),
    });
    if let Some(event_dir) = result.event_dir() {
        lines.push(format!("Event directory: {}", event_dir.display()));
    }
    lines.join("\n")
}
