//! Card files: name resolution, template rendering and placement into
//! `<output>/Cards/` ahead of a launch.

mod template;

pub use template::TemplateError;

use crate::domain::{Mg5Error, Mg5Result};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const CARDS_SUBDIR: &str = "Cards";

pub const CARD_ABBREVIATIONS: [(&str, &str); 12] = [
    ("param", "param_card.dat"),
    ("run", "run_card.dat"),
    ("pythia", "pythia_card.dat"),
    ("pythia8", "pythia8_card.dat"),
    ("pgs", "pgs_card.dat"),
    ("delphes", "delphes_card.dat"),
    ("shower", "shower_card.dat"),
    ("plot", "plot_card.dat"),
    ("madspin", "madspin_card.dat"),
    ("reweight", "reweight_card.dat"),
    ("grid", "grid_card.dat"),
    ("trigger", "delphes_trigger.dat"),
];

/// Maps a short card key (`run`, `param`, ...) to the file name MG5 expects.
///
/// Names already ending in `.dat` are taken literally.
pub fn canonical_card_name(name: &str) -> Mg5Result<String> {
    let normalized = name.trim().to_ascii_lowercase();
    if let Some((_, file_name)) = CARD_ABBREVIATIONS
        .iter()
        .find(|(key, _)| *key == normalized)
    {
        return Ok((*file_name).to_string());
    }

    let trimmed = name.trim();
    let is_plain_file_name = !trimmed.contains(['/', '\\']) && trimmed != ".dat";
    if trimmed.ends_with(".dat") && is_plain_file_name {
        return Ok(trimmed.to_string());
    }

    Err(Mg5Error::input_validation(
        "INPUT.CARD_NAME",
        format!(
            "invalid card name '{}'; expected one of {} or a '*.dat' file name",
            name,
            CARD_ABBREVIATIONS
                .iter()
                .map(|(key, _)| *key)
                .collect::<Vec<_>>()
                .join(", ")
        ),
    ))
}

/// A card source file, optionally rendered with `%(key)s` substitutions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardTemplate {
    path: PathBuf,
    values: Option<BTreeMap<String, String>>,
}

impl CardTemplate {
    pub fn new(path: impl Into<PathBuf>) -> Mg5Result<Self> {
        let path = path.into();
        if !path.is_file() {
            return Err(Mg5Error::input_validation(
                "INPUT.CARD_NOT_FOUND",
                format!("card file '{}' not found", path.display()),
            ));
        }
        Ok(Self { path, values: None })
    }

    pub fn with_value(mut self, key: impl Into<String>, value: impl Display) -> Self {
        self.values
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.to_string());
        self
    }

    pub fn with_values(mut self, values: BTreeMap<String, String>) -> Self {
        self.values.get_or_insert_with(BTreeMap::new).extend(values);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn values(&self) -> Option<&BTreeMap<String, String>> {
        self.values.as_ref()
    }

    pub fn render(&self) -> Mg5Result<String> {
        let source = fs::read_to_string(&self.path).map_err(|source| {
            Mg5Error::io_system(
                "IO.CARD_READ",
                format!("failed to read card '{}': {}", self.path.display(), source),
            )
        })?;

        let Some(values) = &self.values else {
            return Ok(source);
        };
        template::substitute(&source, values).map_err(|error| {
            Mg5Error::input_validation(
                "INPUT.CARD_PLACEHOLDER",
                format!("card '{}': {}", self.path.display(), error),
            )
        })
    }
}

/// A template bound to the file name it will take under `Cards/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardPlacement {
    pub file_name: String,
    pub template: CardTemplate,
}

impl CardPlacement {
    pub fn new(name: &str, template: CardTemplate) -> Mg5Result<Self> {
        Ok(Self {
            file_name: canonical_card_name(name)?,
            template,
        })
    }
}

/// Renders every card and writes them into `<output_dir>/Cards/`.
///
/// All templates are rendered before the first file is written, and each file
/// is written to a temporary sibling and renamed into place, so a failure
/// never leaves a partially written card behind.
pub fn place_cards(output_dir: &Path, placements: &[CardPlacement]) -> Mg5Result<Vec<PathBuf>> {
    if !output_dir.is_dir() {
        return Err(Mg5Error::input_validation(
            "INPUT.OUTPUT_NOT_PREPARED",
            format!(
                "output directory '{}' is not found; forgot \"output\"?",
                output_dir.display()
            ),
        ));
    }
    if placements.is_empty() {
        return Ok(Vec::new());
    }

    let rendered = placements
        .iter()
        .map(|placement| placement.template.render().map(|text| (placement, text)))
        .collect::<Mg5Result<Vec<_>>>()?;

    let cards_dir = output_dir.join(CARDS_SUBDIR);
    fs::create_dir_all(&cards_dir).map_err(|source| {
        Mg5Error::io_system(
            "IO.CARD_DIR",
            format!(
                "failed to create card directory '{}': {}",
                cards_dir.display(),
                source
            ),
        )
    })?;

    let mut written = Vec::with_capacity(rendered.len());
    for (placement, text) in rendered {
        let destination = cards_dir.join(&placement.file_name);
        write_atomically(&cards_dir, &destination, &text)?;
        info!(
            card = %placement.file_name.to_ascii_uppercase(),
            source = %placement.template.path().display(),
            "placed card"
        );
        written.push(destination);
    }
    Ok(written)
}

fn write_atomically(dir: &Path, destination: &Path, text: &str) -> Mg5Result<()> {
    let io_error = |source: std::io::Error| {
        Mg5Error::io_system(
            "IO.CARD_WRITE",
            format!("failed to write card '{}': {}", destination.display(), source),
        )
    };

    let mut staged = tempfile::NamedTempFile::new_in(dir).map_err(io_error)?;
    staged.write_all(text.as_bytes()).map_err(io_error)?;
    staged.flush().map_err(io_error)?;
    staged
        .persist(destination)
        .map_err(|error| io_error(error.error))?;
    Ok(())
}

/// Collects `<prefix>_<key>_card.dat` files (and `<prefix>_delphes_trigger.dat`)
/// found next to `prefix`, resolved against `base_dir`.
///
/// A prefix ending in `/` selects every recognised card in that directory.
/// Files that look like cards but whose key is unknown are skipped.
pub fn discover_cards(base_dir: &Path, prefix: &str) -> Mg5Result<Vec<CardPlacement>> {
    let (search_dir, file_prefix) = split_prefix(base_dir, prefix);
    let entries = fs::read_dir(&search_dir).map_err(|source| {
        Mg5Error::io_system(
            "IO.CARD_DISCOVERY",
            format!(
                "failed to list card directory '{}': {}",
                search_dir.display(),
                source
            ),
        )
    })?;

    let mut names = entries
        .filter_map(Result::ok)
        .filter(|entry| entry.path().is_file())
        .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
        .collect::<Vec<_>>();
    names.sort();

    let mut placements = Vec::new();
    for name in names {
        let Some(stem) = name
            .strip_prefix(file_prefix.as_str())
            .and_then(|rest| rest.strip_suffix(".dat"))
        else {
            continue;
        };

        let key = if stem == "delphes_trigger" {
            Some("trigger")
        } else {
            stem.strip_suffix("_card")
        };
        let Some(key) = key.filter(|key| {
            CARD_ABBREVIATIONS
                .iter()
                .any(|(known, _)| known.eq_ignore_ascii_case(key))
        }) else {
            warn!(file = %name, "file cannot be recognized as a card and is ignored");
            continue;
        };

        let template = CardTemplate::new(search_dir.join(&name))?;
        let placement = CardPlacement::new(key, template)?;
        warn!(
            file = %name,
            card = %placement.file_name.to_ascii_uppercase(),
            "card file found by prefix and used"
        );
        placements.push(placement);
    }
    Ok(placements)
}

fn split_prefix(base_dir: &Path, prefix: &str) -> (PathBuf, String) {
    if prefix.is_empty() || prefix.ends_with('/') {
        return (base_dir.join(prefix), String::new());
    }

    let prefix_path = Path::new(prefix);
    let search_dir = match prefix_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => base_dir.join(parent),
        _ => base_dir.to_path_buf(),
    };
    let mut file_prefix = prefix_path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default()
        .to_string();
    if !file_prefix.ends_with(['_', '-']) {
        file_prefix.push('_');
    }
    (search_dir, file_prefix)
}
