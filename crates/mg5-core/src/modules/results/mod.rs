//! Extraction of the run summary printed by MG5 at the end of a launch.
//!
//! The summary block looks like
//!
//! ```text
//! === Results Summary for run: run_01 tag: tag_1 ===
//!
//!      Cross-section :   0.5038 +- 0.001352 pb
//!      Nb of events :  10000
//! ```
//!
//! Only the first block is used, and the two value lines are searched for in
//! a fixed window after the header.

mod parser;

use crate::domain::{Mg5Error, Mg5Result, NOT_FOUND, RunResult};
use parser::{match_cross_section, match_event_count, match_header};
use tracing::{debug, warn};

/// Lines after the summary header searched for the value markers.
pub const SUMMARY_LOOKAHEAD: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrossSectionUnit {
    Picobarn,
    Femtobarn,
}

impl CrossSectionUnit {
    /// Factor converting a value in this unit to fb.
    pub const fn to_femtobarn(self) -> f64 {
        match self {
            Self::Picobarn => 1000.0,
            Self::Femtobarn => 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UnitError {
    #[error("unknown cross-section unit '{0}'; expected pb or fb")]
    Unknown(String),
}

impl std::str::FromStr for CrossSectionUnit {
    type Err = UnitError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        if token.eq_ignore_ascii_case("pb") {
            Ok(Self::Picobarn)
        } else if token.eq_ignore_ascii_case("fb") {
            Ok(Self::Femtobarn)
        } else {
            Err(UnitError::Unknown(token.to_string()))
        }
    }
}

impl From<UnitError> for Mg5Error {
    fn from(error: UnitError) -> Self {
        Mg5Error::computation("RUN.CROSS_SECTION_UNIT", error.to_string())
    }
}

/// Scans `lines` for the first run summary and returns what it reports.
///
/// A missing header is not an error: the result keeps its sentinel values
/// and the caller decides whether that means the run failed.
pub fn parse_run_result<S: AsRef<str>>(lines: &[S]) -> Mg5Result<RunResult> {
    let mut result = RunResult::default();

    let Some((header_index, header)) = lines
        .iter()
        .enumerate()
        .find_map(|(index, line)| match_header(line.as_ref()).map(|header| (index, header)))
    else {
        debug!(lines = lines.len(), "no results summary found in MG5 output");
        return Ok(result);
    };
    result.run_name = header.run_name;
    result.tag = header.tag;

    let window_end = lines.len().min(header_index + 1 + SUMMARY_LOOKAHEAD);
    let mut cross_section_seen = false;
    let mut events_seen = false;

    for line in &lines[header_index + 1..window_end] {
        let line = line.as_ref();
        if let Some(cross_section) = match_cross_section(line) {
            if cross_section_seen {
                warn!(line, "cross-section line appears twice in summary; keeping the first");
                continue;
            }
            cross_section_seen = true;

            let unit: CrossSectionUnit = cross_section.unit.parse()?;
            let factor = unit.to_femtobarn();
            result.cross_section_fb = parse_float(cross_section.value, line)? * factor;
            if let Some(error) = cross_section.error {
                result.cross_section_error_fb = parse_float(error, line)? * factor;
            }
        } else if let Some(count) = match_event_count(line) {
            if events_seen {
                warn!(line, "event-count line appears twice in summary; keeping the first");
                continue;
            }
            events_seen = true;
            match count.parse::<i64>() {
                Ok(events) => result.n_events = events,
                Err(source) => {
                    warn!(line, %source, "event count does not fit; reporting it as missing")
                }
            }
        }
    }

    if !cross_section_seen {
        warn!(run = %result.run_name, "cross-section line cannot be found");
    }
    if result.n_events == NOT_FOUND {
        debug!(run = %result.run_name, "event-count line cannot be found");
    }

    Ok(result)
}

fn parse_float(token: &str, line: &str) -> Mg5Result<f64> {
    token.parse::<f64>().map_err(|source| {
        Mg5Error::computation(
            "RUN.CROSS_SECTION_VALUE",
            format!("invalid number '{}' in '{}': {}", token, line, source),
        )
    })
}
