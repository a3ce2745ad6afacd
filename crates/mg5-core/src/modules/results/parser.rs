use regex::Regex;
use std::sync::LazyLock;

const NUMBER: &str = r"[-+]?(?:\d+\.?\d*|\.\d+)(?:[eE][-+]?\d+)?";

pub(super) static SUMMARY_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*===\s*results\s+summary\s+for\s+run:\s*(\S+)\s+tag:\s*(\S+)\s*===\s*$")
        .expect("summary header pattern is valid")
});

pub(super) static CROSS_SECTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)^\s*cross-section\s*:\s*({NUMBER})\s*(?:\+-\s*({NUMBER})\s*)?([a-z]+)\s*$"
    ))
    .expect("cross-section pattern is valid")
});

pub(super) static EVENT_COUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*nb\s+of\s+events\s*:\s*(\d+)\s*$").expect("event-count pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct SummaryHeader {
    pub(super) run_name: String,
    pub(super) tag: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct CrossSectionLine<'a> {
    pub(super) value: &'a str,
    pub(super) error: Option<&'a str>,
    pub(super) unit: &'a str,
}

pub(super) fn match_header(line: &str) -> Option<SummaryHeader> {
    let captures = SUMMARY_HEADER.captures(line)?;
    Some(SummaryHeader {
        run_name: captures[1].to_string(),
        tag: captures[2].to_string(),
    })
}

pub(super) fn match_cross_section(line: &str) -> Option<CrossSectionLine<'_>> {
    let captures = CROSS_SECTION.captures(line)?;
    Some(CrossSectionLine {
        value: captures.get(1)?.as_str(),
        error: captures.get(2).map(|m| m.as_str()),
        unit: captures.get(3)?.as_str(),
    })
}

pub(super) fn match_event_count(line: &str) -> Option<&str> {
    EVENT_COUNT
        .captures(line)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str())
}
