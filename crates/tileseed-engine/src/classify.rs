//! Seeding tool output classification
//!
//! Standard output is the tool's only telemetry channel. Each line is either
//! progress, a fatal condition that must stop the run, or noise.

use std::sync::OnceLock;

use regex::Regex;

const FATAL_MARKER: &str = "- ERROR -";
const CONFIGURATION_MARKER: &str = "error in configuration";

/// What a single stdout line means for the running process
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputClass {
    /// A tile count report
    Progress,
    /// The tool logged an error; the text after the marker is the reason
    Fatal(String),
    /// The tool rejected its configuration; the whole line is the reason
    ConfigurationError(String),
    /// Anything else
    Informational,
}

impl OutputClass {
    /// Abort reason for fatal classes
    pub fn abort_reason(&self) -> Option<&str> {
        match self {
            Self::Fatal(reason) | Self::ConfigurationError(reason) => Some(reason),
            _ => None,
        }
    }
}

/// What kind of failure a finished run reported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The coverage bbox was rejected by the grid; retried with a buffer
    InvalidBbox,
    Other,
}

fn progress_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\(\d+ tiles\)").unwrap())
}

fn invalid_bbox_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)invalid bbox").unwrap())
}

/// Classify one line of the tool's standard output
pub fn classify_line(line: &str) -> OutputClass {
    if let Some(index) = line.find(FATAL_MARKER) {
        let reason = line[index + FATAL_MARKER.len()..].trim();
        return OutputClass::Fatal(reason.to_string());
    }

    if line.contains(CONFIGURATION_MARKER) {
        return OutputClass::ConfigurationError(line.trim().to_string());
    }

    if progress_pattern().is_match(line) {
        return OutputClass::Progress;
    }

    OutputClass::Informational
}

/// Classify the text of a failed run
pub fn classify_failure(text: &str) -> FailureKind {
    if invalid_bbox_pattern().is_match(text) {
        FailureKind::InvalidBbox
    } else {
        FailureKind::Other
    }
}
