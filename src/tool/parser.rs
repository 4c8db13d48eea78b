//! Interpretation of exiftool's line-oriented report text.
//!
//! The tool's output is a human-readable report, not a machine format:
//! localization and version drift make malformed or unexpected lines a
//! normal occurrence. Every line therefore parses to an explicit
//! [`LineOutcome`] — a value, a silent ignore, or a skip with a reason —
//! and one bad line never aborts the surrounding parse.

use chrono::NaiveDateTime;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::metadata::{self, ImageMetadata};

/// Tag printed for the capture timestamp.
pub const TAG_CAPTURE_TIMESTAMP: &str = "DateTimeOriginal";
/// Tag printed for the image width.
pub const TAG_IMAGE_WIDTH: &str = "ImageWidth";
/// Tag printed for the image height.
pub const TAG_IMAGE_HEIGHT: &str = "ImageHeight";

/// Why a line of tool output was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
    #[error("no `:` separator")]
    MissingSeparator,
    #[error("missing tab-delimited column {0}")]
    MissingColumn(usize),
    #[error("invalid timestamp `{0}`")]
    InvalidTimestamp(String),
    #[error("invalid dimension `{0}`")]
    InvalidDimension(String),
}

/// Outcome of parsing one line of tool output.
#[derive(Debug, Clone, PartialEq)]
pub enum LineOutcome<T> {
    /// The line carried a value the record tracks.
    Parsed(T),
    /// Well-formed line for a tag the record does not track.
    Ignored,
    /// Malformed line; carries the reason for diagnostics.
    Skip(SkipReason),
}

/// One field extracted from a `Key: value` report line.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordField {
    CaptureTimestamp(NaiveDateTime),
    Width(u32),
    Height(u32),
}

/// Split raw tool output into trimmed, non-empty lines.
///
/// Handles every line-ending style the tool produces (`\r\n`, `\n`, `\r`).
pub fn split_lines(raw: &str) -> Vec<&str> {
    raw.split(['\n', '\r'])
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect()
}

/// Parse one `Key: value` line from a single-record (`-S`) report.
///
/// The substring before the first `:` is the tag name; the remainder is
/// the value, both trimmed.
pub fn parse_record_line(line: &str) -> LineOutcome<RecordField> {
    let Some(index) = line.find(':') else {
        return LineOutcome::Skip(SkipReason::MissingSeparator);
    };
    let key = line[..index].trim();
    let value = line[index + 1..].trim();

    match key {
        TAG_CAPTURE_TIMESTAMP => match metadata::parse_exif_timestamp(value) {
            Some(ts) => LineOutcome::Parsed(RecordField::CaptureTimestamp(ts)),
            None => LineOutcome::Skip(SkipReason::InvalidTimestamp(value.to_string())),
        },
        TAG_IMAGE_WIDTH => match parse_dimension(value) {
            Some(n) => LineOutcome::Parsed(RecordField::Width(n)),
            None => LineOutcome::Skip(SkipReason::InvalidDimension(value.to_string())),
        },
        TAG_IMAGE_HEIGHT => match parse_dimension(value) {
            Some(n) => LineOutcome::Parsed(RecordField::Height(n)),
            None => LineOutcome::Skip(SkipReason::InvalidDimension(value.to_string())),
        },
        _ => LineOutcome::Ignored,
    }
}

/// Dimensions are positive pixel counts.
fn parse_dimension(value: &str) -> Option<u32> {
    match value.parse::<u32>() {
        Ok(0) => None,
        Ok(n) => Some(n),
        Err(_) => None,
    }
}

/// Parse one tab-delimited line from a batch (`-T`) report.
///
/// Column 0 is the file name relative to the queried folder, column 1 the
/// capture timestamp. The tool prints `-` for files without the tag; that
/// value fails timestamp parsing and the line is skipped.
pub fn parse_batch_line(line: &str) -> LineOutcome<(String, NaiveDateTime)> {
    let mut columns = line.split('\t');
    let Some(name) = columns.next().map(str::trim).filter(|c| !c.is_empty()) else {
        return LineOutcome::Skip(SkipReason::MissingColumn(0));
    };
    let Some(value) = columns.next() else {
        return LineOutcome::Skip(SkipReason::MissingColumn(1));
    };

    match metadata::parse_exif_timestamp(value) {
        Some(ts) => LineOutcome::Parsed((name.to_string(), ts)),
        None => LineOutcome::Skip(SkipReason::InvalidTimestamp(value.trim().to_string())),
    }
}

/// Build an [`ImageMetadata`] record from a single-record report.
///
/// Accumulates every line that parses; skipped lines are logged and do
/// not affect the rest. An empty report yields the all-absent record.
pub fn parse_metadata_report(raw: &str) -> ImageMetadata {
    let mut meta = ImageMetadata::default();

    for line in split_lines(raw) {
        match parse_record_line(line) {
            LineOutcome::Parsed(RecordField::CaptureTimestamp(ts)) => {
                meta.capture_timestamp = Some(ts);
            }
            LineOutcome::Parsed(RecordField::Width(n)) => meta.width = Some(n),
            LineOutcome::Parsed(RecordField::Height(n)) => meta.height = Some(n),
            LineOutcome::Ignored => {}
            LineOutcome::Skip(reason) => {
                log::warn!("Failed to parse line `{line}`: {reason}");
            }
        }
    }

    meta
}

/// Build the per-file timestamp mapping from a batch report.
///
/// Keys are `folder`-relative names resolved against `folder`. Lines that
/// fail to parse are logged and skipped; the rest of the report is still
/// processed.
pub fn parse_batch_report(raw: &str, folder: &Path) -> HashMap<PathBuf, NaiveDateTime> {
    let mut dates = HashMap::new();

    for line in split_lines(raw) {
        match parse_batch_line(line) {
            LineOutcome::Parsed((name, ts)) => {
                dates.insert(folder.join(name), ts);
            }
            LineOutcome::Ignored => {}
            LineOutcome::Skip(reason) => {
                log::warn!("Failed to parse line `{line}`: {reason}");
            }
        }
    }

    dates
}
