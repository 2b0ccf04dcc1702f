//! Post-match clip review
//!
//! Fully local: reads an exported (or hand-made) CSV of tagged events, lets
//! the reviewer pick a row, and derives the video window around that event.
//! The video itself is referenced by its 11-character YouTube id.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fmt;

use crate::{Error, Result};

/// Offset applied around the start time when no end column is chosen
pub const DEFAULT_OFFSET_SECS: f64 = 10.0;

const EMBED_BASE_URL: &str = "https://www.youtube-nocookie.com/embed";

static VIDEO_ID_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:youtube(?:-nocookie)?\.com/(?:watch\?(?:[^#\s]*&)?v=|shorts/|embed/)|youtu\.be/)([A-Za-z0-9_-]{11})(?:[^A-Za-z0-9_-]|$)",
    )
    .expect("video id pattern is valid")
});

/// A CSV cell; numeric-looking values are coerced to numbers
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Number(f64),
    Text(String),
}

impl Cell {
    fn coerce(raw: &str) -> Self {
        match raw.parse::<f64>() {
            Ok(n) if n.is_finite() => Cell::Number(n),
            _ => Cell::Text(raw.to_string()),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            Cell::Text(_) => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Number(n) => write!(f, "{}", n),
            Cell::Text(s) => f.write_str(s),
        }
    }
}

/// Parsed CSV: header row plus data rows aligned to the headers
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CsvTable {
    headers: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl CsvTable {
    /// Parse CSV text; the first record is the header row
    ///
    /// Blank records are skipped, short records are padded with empty text
    /// and cells beyond the header count are dropped.
    pub fn parse(text: &str) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());

        let mut records = reader.records();
        let headers: Vec<String> = match records.next() {
            Some(record) => record?.iter().map(str::to_string).collect(),
            None => return Err(Error::InvalidInput("CSV file is empty".to_string())),
        };

        let mut rows = Vec::new();
        for record in records {
            let record = record?;
            if record.iter().all(str::is_empty) {
                continue;
            }
            let row = (0..headers.len())
                .map(|i| Cell::coerce(record.get(i).unwrap_or("")))
                .collect();
            rows.push(row);
        }

        Ok(Self { headers, rows })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn column_index(&self, column: &str) -> Result<usize> {
        self.headers
            .iter()
            .position(|h| h == column)
            .ok_or_else(|| Error::InvalidInput(format!("Unknown column: {}", column)))
    }

    /// Cell at `(row, column)`
    pub fn cell(&self, row: usize, column: &str) -> Result<&Cell> {
        let col = self.column_index(column)?;
        let record = self.rows.get(row).ok_or_else(|| {
            Error::InvalidInput(format!("Row {} out of range ({} rows)", row, self.rows.len()))
        })?;
        Ok(&record[col])
    }
}

/// Video window in whole seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClipWindow {
    pub start: u64,
    pub end: u64,
}

/// Derive the clip window for a selected row
///
/// With a numeric end cell the window is `[start, end]` and the offset is
/// ignored; otherwise it is `[start - offset, start + offset]`. Bounds are
/// floored and the lower bound is clamped at zero.
pub fn clip_window(
    table: &CsvTable,
    row: usize,
    start_column: &str,
    end_column: Option<&str>,
    offset_secs: f64,
) -> Result<ClipWindow> {
    if !offset_secs.is_finite() || offset_secs < 0.0 {
        return Err(Error::InvalidInput(format!("Invalid offset: {}", offset_secs)));
    }

    let start = table.cell(row, start_column)?.as_number().ok_or_else(|| {
        Error::InvalidInput(format!("Column '{}' is not numeric in row {}", start_column, row))
    })?;

    let end = match end_column {
        Some(column) => table.cell(row, column)?.as_number(),
        None => None,
    };

    let (from, to) = match end {
        Some(end) => (start, end),
        None => (start - offset_secs, start + offset_secs),
    };

    Ok(ClipWindow {
        start: whole_secs(from),
        end: whole_secs(to),
    })
}

fn whole_secs(value: f64) -> u64 {
    value.floor().max(0.0) as u64
}

/// Extract the 11-character video id from a pasted YouTube URL
///
/// Accepts watch, short-link, shorts and embed URL shapes.
pub fn extract_video_id(url: &str) -> Result<String> {
    VIDEO_ID_PATTERN
        .captures(url.trim())
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| Error::InvalidInput(format!("Not a recognised video URL: {}", url.trim())))
}

/// Privacy-enhanced embed URL, optionally limited to a clip window
pub fn embed_url(video_id: &str, window: Option<ClipWindow>) -> String {
    match window {
        Some(w) => format!("{}/{}?start={}&end={}", EMBED_BASE_URL, video_id, w.start, w.end),
        None => format!("{}/{}", EMBED_BASE_URL, video_id),
    }
}
