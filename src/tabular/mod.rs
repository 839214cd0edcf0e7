//! Delimited-text templates and output.
//!
//! Templates arrive as semicolon- or comma-separated text. The delimiter is
//! sniffed once from the header line. Output is always semicolon-separated.
//!
//! Two modes are available:
//!
//! - [`TabularMode::Compat`] reproduces the lenient behaviour existing
//!   templates were written against: quote characters are stripped
//!   everywhere, a delimiter inside quotes still splits, and output fields are
//!   wrapped in quotes without escaping. Values containing `"` or `;` do not
//!   survive a parse/serialize round trip.
//! - [`TabularMode::Strict`] is quote-aware in both directions (doubled-quote
//!   escapes, delimiters and line breaks inside quoted fields).

mod strict;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Delimiter used for serialized output.
pub const OUTPUT_DELIMITER: Delimiter = Delimiter::Semicolon;

/// One record: header to value, in header order.
pub type Record = IndexMap<String, String>;

/// Field separator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    /// `;`
    Semicolon,
    /// `,`
    Comma,
}

impl Delimiter {
    /// Separator character.
    pub fn as_char(&self) -> char {
        match self {
            Delimiter::Semicolon => ';',
            Delimiter::Comma => ',',
        }
    }

    /// Separator as a string slice.
    pub fn as_str(&self) -> &'static str {
        match self {
            Delimiter::Semicolon => ";",
            Delimiter::Comma => ",",
        }
    }

    /// Sniff the delimiter from a header line: semicolon if the line has one,
    /// comma otherwise.
    pub fn sniff(header_line: &str) -> Self {
        if header_line.contains(';') {
            Delimiter::Semicolon
        } else {
            Delimiter::Comma
        }
    }
}

impl fmt::Display for Delimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parsing and serialization flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TabularMode {
    /// Lenient quote stripping, unescaped quoted output
    #[default]
    Compat,
    /// Quote-aware parsing and escaped output
    Strict,
}

/// Ordered headers plus records keyed by header.
#[derive(Debug, Clone, PartialEq)]
pub struct TabularDataset {
    headers: Vec<String>,
    rows: Vec<Record>,
    delimiter: Delimiter,
}

impl TabularDataset {
    /// Create an empty dataset. Repeated headers keep their first position.
    pub fn new(headers: impl IntoIterator<Item = String>) -> Self {
        let mut unique: Vec<String> = Vec::new();
        for header in headers {
            if !unique.contains(&header) {
                unique.push(header);
            }
        }
        Self {
            headers: unique,
            rows: Vec::new(),
            delimiter: OUTPUT_DELIMITER,
        }
    }

    /// Headers, in column order.
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Records, in input order.
    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    /// Delimiter the dataset was parsed with.
    pub fn delimiter(&self) -> Delimiter {
        self.delimiter
    }

    /// Whether the dataset has a header with this name.
    pub fn has_header(&self, header: &str) -> bool {
        self.headers.iter().any(|h| h == header)
    }

    /// Append a record. The stored record has exactly this dataset's headers,
    /// in header order; missing values become empty and unknown keys are
    /// dropped.
    pub fn push_row(&mut self, mut values: Record) {
        let record = self
            .headers
            .iter()
            .map(|h| (h.clone(), values.swap_remove(h).unwrap_or_default()))
            .collect();
        self.rows.push(record);
    }

    /// Build a record from positional values. Short rows are padded with
    /// empty strings, extra values ignored; for a repeated header the last
    /// column wins.
    fn push_positional(&mut self, raw_headers: &[String], values: &[String]) {
        let mut record = Record::with_capacity(self.headers.len());
        for header in &self.headers {
            record.insert(header.clone(), String::new());
        }
        for (i, header) in raw_headers.iter().enumerate() {
            if let Some(value) = values.get(i) {
                record.insert(header.clone(), value.clone());
            }
        }
        self.rows.push(record);
    }
}

/// Parse delimited text.
///
/// A leading byte-order mark is ignored. Blank lines are skipped.
pub fn parse(text: &str, mode: TabularMode) -> TabularDataset {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let header_line = text.split('\n').next().unwrap_or_default();
    let delimiter = Delimiter::sniff(header_line);

    let records = match mode {
        TabularMode::Compat => compat_records(text, delimiter),
        TabularMode::Strict => strict::records(text, delimiter),
    };

    let mut records = records.into_iter();
    let raw_headers = records.next().unwrap_or_default();
    let mut dataset = TabularDataset::new(raw_headers.clone());
    dataset.delimiter = delimiter;

    for values in records {
        dataset.push_positional(&raw_headers, &values);
    }

    log::debug!(
        "Parsed {} columns and {} rows (delimiter '{}')",
        dataset.headers.len(),
        dataset.rows.len(),
        delimiter
    );
    dataset
}

/// Serialize a dataset as semicolon-separated text, lines joined by `\n`.
pub fn serialize(dataset: &TabularDataset, mode: TabularMode) -> String {
    serialize_rows(&dataset.headers, &dataset.rows, mode)
}

/// Serialize headers and records as semicolon-separated text.
///
/// In compat mode the header line is written bare and each value is wrapped
/// in quotes as-is. In strict mode every field, headers included, is quoted
/// with embedded quotes doubled.
pub fn serialize_rows(headers: &[String], rows: &[Record], mode: TabularMode) -> String {
    let separator = OUTPUT_DELIMITER.as_str();
    let mut lines = Vec::with_capacity(rows.len() + 1);

    lines.push(match mode {
        TabularMode::Compat => headers.join(separator),
        TabularMode::Strict => headers
            .iter()
            .map(|h| strict::quote(h))
            .collect::<Vec<_>>()
            .join(separator),
    });

    for row in rows {
        let fields: Vec<String> = headers
            .iter()
            .map(|h| {
                let value = row.get(h).map(String::as_str).unwrap_or_default();
                match mode {
                    TabularMode::Compat => format!("\"{}\"", value),
                    TabularMode::Strict => strict::quote(value),
                }
            })
            .collect();
        lines.push(fields.join(separator));
    }

    lines.join("\n")
}

fn compat_records(text: &str, delimiter: Delimiter) -> Vec<Vec<String>> {
    let mut lines = text.split('\n');
    let mut records = Vec::new();

    records.push(compat_fields(lines.next().unwrap_or_default(), delimiter));
    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        records.push(compat_fields(line, delimiter));
    }
    records
}

fn compat_fields(line: &str, delimiter: Delimiter) -> Vec<String> {
    line.split(delimiter.as_char())
        .map(|field| field.trim().replace('"', ""))
        .collect()
}
