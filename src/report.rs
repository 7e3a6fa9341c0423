//! Parsers for the two HAProxy report shapes.
//!
//! `show info` answers with flat `Key: Value` lines, `show stat` answers with a
//! CSV table whose first line is the header. The two shapes are parsed into two
//! distinct types, [`InfoReport`] and [`StatsReport`], so one can never be
//! mistaken for the other downstream.

use std::sync::Arc;
use tracing::debug;

use crate::error::{ParseError, UnavailableError};
use crate::transport::ControlSocket;

/// Command returning the process-wide key/value report.
pub const SHOW_INFO: &str = "show info";

/// Command returning the per-proxy CSV report.
pub const SHOW_STAT: &str = "show stat";

/// Process-wide `show info` values, in the order they were received.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InfoReport {
    entries: Vec<(String, String)>,
}

impl InfoReport {
    /// Inserts `key`, replacing the value of an earlier entry with the same key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One data line of `show stat`, keyed by the header columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatRow {
    columns: Arc<[String]>,
    values: Vec<String>,
}

impl StatRow {
    pub fn get(&self, column: &str) -> Option<&str> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|idx| self.values[idx].as_str())
    }

    /// Proxy name (`pxname` column).
    pub fn pxname(&self) -> &str {
        self.get("pxname").unwrap_or_default()
    }

    /// Service name (`svname` column): a server, `FRONTEND` or `BACKEND`.
    pub fn svname(&self) -> &str {
        self.get("svname").unwrap_or_default()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.columns
            .iter()
            .zip(self.values.iter())
            .map(|(c, v)| (c.as_str(), v.as_str()))
    }
}

/// Parsed `show stat` table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsReport {
    pub header: Vec<String>,
    pub rows: Vec<StatRow>,
    /// Data lines that were dropped, in response order.
    pub rejected: Vec<ParseError>,
}

/// Parses a `show info` response.
///
/// Each line is split on its first colon and both halves are trimmed. Lines
/// without a colon or with an empty key are skipped.
pub fn parse_info(output: &str) -> InfoReport {
    let mut report = InfoReport::default();

    for (idx, line) in output.lines().enumerate() {
        let Some((key, value)) = line.split_once(':') else {
            if !line.trim().is_empty() {
                debug!("Skipping info {}", ParseError::MissingSeparator { line: idx + 1 });
            }
            continue;
        };

        let key = key.trim();
        if key.is_empty() {
            debug!("Skipping info {}", ParseError::MissingSeparator { line: idx + 1 });
            continue;
        }

        report.insert(key, value.trim());
    }

    report
}

/// Parses a `show stat` response.
///
/// The leading `# ` comment marker of the header is removed and the single
/// terminating comma is stripped from every line before the CSV is split, so
/// empty trailing columns survive. A
/// data line whose field count differs from the header is dropped and
/// recorded in [`StatsReport::rejected`]; the rest of the table is kept.
pub fn parse_stats(output: &str) -> StatsReport {
    let output = output
        .trim_start_matches(|c: char| c == '#' || c == ' ')
        .trim();

    let mut lines = output.lines().map(|l| l.strip_suffix(',').unwrap_or(l));
    let Some(header_line) = lines.next() else {
        return StatsReport::default();
    };

    let header = match split_record(header_line) {
        Some(header) if !header_line.is_empty() => header,
        _ => return StatsReport::default(),
    };
    let columns: Arc<[String]> = header.clone().into();

    let mut report = StatsReport {
        header,
        ..Default::default()
    };

    // Line numbers are 1-based and count the header.
    for (idx, line) in lines.enumerate() {
        let line_no = idx + 2;
        if line.trim().is_empty() {
            continue;
        }

        let Some(values) = split_record(line) else {
            report
                .rejected
                .push(ParseError::UnterminatedQuote { line: line_no });
            continue;
        };

        if values.len() != columns.len() {
            report.rejected.push(ParseError::FieldCount {
                line: line_no,
                expected: columns.len(),
                found: values.len(),
            });
            continue;
        }

        report.rows.push(StatRow {
            columns: Arc::clone(&columns),
            values,
        });
    }

    for err in &report.rejected {
        debug!("Skipping stat {}", err);
    }

    report
}

/// Splits one CSV record, honouring double-quoted fields and `""` escapes.
/// Returns `None` if a quoted field is never closed.
fn split_record(line: &str) -> Option<Vec<String>> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut chars = line.chars().peekable();
    let mut in_quotes = false;

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' if field.is_empty() => in_quotes = true,
            ',' if !in_quotes => fields.push(std::mem::take(&mut field)),
            _ => field.push(c),
        }
    }

    if in_quotes {
        return None;
    }
    fields.push(field);
    Some(fields)
}

/// Issues report commands over a [`ControlSocket`].
#[derive(Debug, Clone)]
pub struct HaproxyClient<S> {
    socket: S,
}

impl<S: ControlSocket> HaproxyClient<S> {
    pub fn new(socket: S) -> Self {
        Self { socket }
    }

    pub fn socket(&self) -> &S {
        &self.socket
    }

    /// Sends `show info` and parses the key/value report.
    pub fn get_server_info(&self) -> Result<InfoReport, UnavailableError> {
        let output = self.socket.communicate(SHOW_INFO)?;
        Ok(parse_info(&output))
    }

    /// Sends `show stat` and parses the CSV report.
    pub fn get_server_stats(&self) -> Result<StatsReport, UnavailableError> {
        let output = self.socket.communicate(SHOW_STAT)?;
        Ok(parse_stats(&output))
    }
}
