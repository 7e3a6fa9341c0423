//! Error types for the stats collector.
//!
//! Transport failures are reported as [`UnavailableError`] and are recovered
//! by the collector as an empty cycle. Row-level problems in a report are
//! [`ParseError`]s; the offending line is skipped and parsing continues.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

/// The control socket could not be reached or did not answer in time.
#[derive(Debug, thiserror::Error)]
pub enum UnavailableError {
    #[error("unable to connect to control socket at {}: {source}", path.display())]
    Connect {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to send command to {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read response from {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("no complete response from {} within {timeout:?}", path.display())]
    TimedOut { path: PathBuf, timeout: Duration },
}

impl UnavailableError {
    /// Path of the socket the failed exchange was addressed to.
    pub fn path(&self) -> &PathBuf {
        match self {
            Self::Connect { path, .. }
            | Self::Write { path, .. }
            | Self::Read { path, .. }
            | Self::TimedOut { path, .. } => path,
        }
    }
}

/// A single line of a report that could not be interpreted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("line {line}: expected `key: value`")]
    MissingSeparator { line: usize },

    #[error("line {line}: expected {expected} fields, found {found}")]
    FieldCount {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("line {line}: unterminated quoted field")]
    UnterminatedQuote { line: usize },
}
