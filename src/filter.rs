//! Selection of the `show stat` rows worth reporting.

use ahash::AHashSet as HashSet;

use crate::report::StatRow;

/// Entity classes monitored when none are configured.
pub const DEFAULT_PROXY_MONITORS: [&str; 3] = ["server", "frontend", "backend"];

/// Class that also enables the process-wide `show info` samples.
pub const SERVER_CLASS: &str = "server";

/// Monitored entity classes/names and ignored proxies.
#[derive(Debug, Clone)]
pub struct MonitorFilter {
    monitors: HashSet<String>,
    ignore: HashSet<String>,
}

impl MonitorFilter {
    /// Builds a filter. Monitor tokens are lower-cased, ignored proxy names are
    /// kept as given.
    pub fn new<M, I>(monitors: M, ignore: I) -> Self
    where
        M: IntoIterator,
        M::Item: AsRef<str>,
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self {
            monitors: monitors
                .into_iter()
                .map(|m| m.as_ref().to_lowercase())
                .collect(),
            ignore: ignore.into_iter().map(Into::into).collect(),
        }
    }

    pub fn monitors(&self) -> &HashSet<String> {
        &self.monitors
    }

    pub fn ignore(&self) -> &HashSet<String> {
        &self.ignore
    }

    /// Whether the process-wide info report is wanted.
    pub fn monitors_server(&self) -> bool {
        self.monitors.contains(SERVER_CLASS)
    }

    /// Keeps a row when its lower-cased svname or pxname is monitored and its
    /// exact pxname is not ignored.
    pub fn should_keep(&self, row: &StatRow) -> bool {
        let monitored = self.monitors.contains(&row.svname().to_lowercase())
            || self.monitors.contains(&row.pxname().to_lowercase());
        if !monitored {
            return false;
        }
        !self.ignore.contains(row.pxname())
    }
}

impl Default for MonitorFilter {
    fn default() -> Self {
        Self::new(DEFAULT_PROXY_MONITORS, Vec::<String>::new())
    }
}
