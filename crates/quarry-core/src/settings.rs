//! Connector limits

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 10;
/// Also the hard ceiling: a preview never returns more rows than this
pub const DEFAULT_PREVIEW_ROW_LIMIT: usize = 10;

/// Timeouts and limits applied to every connector operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectorSettings {
    pub connect_timeout_secs: u64,
    pub query_timeout_secs: u64,
    pub preview_row_limit: usize,
}

impl Default for ConnectorSettings {
    fn default() -> Self {
        Self {
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            query_timeout_secs: DEFAULT_QUERY_TIMEOUT_SECS,
            preview_row_limit: DEFAULT_PREVIEW_ROW_LIMIT,
        }
    }
}

impl ConnectorSettings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs.max(1))
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs.max(1))
    }

    /// Row limit for previews, clamped to `1..=DEFAULT_PREVIEW_ROW_LIMIT`
    pub fn preview_row_limit(&self) -> usize {
        self.preview_row_limit.clamp(1, DEFAULT_PREVIEW_ROW_LIMIT)
    }

    /// Upper bound on a health probe: connect plus one query
    pub fn probe_budget(&self) -> Duration {
        self.connect_timeout() + self.query_timeout()
    }
}
