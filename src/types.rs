use serde::{Deserialize, Serialize};
use std::fmt;

/// A fully-formed candidate URL to probe.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Target(String);

impl Target {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One recorded match: a target whose status code is in the valid-status set.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub url: String,
    pub status_code: u16,
    pub found_at: String,
}

/// Final snapshot of a scan, returned on both the completed and interrupted paths.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct ScanResults {
    pub total_targets: u64,
    pub attempted: u64,
    pub match_count: u64,
    pub interrupted: bool,
    pub entries: Vec<ProbeResult>,
}

/// Events emitted synchronously by the scan core as they occur.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ScanEvent {
    Started {
        base_url: String,
        threads: usize,
        extensions: Vec<String>,
    },
    Match(ProbeResult),
    Interrupted,
    Summary {
        matches: u64,
        attempted: u64,
        total: u64,
    },
    FatalConfig {
        message: String,
    },
}
