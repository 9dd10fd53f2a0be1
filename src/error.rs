use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a scan before any worker starts.
///
/// Per-target network failures never surface here; see [`crate::probe::ProbeOutcome`].
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("cannot open wordlist {}: {source}", path.display())]
    Wordlist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid proxy {proxy}: {source}")]
    Proxy {
        proxy: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
}
