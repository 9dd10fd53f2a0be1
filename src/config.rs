use crate::error::ScanError;
use crate::wordlist;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_THREADS: usize = 10;
pub const MAX_THREADS: usize = 5_000;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_QUEUE_WAIT: Duration = Duration::from_secs(1);
pub const DEFAULT_STATUS: u16 = 200;
pub const DEFAULT_USER_AGENT: &str = concat!("dir-scan-rs/", env!("CARGO_PKG_VERSION"));

/// Where candidate words come from.
#[derive(Clone, Debug)]
pub enum WordlistSource {
    File(PathBuf),
    Inline(Vec<String>),
}

impl WordlistSource {
    /// Read the words. Inline lists go through the same trimming as files.
    pub async fn load(&self) -> Result<Vec<String>, ScanError> {
        match self {
            WordlistSource::File(path) => wordlist::load_wordlist_from_path(path).await,
            WordlistSource::Inline(words) => Ok(words
                .iter()
                .map(|w| w.trim())
                .filter(|w| !w.is_empty())
                .map(str::to_string)
                .collect()),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            WordlistSource::File(path) => path.display().to_string(),
            WordlistSource::Inline(words) => format!("<inline: {} words>", words.len()),
        }
    }
}

/// Immutable configuration snapshot shared read-only by every worker.
#[derive(Clone, Debug)]
pub struct ScanConfig {
    pub base_url: String,
    pub wordlist: WordlistSource,
    pub threads: usize,
    /// Ordered; an empty entry means "the bare word".
    pub extensions: Vec<String>,
    pub valid_statuses: BTreeSet<u16>,
    pub timeout: Duration,
    /// Pause between one worker's consecutive requests.
    pub delay: Duration,
    pub proxy: Option<String>,
    pub follow_redirects: bool,
    /// Slice a worker waits on an idle queue before re-checking it.
    pub queue_wait: Duration,
    pub user_agent: String,
}

impl ScanConfig {
    pub fn new(base_url: impl Into<String>, wordlist: WordlistSource) -> Self {
        Self {
            base_url: base_url.into(),
            wordlist,
            threads: DEFAULT_THREADS,
            extensions: vec![String::new()],
            valid_statuses: BTreeSet::from([DEFAULT_STATUS]),
            timeout: DEFAULT_TIMEOUT,
            delay: Duration::ZERO,
            proxy: None,
            follow_redirects: false,
            queue_wait: DEFAULT_QUEUE_WAIT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    /// Normalize and check the configuration, returning the snapshot the scan runs with.
    ///
    /// - base URL must parse as http(s) and ends up with exactly one trailing `/`
    /// - extensions lose a leading `.`; an empty list becomes `[""]`
    /// - an empty status set becomes `{200}`
    /// - thread count is clamped to [`MAX_THREADS`]
    /// - an empty proxy string is treated as no proxy
    pub fn validate(mut self) -> Result<Self, ScanError> {
        let base = self.base_url.trim();
        let parsed = reqwest::Url::parse(base)
            .map_err(|e| ScanError::InvalidConfig(format!("base URL {base:?}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ScanError::InvalidConfig(format!(
                "base URL must be http or https, got scheme {:?}",
                parsed.scheme()
            )));
        }
        self.base_url = wordlist::normalize_base_url(base);

        if self.threads == 0 {
            return Err(ScanError::InvalidConfig("thread count must be at least 1".into()));
        }
        if self.threads > MAX_THREADS {
            tracing::warn!("thread count {} clamped to {MAX_THREADS}", self.threads);
            self.threads = MAX_THREADS;
        }
        if self.timeout.is_zero() {
            return Err(ScanError::InvalidConfig("request timeout must be positive".into()));
        }
        if self.queue_wait.is_zero() {
            self.queue_wait = DEFAULT_QUEUE_WAIT;
        }

        self.extensions = self
            .extensions
            .iter()
            .map(|e| e.trim().trim_start_matches('.').to_string())
            .collect();
        if self.extensions.is_empty() {
            self.extensions.push(String::new());
        }

        if self.valid_statuses.is_empty() {
            self.valid_statuses.insert(DEFAULT_STATUS);
        }
        if let Some(bad) = self.valid_statuses.iter().find(|s| !(100..=999).contains(*s)) {
            return Err(ScanError::InvalidConfig(format!("invalid status code: {bad}")));
        }

        self.proxy = self.proxy.take().filter(|p| !p.trim().is_empty());
        Ok(self)
    }

    /// Parse a delay or timeout given in (possibly fractional) seconds.
    pub fn duration_from_secs(secs: f64) -> Result<Duration, ScanError> {
        Duration::try_from_secs_f64(secs)
            .map_err(|e| ScanError::InvalidConfig(format!("duration {secs}s: {e}")))
    }
}
