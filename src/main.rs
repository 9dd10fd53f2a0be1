use std::collections::BTreeSet;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use dir_scan_rs::config::{ScanConfig, WordlistSource};
use dir_scan_rs::logging;
use dir_scan_rs::report::{ConsoleReporter, JsonLinesReporter, ScanReporter};
use dir_scan_rs::scanner::Scanner;
use dir_scan_rs::types::ScanEvent;

use anyhow::{Context, Result};
use clap::Parser;

/// dir-scan-rs — concurrent web path brute-force scanner.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "dir-scan-rs",
    version,
    about = "Concurrent web path brute-force scanner.",
    long_about = None
)]
struct Cli {
    /// Base URL (e.g., http://example.com).
    #[arg(short = 'u', long)]
    url: String,

    /// Path to wordlist file (one word per line).
    #[arg(short = 'w', long)]
    wordlist: PathBuf,

    /// Number of concurrent workers (1 to 5000; larger values are clamped).
    #[arg(short = 't', long, default_value_t = 10)]
    threads: usize,

    /// File extensions to append (e.g., php html txt). Pass "" to also try the bare word.
    #[arg(short = 'x', long, num_args = 0.., value_delimiter = ',', default_values_t = [String::new()])]
    extensions: Vec<String>,

    /// HTTP status codes to report.
    #[arg(short = 's', long = "status", num_args = 0.., value_delimiter = ',', default_values_t = [200u16])]
    statuses: Vec<u16>,

    /// Delay between one worker's consecutive requests, in seconds.
    #[arg(long, default_value_t = 0.0)]
    delay: f64,

    /// Per-request timeout in seconds.
    #[arg(long, default_value_t = 5.0)]
    timeout: f64,

    /// Proxy URL (e.g., http://127.0.0.1:8080).
    #[arg(long)]
    proxy: Option<String>,

    /// Follow redirects instead of reporting 3xx codes as-is.
    #[arg(long = "follow-redirects", default_value_t = false)]
    follow_redirects: bool,

    /// Emit events as JSON lines instead of colored text.
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Log scan progress to stderr.
    #[arg(short = 'v', long, default_value_t = false)]
    verbose: bool,

    /// Log per-request detail to stderr.
    #[arg(long, default_value_t = false)]
    debug: bool,
}

impl Cli {
    fn to_config(&self) -> Result<ScanConfig> {
        let mut config = ScanConfig::new(&self.url, WordlistSource::File(self.wordlist.clone()));
        config.threads = self.threads;
        config.extensions = self.extensions.clone();
        config.valid_statuses = self.statuses.iter().copied().collect::<BTreeSet<u16>>();
        config.delay = ScanConfig::duration_from_secs(self.delay).context("invalid --delay")?;
        config.timeout = ScanConfig::duration_from_secs(self.timeout).context("invalid --timeout")?;
        config.proxy = self.proxy.clone();
        config.follow_redirects = self.follow_redirects;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    logging::init(logging::level_from_flags(cli.verbose, cli.debug))?;

    let reporter: Arc<dyn ScanReporter> = if cli.json {
        Arc::new(JsonLinesReporter::default())
    } else {
        Arc::new(ConsoleReporter::default())
    };

    let scanner = match cli.to_config().and_then(|c| Ok(Scanner::new(c, reporter.clone())?)) {
        Ok(s) => s,
        Err(e) => {
            reporter.report(&ScanEvent::FatalConfig {
                message: format!("{e:#}"),
            });
            return Ok(ExitCode::FAILURE);
        }
    };

    let cfg = scanner.config();
    tracing::info!(
        url = %cfg.base_url,
        wordlist = %cfg.wordlist.describe(),
        threads = cfg.threads,
        statuses = ?cfg.valid_statuses,
        timeout_ms = cfg.timeout.as_millis() as u64,
        delay_ms = cfg.delay.as_millis() as u64,
        proxy = cfg.proxy.as_deref().unwrap_or("<none>"),
        "configuration"
    );

    match scanner.run().await {
        Ok(_) => Ok(ExitCode::SUCCESS),
        // The scanner already reported the fatal event.
        Err(e) => {
            tracing::debug!("scan aborted: {e}");
            Ok(ExitCode::FAILURE)
        }
    }
}
