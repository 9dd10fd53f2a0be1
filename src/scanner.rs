use crate::config::ScanConfig;
use crate::error::ScanError;
use crate::probe::{HttpProbe, ProbeOutcome};
use crate::queue::{task_queue, TaskQueue, TaskSender};
use crate::report::ScanReporter;
use crate::types::{ProbeResult, ScanEvent, ScanResults};
use crate::wordlist::TargetGenerator;
use ::time::{format_description::well_known, OffsetDateTime};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Queue slots per worker; population runs ahead of the workers by at most this much.
const QUEUE_SLOTS_PER_WORKER: usize = 16;

/// Lifecycle of a scan. `Interrupted` is reachable from `Running` and `Draining`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Init,
    Populating,
    Running,
    Draining,
    Done,
    Interrupted,
}

/// Counters and the result collection shared by every worker.
#[derive(Clone, Debug)]
pub struct SharedProgress {
    pub attempted: Arc<AtomicU64>,
    pub match_count: Arc<AtomicU64>,
    pub entries: Arc<Mutex<Vec<ProbeResult>>>,
}

impl SharedProgress {
    pub fn new() -> Self {
        Self {
            attempted: Arc::new(AtomicU64::new(0)),
            match_count: Arc::new(AtomicU64::new(0)),
            entries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Append a match, then notify the reporter before returning.
    async fn record(&self, result: ProbeResult, reporter: &dyn ScanReporter) {
        let event = ScanEvent::Match(result.clone());
        self.entries.lock().await.push(result);
        self.match_count.fetch_add(1, Ordering::Relaxed);
        reporter.report(&event);
    }
}

impl Default for SharedProgress {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything one worker needs, injected rather than reached through globals.
#[derive(Clone)]
struct WorkerContext {
    config: Arc<ScanConfig>,
    queue: Arc<TaskQueue>,
    probe: Arc<HttpProbe>,
    progress: SharedProgress,
    reporter: Arc<dyn ScanReporter>,
    cancel: CancellationToken,
}

/// Drain the queue one target at a time until it is exhausted or the scan is cancelled.
///
/// Probe failures are dropped here. The configured delay is slept between this
/// worker's consecutive requests, not before its first.
async fn run_worker(id: usize, ctx: WorkerContext) {
    let mut first = true;
    while let Some(target) = ctx.queue.pop(&ctx.cancel).await {
        if !first && !ctx.config.delay.is_zero() {
            tokio::select! {
                _ = ctx.cancel.cancelled() => break,
                _ = time::sleep(ctx.config.delay) => {}
            }
        }
        first = false;

        let outcome = tokio::select! {
            _ = ctx.cancel.cancelled() => break,
            outcome = ctx.probe.probe(&target) => outcome,
        };
        ctx.progress.attempted.fetch_add(1, Ordering::Relaxed);

        match outcome {
            ProbeOutcome::Status(code) if ctx.config.valid_statuses.contains(&code) => {
                let result = ProbeResult {
                    url: target.into_string(),
                    status_code: code,
                    found_at: now_iso_like(),
                };
                ctx.progress.record(result, ctx.reporter.as_ref()).await;
            }
            ProbeOutcome::Status(code) => {
                tracing::trace!(worker = id, %target, code, "no match");
            }
            ProbeOutcome::Failed(kind) => {
                debug!(worker = id, %target, "probe dropped: {kind}");
            }
        }
    }
    debug!(worker = id, "worker stopped");
}

/// Feed every generated target into the queue, then drop the sender to mark the end.
async fn populate(generator: TargetGenerator, tx: TaskSender, cancel: CancellationToken) -> u64 {
    let mut queued = 0u64;
    for target in generator.targets() {
        if !tx.push(target, &cancel).await {
            break;
        }
        queued += 1;
    }
    queued
}

/// Owns the queue, the result collection and the worker pool for one scan.
pub struct Scanner {
    config: Arc<ScanConfig>,
    probe: HttpProbe,
    reporter: Arc<dyn ScanReporter>,
}

impl Scanner {
    /// Validate the configuration and build the shared HTTP transport.
    pub fn new(config: ScanConfig, reporter: Arc<dyn ScanReporter>) -> Result<Self, ScanError> {
        let config = config.validate()?;
        let probe = HttpProbe::new(&config)?;
        Ok(Self {
            config: Arc::new(config),
            probe,
            reporter,
        })
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Run the scan; Ctrl-C cancels it and still yields a summary.
    pub async fn run(self) -> Result<ScanResults, ScanError> {
        let cancel = CancellationToken::new();
        let cancel_ctrlc = cancel.clone();
        let ctrlc = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel_ctrlc.cancel();
            }
        });
        let res = self.run_with_cancel(cancel).await;
        ctrlc.abort();
        res
    }

    /// Variant that accepts a `CancellationToken` to allow external cancellation.
    ///
    /// Only an unreadable wordlist is returned as an error, before any request is made.
    pub async fn run_with_cancel(self, cancel: CancellationToken) -> Result<ScanResults, ScanError> {
        let Scanner {
            config,
            probe,
            reporter,
        } = self;
        let mut state = ScanState::Init;

        let words = match config.wordlist.load().await {
            Ok(words) => words,
            Err(e) => {
                reporter.report(&ScanEvent::FatalConfig {
                    message: e.to_string(),
                });
                return Err(e);
            }
        };
        let generator = TargetGenerator::new(&config.base_url, words, config.extensions.clone());
        let total = generator.len() as u64;
        let progress = SharedProgress::new();
        let (tx, queue) = task_queue(
            config.threads.saturating_mul(QUEUE_SLOTS_PER_WORKER),
            config.queue_wait,
        );

        reporter.report(&ScanEvent::Started {
            base_url: config.base_url.clone(),
            threads: config.threads,
            extensions: config.extensions.clone(),
        });
        info!(base_url = %config.base_url, total, threads = config.threads, "scan starting");

        transition(&mut state, ScanState::Populating);
        let mut populator: JoinHandle<u64> = tokio::spawn(populate(generator, tx, cancel.clone()));

        let ctx = WorkerContext {
            config: config.clone(),
            queue: Arc::new(queue),
            probe: Arc::new(probe),
            progress: progress.clone(),
            reporter: reporter.clone(),
            cancel: cancel.clone(),
        };
        let mut set = JoinSet::new();
        for id in 0..config.threads {
            set.spawn(run_worker(id, ctx.clone()));
        }
        // Workers hold the only other handles to the transport and queue.
        drop(ctx);
        transition(&mut state, ScanState::Running);

        let mut populated = false;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    transition(&mut state, ScanState::Interrupted);
                    break;
                }
                queued = &mut populator, if !populated => {
                    populated = true;
                    match queued {
                        Ok(n) => debug!(queued = n, "population finished"),
                        Err(e) => warn!("population task failed: {e}"),
                    }
                    transition(&mut state, ScanState::Draining);
                }
                joined = set.join_next() => match joined {
                    Some(Ok(())) => {}
                    Some(Err(e)) => warn!("worker task failed: {e}"),
                    None => {
                        transition(&mut state, ScanState::Done);
                        break;
                    }
                },
            }
        }

        if state == ScanState::Interrupted {
            info!("Scan interrupted by user (Ctrl+C). Exiting...");
            reporter.report(&ScanEvent::Interrupted);
        }

        // Cancelled workers leave at their next suspension point, so these joins are prompt.
        while let Some(joined) = set.join_next().await {
            if let Err(e) = joined {
                warn!("worker task failed: {e}");
            }
        }
        if !populated {
            if let Err(e) = populator.await {
                warn!("population task failed: {e}");
            }
        }

        finalize(state, total, &progress, reporter.as_ref()).await
    }
}

async fn finalize(
    state: ScanState,
    total: u64,
    progress: &SharedProgress,
    reporter: &dyn ScanReporter,
) -> Result<ScanResults, ScanError> {
    let entries = std::mem::take(&mut *progress.entries.lock().await);
    let results = ScanResults {
        total_targets: total,
        attempted: progress.attempted.load(Ordering::Relaxed),
        match_count: entries.len() as u64,
        interrupted: state == ScanState::Interrupted,
        entries,
    };
    reporter.report(&ScanEvent::Summary {
        matches: results.match_count,
        attempted: results.attempted,
        total: results.total_targets,
    });
    info!(
        matches = results.match_count,
        attempted = results.attempted,
        total,
        "scan finished"
    );
    Ok(results)
}

fn transition(state: &mut ScanState, next: ScanState) {
    debug!("scan state {:?} -> {:?}", state, next);
    *state = next;
}

fn now_iso_like() -> String {
    let now = OffsetDateTime::now_utc();
    now.format(&well_known::Rfc3339)
        .unwrap_or_else(|_| String::from("1970-01-01T00:00:00Z"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WordlistSource;
    use crate::report::NullReporter;
    use std::time::Duration;

    #[tokio::test]
    async fn empty_wordlist_finishes_with_zero_matches() {
        let config = ScanConfig::new("http://127.0.0.1:9", WordlistSource::Inline(Vec::new()));
        let scanner = Scanner::new(config, Arc::new(NullReporter)).unwrap();
        let results = scanner
            .run_with_cancel(CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(results.total_targets, 0);
        assert_eq!(results.attempted, 0);
        assert!(!results.interrupted);
    }

    #[tokio::test]
    async fn refused_targets_are_attempted_but_not_recorded() {
        let port = {
            let l = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            l.local_addr().unwrap().port()
        };
        let mut config = ScanConfig::new(
            format!("http://127.0.0.1:{port}"),
            WordlistSource::Inline(vec!["a".into(), "b".into(), "c".into()]),
        );
        config.threads = 2;
        config.timeout = Duration::from_secs(2);
        let scanner = Scanner::new(config, Arc::new(NullReporter)).unwrap();
        let results = scanner
            .run_with_cancel(CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(results.total_targets, 3);
        assert_eq!(results.attempted, 3);
        assert!(results.entries.is_empty());
    }

    #[tokio::test]
    async fn record_appends_and_counts() {
        let progress = SharedProgress::new();
        progress
            .record(
                ProbeResult {
                    url: "http://h/a".into(),
                    status_code: 200,
                    found_at: now_iso_like(),
                },
                &NullReporter,
            )
            .await;
        assert_eq!(progress.match_count.load(Ordering::Relaxed), 1);
        assert_eq!(progress.entries.lock().await.len(), 1);
    }
}
