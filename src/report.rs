use crate::types::ScanEvent;
use colored::Colorize;
use std::io::Write;
use std::sync::Mutex;

/// Consumer of scan events. Called synchronously from workers and the coordinator,
/// so implementations must be cheap and thread-safe.
pub trait ScanReporter: Send + Sync {
    fn report(&self, event: &ScanEvent);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReporter;

impl ScanReporter for NullReporter {
    fn report(&self, _event: &ScanEvent) {}
}

type SharedWriter = Mutex<Box<dyn Write + Send>>;

/// Write one line. Failures such as a closed pipe are ignored.
fn write_line(out: &SharedWriter, line: &str) {
    let mut out = out.lock().unwrap_or_else(|e| e.into_inner());
    if let Err(e) = writeln!(out, "{line}").and_then(|_| out.flush()) {
        tracing::trace!("dropped report line: {e}");
    }
}

/// Colored human-readable lines on stdout; fatal errors on stderr.
pub struct ConsoleReporter {
    out: SharedWriter,
    err: SharedWriter,
}

impl ConsoleReporter {
    pub fn with_writers(out: Box<dyn Write + Send>, err: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
            err: Mutex::new(err),
        }
    }
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::with_writers(Box::new(std::io::stdout()), Box::new(std::io::stderr()))
    }
}

impl ScanReporter for ConsoleReporter {
    fn report(&self, event: &ScanEvent) {
        let line = render_line(event);
        match event {
            ScanEvent::FatalConfig { .. } => write_line(&self.err, &line),
            _ => write_line(&self.out, &line),
        }
    }
}

/// Render one event as a console line.
pub fn render_line(event: &ScanEvent) -> String {
    match event {
        ScanEvent::Started {
            base_url,
            threads,
            extensions,
        } => format!(
            "[*] Starting directory scan on {base_url} with {threads} threads, extensions={extensions:?}"
        )
        .cyan()
        .to_string(),
        ScanEvent::Match(r) => {
            let line = format!("[+] {} -> {}", r.url, r.status_code);
            if r.status_code < 300 {
                line.green().to_string()
            } else {
                line.yellow().to_string()
            }
        }
        ScanEvent::Interrupted => "[!] Scan interrupted by user, finishing up..."
            .yellow()
            .to_string(),
        ScanEvent::Summary { matches, .. } => format!("[*] Scan complete: {matches} valid paths found.")
            .magenta()
            .to_string(),
        ScanEvent::FatalConfig { message } => format!("[!] {message}").red().bold().to_string(),
    }
}

/// One JSON object per event on stdout, for piping into other tools.
pub struct JsonLinesReporter {
    out: SharedWriter,
}

impl JsonLinesReporter {
    pub fn with_writer(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }
}

impl Default for JsonLinesReporter {
    fn default() -> Self {
        Self::with_writer(Box::new(std::io::stdout()))
    }
}

impl ScanReporter for JsonLinesReporter {
    fn report(&self, event: &ScanEvent) {
        match serde_json::to_string(event) {
            Ok(line) => write_line(&self.out, &line),
            Err(e) => tracing::warn!("failed to serialize event: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::Arc;
    use crate::types::ProbeResult;

    fn plain(event: &ScanEvent) -> String {
        colored::control::set_override(false);
        render_line(event)
    }

    #[test]
    fn renders_match_and_summary() {
        let m = ScanEvent::Match(ProbeResult {
            url: "http://h/admin".into(),
            status_code: 200,
            found_at: "2024-01-01T00:00:00Z".into(),
        });
        assert_eq!(plain(&m), "[+] http://h/admin -> 200");
        let s = ScanEvent::Summary {
            matches: 3,
            attempted: 10,
            total: 10,
        };
        assert_eq!(plain(&s), "[*] Scan complete: 3 valid paths found.");
    }

    /// Behaves like stdout after the reader of a pipe has gone away.
    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }
        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }
    }

    #[test]
    fn closed_pipe_does_not_panic() {
        let console = ConsoleReporter::with_writers(Box::new(ClosedPipe), Box::new(ClosedPipe));
        let json = JsonLinesReporter::with_writer(Box::new(ClosedPipe));
        let events = [
            ScanEvent::Interrupted,
            ScanEvent::FatalConfig {
                message: "boom".into(),
            },
            ScanEvent::Summary {
                matches: 0,
                attempted: 0,
                total: 0,
            },
        ];
        for e in &events {
            console.report(e);
            json.report(e);
        }
    }

    #[test]
    fn writes_one_line_per_event() {
        let buf = SharedBuf::default();
        let json = JsonLinesReporter::with_writer(Box::new(buf.clone()));
        json.report(&ScanEvent::Interrupted);
        json.report(&ScanEvent::Interrupted);
        let text = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        assert_eq!(text, "{\"event\":\"interrupted\"}\n{\"event\":\"interrupted\"}\n");
    }

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn json_is_tagged() {
        let v = serde_json::to_value(ScanEvent::Summary {
            matches: 1,
            attempted: 2,
            total: 2,
        })
        .unwrap();
        assert_eq!(v["event"], "summary");
        assert_eq!(v["matches"], 1);

        let v = serde_json::to_value(ScanEvent::Match(ProbeResult {
            url: "http://h/x".into(),
            status_code: 301,
            found_at: String::new(),
        }))
        .unwrap();
        assert_eq!(v["event"], "match");
        assert_eq!(v["status_code"], 301);
    }
}
