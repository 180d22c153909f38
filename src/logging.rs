use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

const DEFAULT_FILTER: &str = "webforge=info";
const LOG_FILE_NAME: &str = "webforge.log";

/// Keeps the file writer alive and hands the diagnostics feed to the UI.
pub struct LoggingGuard {
    _file_guard: WorkerGuard,
    log_dir: PathBuf,
    diagnostics: Option<Receiver<String>>,
}

impl LoggingGuard {
    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    pub fn take_log_rx(&mut self) -> Option<Receiver<String>> {
        self.diagnostics.take()
    }
}

/// `MakeWriter` for the Diagnostics panel: one channel message per line.
#[derive(Clone)]
struct DiagnosticsSink {
    tx: Sender<String>,
}

impl<'a> MakeWriter<'a> for DiagnosticsSink {
    type Writer = DiagnosticsLines;

    fn make_writer(&'a self) -> Self::Writer {
        DiagnosticsLines {
            pending: Vec::new(),
            tx: self.tx.clone(),
        }
    }
}

struct DiagnosticsLines {
    pending: Vec<u8>,
    tx: Sender<String>,
}

impl DiagnosticsLines {
    fn send(&self, bytes: &[u8]) {
        let line = String::from_utf8_lossy(bytes);
        let line = line.trim_end_matches('\r');
        if !line.is_empty() {
            let _ = self.tx.send(line.to_string());
        }
    }
}

impl Write for DiagnosticsLines {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pending.extend_from_slice(buf);
        while let Some(end) = self.pending.iter().position(|byte| *byte == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=end).collect();
            self.send(&line[..end]);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for DiagnosticsLines {
    fn drop(&mut self) {
        if !self.pending.is_empty() {
            let rest = std::mem::take(&mut self.pending);
            self.send(&rest);
        }
    }
}

fn log_dir() -> io::Result<PathBuf> {
    let dir = std::env::temp_dir().join("webforge").join("logs");
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Logs panics, then hands them to the hook that was installed before, so
/// they still reach stderr.
fn install_panic_hook() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        tracing::error!(panic = %info, "panic");
        previous(info);
    }));
}

/// Installs the global subscriber.
///
/// The daily log file gets every event the `RUST_LOG` filter lets through
/// (default `webforge=info`), with targets and source locations. The
/// Diagnostics panel gets a compact, timestamp-free copy of INFO and above.
/// Returns `None` when logging could not be set up; the app runs without it.
pub fn init() -> Option<LoggingGuard> {
    let log_dir = log_dir().ok()?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, LOG_FILE_NAME);
    let (file_writer, file_guard) = tracing_appender::non_blocking(file_appender);
    let (tx, rx) = mpsc::channel::<String>();

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    let diagnostics_layer = tracing_subscriber::fmt::layer()
        .compact()
        .without_time()
        .with_target(false)
        .with_ansi(false)
        .with_writer(DiagnosticsSink { tx })
        .with_filter(LevelFilter::INFO);

    if tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(diagnostics_layer)
        .try_init()
        .is_err()
    {
        return None;
    }

    install_panic_hook();
    tracing::info!(log_dir = %log_dir.display(), "logging started");

    Some(LoggingGuard {
        _file_guard: file_guard,
        log_dir,
        diagnostics: Some(rx),
    })
}

#[cfg(test)]
mod tests {
    use super::DiagnosticsSink;
    use std::io::Write;
    use std::sync::mpsc;
    use tracing_subscriber::fmt::MakeWriter;

    #[test]
    fn complete_lines_are_sent_as_they_are_written() {
        let (tx, rx) = mpsc::channel();
        let sink = DiagnosticsSink { tx };
        let mut writer = sink.make_writer();

        writer.write_all(b"first line\nsecond ").unwrap();
        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec!["first line".to_string()]);

        writer.write_all(b"line\r\n\ntail").unwrap();
        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec!["second line".to_string()]);

        drop(writer);
        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec!["tail".to_string()]);
    }

    #[test]
    fn empty_writer_sends_nothing_on_drop() {
        let (tx, rx) = mpsc::channel();
        drop(DiagnosticsSink { tx }.make_writer());
        assert!(rx.try_iter().next().is_none());
    }
}
