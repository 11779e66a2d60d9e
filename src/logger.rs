//! Structured logging for pktlens.
//!
//! Provides a [`Logger`] that writes events to stderr and optionally to a log
//! file. Output can be formatted as human-readable plain text or as
//! newline-delimited JSON (NDJSON). Reports themselves go to stdout, so the
//! two streams never interleave.
//!
//! The analysis functions never log. Events come from the pipeline, the
//! capture store and the CLI.

use chrono::Local;
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::{self, BufWriter, Write};
use std::sync::{Arc, Mutex};

// ── Event types ──────────────────────────────────────────────────────────────

/// All distinct event kinds that pktlens can emit.
///
/// The `#[serde(tag = "event")]` attribute puts an `"event"` key in the JSON
/// output so consumers can filter by type without inspecting structure.
#[derive(Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event<'a> {
    /// Informational status message.
    Info { message: &'a str },

    /// A batch was produced by the simulated capture source.
    CaptureSimulated { packets: usize, seed: u64 },

    /// A batch was written to the capture store.
    CaptureSaved { file: &'a str, packets: usize },

    /// A batch was read from the capture store.
    CaptureLoaded { file: &'a str, packets: usize },

    /// A capture file was removed.
    CaptureDeleted { file: &'a str },

    /// A capture store operation failed.
    StorageFailure {
        operation: &'a str,
        file:      &'a str,
        reason:    &'a str,
    },

    /// The filter stage narrowed a batch.
    FiltersApplied {
        before:  usize,
        after:   usize,
        filters: usize,
    },

    /// The issue detector reported a finding.
    IssueDetected {
        kind:        &'a str,
        severity:    &'a str,
        description: &'a str,
    },

    /// Summary emitted after a batch has been fully analysed.
    AnalysisSummary {
        packets_in:  usize,
        packets_out: usize,
        total_bytes: u64,
        issues:      usize,
        elapsed_ms:  u128,
    },
}

// ── Logger ───────────────────────────────────────────────────────────────────

/// Shared, thread-safe structured logger.
///
/// Constructed once in `main` and passed as an `Arc<Logger>`. The internal
/// `Mutex` serialises file writes so lines are never interleaved.
pub struct Logger {
    /// Format events as NDJSON instead of plain text.
    json:    bool,
    /// Suppress the stderr copy; the file (if any) still receives events.
    quiet:   bool,
    /// Optional buffered file writer. `None` when `--log-file` was not given.
    file:    Option<Mutex<BufWriter<std::fs::File>>>,
}

pub type SharedLogger = Arc<Logger>;

impl Logger {
    /// Creates a new logger.
    ///
    /// # Errors
    /// Returns an `io::Error` if the log file cannot be opened or created.
    pub fn new(json: bool, log_path: Option<&str>) -> io::Result<Self> {
        let file = match log_path {
            Some(path) => {
                let f = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)?;
                Some(Mutex::new(BufWriter::new(f)))
            }
            None => None,
        };

        Ok(Self { json, quiet: false, file })
    }

    /// A logger that discards everything. Used by library callers and tests
    /// that only want the computed results.
    pub fn silent() -> Self {
        Self { json: false, quiet: true, file: None }
    }

    pub fn shared(self) -> SharedLogger {
        Arc::new(self)
    }

    /// Logs a single [`Event`] to stderr and, if configured, the log file.
    pub fn log(&self, event: &Event) {
        if self.quiet && self.file.is_none() {
            return;
        }

        let line = self.render(event);

        if !self.quiet {
            eprintln!("{}", line);
        }

        if let Some(mutex) = &self.file {
            if let Ok(mut writer) = mutex.lock() {
                let _ = writeln!(writer, "{}", line);
                let _ = writer.flush();
            }
        }
    }

    /// Renders an event as one output line, timestamp included.
    pub fn render(&self, event: &Event) -> String {
        let timestamp = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f").to_string();

        if self.json {
            let mut val = serde_json::to_value(event).unwrap_or_default();
            if let Some(obj) = val.as_object_mut() {
                obj.insert("timestamp".to_string(), serde_json::Value::String(timestamp));
            }
            serde_json::to_string(&val).unwrap_or_default()
        } else {
            format!("[{}] {}", timestamp, plain_text(event))
        }
    }
}

/// Formats an [`Event`] as human-readable text (no timestamp).
fn plain_text(event: &Event) -> String {
    match event {
        Event::Info { message } =>
            format!("[INFO] {}", message),

        Event::CaptureSimulated { packets, seed } =>
            format!("[CAPTURE] simulated {} packets (seed {})", packets, seed),

        Event::CaptureSaved { file, packets } =>
            format!("[STORAGE] saved {} packets to {}", packets, file),

        Event::CaptureLoaded { file, packets } =>
            format!("[STORAGE] loaded {} packets from {}", packets, file),

        Event::CaptureDeleted { file } =>
            format!("[STORAGE] deleted {}", file),

        Event::StorageFailure { operation, file, reason } =>
            format!("[STORAGE ERROR] {} {} failed: {}", operation, file, reason),

        Event::FiltersApplied { before, after, filters } =>
            format!("[FILTER] {} filters: {} -> {} packets", filters, before, after),

        Event::IssueDetected { kind, severity, description } =>
            format!("[ISSUE] {} ({}) {}", kind, severity, description),

        Event::AnalysisSummary { packets_in, packets_out, total_bytes, issues, elapsed_ms } =>
            format!(
                "[SUMMARY] packets={} kept={} bytes={} issues={} elapsed={}ms",
                packets_in, packets_out, total_bytes, issues, elapsed_ms
            ),
    }
}
