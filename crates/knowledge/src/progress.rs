//! Progress reporting for indexing runs.
//!
//! The indexer emits one event per unit of work in each phase; front ends
//! decide how to render them.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// Indexing phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressPhase {
    Discover,
    Parse,
    Chunk,
    Embed,
    Index,
}

impl fmt::Display for ProgressPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProgressPhase::Discover => "discover",
            ProgressPhase::Parse => "parse",
            ProgressPhase::Chunk => "chunk",
            ProgressPhase::Embed => "embed",
            ProgressPhase::Index => "index",
        };
        f.write_str(name)
    }
}

/// Progress event emitted during indexing.
#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub phase: ProgressPhase,

    /// Units done so far (files, chunks)
    pub current: u64,

    /// Total expected work, if known
    pub total: Option<u64>,

    /// Human-readable detail
    pub message: String,

    /// Seconds since the reporter was created
    pub elapsed_secs: f64,
}

impl ProgressEvent {
    pub fn percentage(&self) -> Option<f64> {
        self.total.map(|t| {
            if t > 0 {
                (self.current as f64 / t as f64) * 100.0
            } else {
                100.0
            }
        })
    }

    /// Format as a single line, e.g. `[embed] 64/128 (50%) - model=text-embedding-3-large`.
    pub fn format_simple(&self) -> String {
        let progress = match self.total {
            Some(total) => format!("{}/{}", self.current, total),
            None => self.current.to_string(),
        };

        let pct = self
            .percentage()
            .map(|p| format!(" ({:.0}%)", p))
            .unwrap_or_default();

        format!("[{}] {}{} - {}", self.phase, progress, pct, self.message)
    }
}

/// Callback for progress events.
pub type ProgressCallback = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// Emits events through an optional callback.
#[derive(Clone)]
pub struct ProgressReporter {
    callback: Option<ProgressCallback>,
    start_time: Instant,
}

impl ProgressReporter {
    pub fn new(callback: ProgressCallback) -> Self {
        Self {
            callback: Some(callback),
            start_time: Instant::now(),
        }
    }

    /// Reporter that only logs.
    pub fn noop() -> Self {
        Self {
            callback: None,
            start_time: Instant::now(),
        }
    }

    fn emit(&self, phase: ProgressPhase, current: u64, total: Option<u64>, message: String) {
        let event = ProgressEvent {
            phase,
            current,
            total,
            message,
            elapsed_secs: self.start_time.elapsed().as_secs_f64(),
        };

        tracing::debug!(
            phase = %event.phase,
            current = event.current,
            total = ?event.total,
            elapsed_secs = event.elapsed_secs,
            "{}",
            event.message
        );

        if let Some(callback) = &self.callback {
            callback(event);
        }
    }

    pub fn discover(&self, found: u64, dir: &str) {
        self.emit(
            ProgressPhase::Discover,
            found,
            None,
            format!("found PDFs in {}", dir),
        );
    }

    pub fn parse(&self, current: u64, total: u64, file: &str) {
        self.emit(
            ProgressPhase::Parse,
            current,
            Some(total),
            format!("reading {}", file),
        );
    }

    pub fn chunk(&self, current: u64, total: u64, chunks_created: usize) {
        self.emit(
            ProgressPhase::Chunk,
            current,
            Some(total),
            format!("{} chunks created", chunks_created),
        );
    }

    pub fn embed(&self, current: u64, total: u64, model: &str) {
        self.emit(
            ProgressPhase::Embed,
            current,
            Some(total),
            format!("model={}", model),
        );
    }

    pub fn index(&self, current: u64, total: u64, collection: &str) {
        self.emit(
            ProgressPhase::Index,
            current,
            Some(total),
            format!("writing to '{}'", collection),
        );
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::noop()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_format_simple() {
        let event = ProgressEvent {
            phase: ProgressPhase::Embed,
            current: 5,
            total: Some(10),
            message: "model=mock".to_string(),
            elapsed_secs: 0.0,
        };
        assert_eq!(event.format_simple(), "[embed] 5/10 (50%) - model=mock");

        let open_ended = ProgressEvent {
            total: None,
            phase: ProgressPhase::Discover,
            ..event
        };
        assert_eq!(open_ended.format_simple(), "[discover] 5 - model=mock");
    }

    #[test]
    fn test_reporter_invokes_callback() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();

        let reporter = ProgressReporter::new(Arc::new(move |event| {
            sink.lock().unwrap().push(event);
        }));

        reporter.parse(1, 3, "notice.pdf");
        reporter.index(3, 3, "documents");

        let captured = events.lock().unwrap();
        assert_eq!(captured.len(), 2);
        assert_eq!(captured[0].phase, ProgressPhase::Parse);
        assert_eq!(captured[0].message, "reading notice.pdf");
        assert_eq!(captured[1].percentage(), Some(100.0));
    }

    #[test]
    fn test_noop_reporter() {
        ProgressReporter::noop().discover(1, "docs");
    }
}
