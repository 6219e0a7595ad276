//! JSON-lines telemetry sink.
//!
//! `record` runs on the turn path, so it only enqueues; a background task
//! owns the file and does the writing.

use std::path::Path;

use tokio::fs::OpenOptions;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::{mpsc, oneshot};

use tutorlane_core::telemetry::TelemetrySink;
use tutorlane_types::telemetry::TelemetryEntry;

/// Entries waiting for the writer before new ones are dropped.
const QUEUE_CAPACITY: usize = 1024;

enum Command {
    Line(String),
    Flush(oneshot::Sender<()>),
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Line(_) => f.write_str("Line"),
            Command::Flush(_) => f.write_str("Flush"),
        }
    }
}

/// Appends one JSON object per recorded turn to a file.
#[derive(Debug)]
pub struct JsonlTelemetrySink {
    tx: mpsc::Sender<Command>,
}

impl JsonlTelemetrySink {
    /// Open `path` for appending, creating parent directories as needed, and
    /// start the writer task. Must be called inside a tokio runtime.
    pub async fn open(path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path).await?;
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        tokio::spawn(write_loop(BufWriter::new(file), rx));
        Ok(Self { tx })
    }

    /// Wait until every entry recorded so far is on disk.
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(Command::Flush(done_tx)).await.is_ok() {
            let _ = done_rx.await;
        }
    }
}

async fn write_loop(mut writer: BufWriter<tokio::fs::File>, mut rx: mpsc::Receiver<Command>) {
    while let Some(command) = rx.recv().await {
        match command {
            Command::Line(line) => {
                let written = async {
                    writer.write_all(line.as_bytes()).await?;
                    writer.write_all(b"\n").await?;
                    writer.flush().await
                };
                if let Err(err) = written.await {
                    tracing::warn!("failed to write telemetry entry: {err}");
                }
            }
            Command::Flush(done) => {
                if let Err(err) = writer.flush().await {
                    tracing::warn!("failed to flush telemetry sink: {err}");
                }
                let _ = done.send(());
            }
        }
    }
}

impl TelemetrySink for JsonlTelemetrySink {
    fn record(&self, entry: &TelemetryEntry) {
        let line = match serde_json::to_string(entry) {
            Ok(line) => line,
            Err(err) => {
                tracing::warn!("failed to encode telemetry entry: {err}");
                return;
            }
        };
        match self.tx.try_send(Command::Line(line)) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!("telemetry sink backlog full, dropping entry");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::warn!("telemetry writer stopped, dropping entry");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;
    use tutorlane_types::lesson::Subject;

    fn entry(session: &str) -> TelemetryEntry {
        TelemetryEntry {
            timestamp: Utc::now(),
            session_id: session.to_string(),
            lesson_id: None,
            subject: Subject::General,
            input: "seven".to_string(),
            output: "Nice work, that's right! What is 2 plus 2?".to_string(),
            used_fallback: false,
            used_cache: false,
            retry_count: 0,
            latency_ms: 120,
            tokens_used: 48,
            speech_duration_ms: Some(600),
            speech_confidence: Some(0.9),
            gate_reason: None,
            error: None,
        }
    }

    #[tokio::test]
    async fn writes_one_line_per_entry() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("logs/telemetry.jsonl");
        let sink = JsonlTelemetrySink::open(&path).await.unwrap();

        sink.record(&entry("a"));
        sink.record(&entry("b"));
        sink.flush().await;

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let parsed: TelemetryEntry = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(parsed.session_id, "b");
        assert_eq!(parsed.tokens_used, 48);
    }

    #[tokio::test]
    async fn reopening_appends() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("telemetry.jsonl");
        for session in ["a", "b"] {
            let sink = JsonlTelemetrySink::open(&path).await.unwrap();
            sink.record(&entry(session));
            sink.flush().await;
        }

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(content.lines().count(), 2);
    }

    #[tokio::test]
    async fn burst_is_written_in_order() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("telemetry.jsonl");
        let sink = JsonlTelemetrySink::open(&path).await.unwrap();

        for i in 0..10 {
            sink.record(&entry(&format!("s{i}")));
        }
        sink.flush().await;

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        let sessions: Vec<String> = content
            .lines()
            .map(|line| serde_json::from_str::<TelemetryEntry>(line).unwrap().session_id)
            .collect();
        let expected: Vec<String> = (0..10).map(|i| format!("s{i}")).collect();
        assert_eq!(sessions, expected);
    }

    #[tokio::test]
    async fn record_after_writer_stops_is_dropped() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sink = JsonlTelemetrySink { tx };
        sink.record(&entry("a"));
        sink.flush().await;
    }
}
