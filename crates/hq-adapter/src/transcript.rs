//! JSONL game log at `{data}/game_log.jsonl`, one entry per line

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use hq_usecase::ports::{TranscriptEntry, TranscriptLog};
use hq_usecase::TranscriptError;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::warn;

pub const TRANSCRIPT_FILE: &str = "game_log.jsonl";

pub struct JsonlTranscriptLog {
    path: PathBuf,
    // appends from concurrent missions must not interleave
    write_lock: Mutex<()>,
}

impl JsonlTranscriptLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Log stored as [`TRANSCRIPT_FILE`] under `data_dir`
    pub fn in_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join(TRANSCRIPT_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl TranscriptLog for JsonlTranscriptLog {
    async fn append(&self, entry: &TranscriptEntry) -> Result<(), TranscriptError> {
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    async fn recent(&self, n: usize) -> Result<Vec<TranscriptEntry>, TranscriptError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let lines: Vec<&str> = raw.lines().filter(|l| !l.trim().is_empty()).collect();
        let start = lines.len().saturating_sub(n);
        let entries = lines[start..]
            .iter()
            .filter_map(|line| match serde_json::from_str(line) {
                Ok(entry) => Some(entry),
                Err(err) => {
                    warn!(path = %self.path.display(), error = %err, "Skipping bad transcript line");
                    None
                }
            })
            .collect();
        Ok(entries)
    }
}
