//! JSONL event journal: the durable audit/recovery log.
//!
//! One JSON object per line, appended under an exclusive file lock and
//! fsynced before the append is reported durable. The journal can replay
//! its full history to rebuild an in-memory store after a restart.

use crate::domain::ProductionEvent;
use anyhow::Context;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::path::PathBuf;

/// Append-only JSONL log of accepted production events.
#[derive(Debug, Clone)]
pub struct EventJournal {
    path: PathBuf,
}

impl EventJournal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Appends a batch of events as one durable write.
    ///
    /// The batch shares the fate of its transaction: all lines are written,
    /// flushed and fsynced under one exclusive lock before this returns.
    pub fn append_all(&self, events: &[ProductionEvent]) -> anyhow::Result<()> {
        if events.is_empty() {
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating journal directory {}", parent.display()))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("opening journal {}", self.path.display()))?;

        // Lock released when `file` drops.
        file.lock_exclusive().context("locking journal")?;
        for event in events {
            let line = serde_json::to_string(event).context("serializing event")?;
            writeln!(file, "{}", line).context("appending to journal")?;
        }
        file.flush().context("flushing journal")?;
        file.sync_all().context("syncing journal")?;
        Ok(())
    }

    /// Replays the journal from the beginning.
    ///
    /// Unparseable lines are skipped with a warning rather than aborting
    /// recovery; the count is reported so operators notice truncation.
    pub fn load(&self) -> anyhow::Result<Vec<ProductionEvent>> {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e).with_context(|| format!("opening journal {}", self.path.display()))
            }
        };

        file.lock_shared().context("locking journal")?;
        let reader = BufReader::new(&file);

        let mut events = Vec::new();
        let mut skipped = 0usize;
        for line in reader.lines() {
            let line = line.context("reading journal line")?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<ProductionEvent>(&line) {
                Ok(event) => events.push(event),
                Err(_) => skipped += 1,
            }
        }

        if skipped > 0 {
            tracing::warn!("Skipped {} unparseable lines in event journal", skipped);
        }

        Ok(events)
    }
}

#[cfg(test)]
#[path = "tests/journal_tests.rs"]
mod tests;
