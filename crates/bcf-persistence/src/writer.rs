//! JSON Lines file writer.
//!
//! One JSON object per line, appended to `{base_dir}/{prefix}_{YYYY-MM-DD}.jsonl`:
//! - Partial file corruption only affects individual lines
//! - Readable even if a write was interrupted
//! - Files rotate when the UTC date changes

use crate::error::{PersistenceError, PersistenceResult};
use chrono::Utc;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Pending records kept while the file cannot be written, as a multiple of
/// the flush size. The oldest records are dropped beyond it.
const PENDING_LIMIT_FACTOR: usize = 16;

/// Active writer state for daily file.
struct ActiveWriter {
    writer: BufWriter<File>,
    date: String,
    records_written: usize,
}

/// Buffered JSON Lines writer for one record type.
///
/// Uses append mode, so restarting the process never truncates a day's file.
pub struct JsonLinesWriter<T: Serialize> {
    /// Base directory for output files.
    base_dir: PathBuf,
    /// File name prefix (e.g. `evaluations`).
    prefix: String,
    /// Pending records.
    buffer: Vec<T>,
    /// Buffer size that triggers a flush.
    max_buffer_size: usize,
    /// Open until date rotation.
    active_writer: Option<ActiveWriter>,
    /// Records dropped at the pending limit.
    dropped: usize,
}

impl<T: Serialize> JsonLinesWriter<T> {
    /// Create a writer. The directory is created if missing.
    pub fn new(base_dir: impl AsRef<Path>, prefix: &str, max_buffer_size: usize) -> Self {
        let base_dir = base_dir.as_ref().to_path_buf();
        if let Err(e) = std::fs::create_dir_all(&base_dir) {
            warn!(?e, dir = %base_dir.display(), "Failed to create directory");
        }

        let max_buffer_size = max_buffer_size.max(1);
        Self {
            base_dir,
            prefix: prefix.to_string(),
            buffer: Vec::with_capacity(max_buffer_size),
            max_buffer_size,
            active_writer: None,
            dropped: 0,
        }
    }

    /// Queue a record, flushing when the buffer is full.
    ///
    /// A failed flush keeps the unwritten records for the next attempt, up
    /// to `PENDING_LIMIT_FACTOR` times the flush size.
    pub fn add_record(&mut self, record: T) -> PersistenceResult<()> {
        if self.buffer.len() >= self.max_buffer_size * PENDING_LIMIT_FACTOR {
            self.buffer.remove(0);
            self.dropped += 1;
            warn!(prefix = %self.prefix, dropped = self.dropped, "Pending limit reached, dropped oldest record");
        }
        self.buffer.push(record);

        if self.buffer.len() >= self.max_buffer_size {
            self.flush()?;
        }

        Ok(())
    }

    /// Number of records waiting to be flushed.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Records dropped because the pending limit was reached.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    fn file_path(&self, date: &str) -> PathBuf {
        self.base_dir.join(format!("{}_{}.jsonl", self.prefix, date))
    }

    fn close_active_writer(&mut self) {
        if let Some(mut active) = self.active_writer.take() {
            if let Err(e) = active.writer.flush() {
                warn!(?e, "Failed to flush writer on close");
            }
            info!(
                prefix = %self.prefix,
                date = %active.date,
                records = active.records_written,
                "Closed JSON Lines writer"
            );
        }
    }

    fn create_new_writer(&mut self, date: &str) -> PersistenceResult<()> {
        let path = self.file_path(date);
        info!(path = %path.display(), "Opening JSON Lines writer (append mode)");

        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        self.active_writer = Some(ActiveWriter {
            writer: BufWriter::new(file),
            date: date.to_string(),
            records_written: 0,
        });

        Ok(())
    }

    /// Write buffered records to today's file.
    ///
    /// Records handed to the file before an error are removed from the
    /// buffer. A record that fails to serialize is discarded with them.
    pub fn flush(&mut self) -> PersistenceResult<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        let today = Utc::now().format("%Y-%m-%d").to_string();

        let needs_rotation = self
            .active_writer
            .as_ref()
            .map(|w| w.date != today)
            .unwrap_or(false);
        if needs_rotation {
            self.close_active_writer();
        }

        if self.active_writer.is_none() {
            self.create_new_writer(&today)?;
        }

        let Some(active) = self.active_writer.as_mut() else {
            return Ok(());
        };

        let mut consumed = 0;
        let result = write_records(&mut active.writer, &self.buffer, &mut consumed);
        active.records_written += consumed;
        self.buffer.drain(..consumed);

        match &result {
            Ok(()) => debug!(
                prefix = %self.prefix,
                date = %today,
                records = consumed,
                "Flushed records to JSON Lines"
            ),
            Err(e) => warn!(
                prefix = %self.prefix,
                error = %e,
                consumed,
                pending = self.buffer.len(),
                "JSON Lines flush failed"
            ),
        }

        result
    }

    /// Flush pending records and close the file.
    pub fn close(&mut self) -> PersistenceResult<()> {
        self.flush()?;
        self.close_active_writer();
        Ok(())
    }
}

/// Write `records` in order. `consumed` counts the records taken off the
/// front: written ones, plus one that failed to serialize.
fn write_records<T: Serialize>(
    writer: &mut BufWriter<File>,
    records: &[T],
    consumed: &mut usize,
) -> PersistenceResult<()> {
    for record in records {
        let json = match serde_json::to_string(record) {
            Ok(json) => json,
            Err(e) => {
                *consumed += 1;
                return Err(PersistenceError::from(e));
            }
        };
        writeln!(writer, "{}", json)?;
        *consumed += 1;
    }
    writer.flush()?;
    Ok(())
}

impl<T: Serialize> Drop for JsonLinesWriter<T> {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            warn!(?e, "Failed to flush buffer on drop");
        }
        self.close_active_writer();
    }
}
