use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;
use tracing::{instrument, trace};

use crate::events::ActivitySample;

/// Errors returned while persisting activity samples.
#[derive(Debug, Error)]
pub enum SampleSinkError {
    #[error("sample store is unavailable")]
    Unavailable,
    #[error("sample store rejected the record")]
    Rejected,
    #[error("failed to open sample file `{path}`")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write sample record")]
    Write(#[from] std::io::Error),
    #[error("failed to serialise sample record")]
    Serialise(#[from] serde_json::Error),
}

/// Destination for decoded activity samples.
pub trait SampleStore: Send + Sync {
    /// Acquires a writer. The writer is released when dropped.
    ///
    /// # Errors
    ///
    /// Returns an error when the store cannot be acquired.
    fn acquire(&self) -> Result<Box<dyn SampleWriter + '_>, SampleSinkError>;
}

/// A scoped handle onto a [`SampleStore`].
pub trait SampleWriter {
    /// Persists one sample.
    ///
    /// # Errors
    ///
    /// Returns an error when the sample cannot be stored.
    fn add_sample(&mut self, sample: &ActivitySample) -> Result<(), SampleSinkError>;
}

/// In-process store, shareable between the router and observers.
#[derive(Debug, Clone)]
pub struct MemorySampleStore {
    samples: Arc<Mutex<Vec<ActivitySample>>>,
    available: Arc<AtomicBool>,
    accepting_writes: Arc<AtomicBool>,
    outstanding: Arc<AtomicUsize>,
}

impl MemorySampleStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            samples: Arc::default(),
            available: Arc::new(AtomicBool::new(true)),
            accepting_writes: Arc::new(AtomicBool::new(true)),
            outstanding: Arc::default(),
        }
    }

    /// Toggles whether [`SampleStore::acquire`] succeeds.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Toggles whether acquired writers accept samples.
    pub fn set_accepting_writes(&self, accepting: bool) {
        self.accepting_writes.store(accepting, Ordering::SeqCst);
    }

    /// Returns a copy of every stored sample.
    #[must_use]
    pub fn samples(&self) -> Vec<ActivitySample> {
        self.samples
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of writers acquired and not yet released.
    #[must_use]
    pub fn outstanding_writers(&self) -> usize {
        self.outstanding.load(Ordering::SeqCst)
    }
}

impl Default for MemorySampleStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SampleStore for MemorySampleStore {
    fn acquire(&self) -> Result<Box<dyn SampleWriter + '_>, SampleSinkError> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(SampleSinkError::Unavailable);
        }
        self.outstanding.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemorySampleWriter { store: self }))
    }
}

struct MemorySampleWriter<'a> {
    store: &'a MemorySampleStore,
}

impl SampleWriter for MemorySampleWriter<'_> {
    fn add_sample(&mut self, sample: &ActivitySample) -> Result<(), SampleSinkError> {
        if !self.store.accepting_writes.load(Ordering::SeqCst) {
            return Err(SampleSinkError::Rejected);
        }
        self.store
            .samples
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(*sample);
        Ok(())
    }
}

impl Drop for MemorySampleWriter<'_> {
    fn drop(&mut self) {
        self.store.outstanding.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Appends samples to a file, one JSON object per line.
///
/// Each acquisition opens the file and each sample is flushed before
/// [`SampleWriter::add_sample`] returns. These are blocking calls made on the
/// task that routes notifications, so the file should live on local storage.
#[derive(Debug, Clone)]
pub struct JsonLinesSampleStore {
    path: PathBuf,
}

impl JsonLinesSampleStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SampleStore for JsonLinesSampleStore {
    #[instrument(skip(self), level = "trace", fields(path = %self.path.display()))]
    fn acquire(&self) -> Result<Box<dyn SampleWriter + '_>, SampleSinkError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| SampleSinkError::Open {
                path: self.path.clone(),
                source,
            })?;
        Ok(Box::new(JsonLinesWriter {
            writer: BufWriter::new(file),
        }))
    }
}

struct JsonLinesWriter {
    writer: BufWriter<File>,
}

impl SampleWriter for JsonLinesWriter {
    fn add_sample(&mut self, sample: &ActivitySample) -> Result<(), SampleSinkError> {
        serde_json::to_writer(&mut self.writer, sample)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        trace!("appended sample record");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn memory_store_releases_writer_on_drop() -> anyhow::Result<()> {
        let store = MemorySampleStore::new();
        {
            let mut writer = store.acquire()?;
            assert_eq!(1, store.outstanding_writers());
            writer.add_sample(&ActivitySample::new(10, 1, 2, 3))?;
        }
        assert_eq!(0, store.outstanding_writers());
        assert_eq!(vec![ActivitySample::new(10, 1, 2, 3)], store.samples());
        Ok(())
    }

    #[test]
    fn memory_store_reports_unavailable() {
        let store = MemorySampleStore::new();
        store.set_available(false);
        assert_matches!(store.acquire().err(), Some(SampleSinkError::Unavailable));
        assert_eq!(0, store.outstanding_writers());
    }

    #[test]
    fn memory_store_releases_writer_after_rejected_write() -> anyhow::Result<()> {
        let store = MemorySampleStore::new();
        store.set_accepting_writes(false);
        {
            let mut writer = store.acquire()?;
            assert_matches!(
                writer.add_sample(&ActivitySample::new(10, 1, 2, 3)),
                Err(SampleSinkError::Rejected)
            );
        }
        assert_eq!(0, store.outstanding_writers());
        assert!(store.samples().is_empty());
        Ok(())
    }

    #[test]
    fn json_lines_store_appends_one_record_per_sample() -> anyhow::Result<()> {
        let path = std::env::temp_dir().join(format!(
            "uwatch-samples-{}-{}.jsonl",
            std::process::id(),
            line!()
        ));
        let _ = std::fs::remove_file(&path);
        let store = JsonLinesSampleStore::new(&path);

        store.acquire()?.add_sample(&ActivitySample::new(1, 10, 20, 30))?;
        store.acquire()?.add_sample(&ActivitySample::new(2, 11, 21, 31))?;

        let contents = std::fs::read_to_string(&path)?;
        std::fs::remove_file(&path)?;
        assert_eq!(
            "{\"timestamp_seconds\":1,\"steps\":10,\"distance_meters\":20,\"calories_burnt\":30}\n\
             {\"timestamp_seconds\":2,\"steps\":11,\"distance_meters\":21,\"calories_burnt\":31}\n",
            contents
        );
        Ok(())
    }

    #[test]
    fn json_lines_store_reports_open_failure() {
        let store = JsonLinesSampleStore::new("/nonexistent-dir/uwatch/samples.jsonl");
        assert_matches!(store.acquire().err(), Some(SampleSinkError::Open { .. }));
    }
}
