use crate::{LegacyLogAdapter, LegacyLogEntry, LegacyLogError};
use event_core::event::Event;
use event_core::observer::{EventObserver, ObserverError};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info};

/// Bus observer that projects each event into a legacy entry, keeps it
/// in memory and optionally appends it as a JSON line to a file.
pub struct LegacyLogWriter {
    adapter: LegacyLogAdapter,
    entries: Mutex<Vec<LegacyLogEntry>>,
    file: Option<(PathBuf, Mutex<File>)>,
}

impl LegacyLogWriter {
    pub fn new(adapter: LegacyLogAdapter) -> Self {
        Self {
            adapter,
            entries: Mutex::new(Vec::new()),
            file: None,
        }
    }

    pub fn with_file(mut self, path: impl AsRef<Path>) -> Result<Self, LegacyLogError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| LegacyLogError::Io(format!("{}: {}", path.display(), e)))?;

        info!("Appending legacy log entries to {}", path.display());
        self.file = Some((path, Mutex::new(file)));
        Ok(self)
    }

    pub fn entries(&self) -> Vec<LegacyLogEntry> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn record(&self, event: &Event) -> Result<LegacyLogEntry, LegacyLogError> {
        let entry = self.adapter.map(event)?;

        if let Some((path, file)) = &self.file {
            let line = serde_json::to_string(&entry)
                .map_err(|e| LegacyLogError::Serialize(e.to_string()))?;
            let mut file = file.lock().unwrap_or_else(|e| e.into_inner());
            writeln!(file, "{}", line)
                .map_err(|e| LegacyLogError::Io(format!("{}: {}", path.display(), e)))?;
        }

        debug!(
            "Legacy entry: course {} {} '{}' {}",
            entry.course_id, entry.module, entry.action, entry.url
        );
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(entry.clone());
        Ok(entry)
    }
}

impl EventObserver for LegacyLogWriter {
    fn name(&self) -> &str {
        "legacy_log"
    }

    fn observe(&self, event: &Event) -> Result<(), ObserverError> {
        self.record(event).map(|_| ()).map_err(|e| match e {
            LegacyLogError::Io(msg) => ObserverError::Io(msg),
            other => ObserverError::Mapping(other.to_string()),
        })
    }
}
