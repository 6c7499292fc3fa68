use async_trait::async_trait;
use eyre::{Result, WrapErr};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

use crate::events::{ChainEvent, DisconnectedRange, EventKind};
use crate::handlers::EventHandler;

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snapshot {
    last_block: u64,
}

/// What has been ingested so far. The last block survives restarts through
/// [`IngestState::load`] and [`IngestState::save`]; counts are per process.
#[derive(Debug, Default)]
pub struct IngestState {
    /// Highest block of any handled event, 0 before the first one.
    pub last_block: AtomicU64,
    pub kind_counts: Mutex<HashMap<EventKind, u64>>,
}

impl IngestState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restores the last block from `path`. A missing file is a fresh start.
    pub fn load(path: &Path) -> Result<Self> {
        let state = Self::new();
        match std::fs::read_to_string(path) {
            Ok(contents) => {
                let snapshot: Snapshot = serde_json::from_str(&contents)
                    .wrap_err_with(|| format!("Malformed state file {}", path.display()))?;
                state.last_block.store(snapshot.last_block, Ordering::Relaxed);
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No state file at {}, starting fresh", path.display());
            }
            Err(e) => {
                return Err(e).wrap_err_with(|| format!("Failed to read {}", path.display()));
            }
        }
        Ok(state)
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        let snapshot = Snapshot {
            last_block: self.last_block.load(Ordering::Relaxed),
        };
        tokio::fs::write(path, serde_json::to_vec(&snapshot)?)
            .await
            .wrap_err_with(|| format!("Failed to write {}", path.display()))
    }

    /// Returns whether the event moved the last block forward.
    pub fn record(&self, event: &ChainEvent) -> bool {
        let previous = self.last_block.fetch_max(event.block_number, Ordering::Relaxed);
        if let Ok(mut counts) = self.kind_counts.lock() {
            *counts.entry(event.data.kind()).or_insert(0) += 1;
        }
        event.block_number > previous
    }

    pub fn last_block(&self) -> Option<u64> {
        match self.last_block.load(Ordering::Relaxed) {
            0 => None,
            block => Some(block),
        }
    }

    pub fn count(&self, kind: EventKind) -> u64 {
        self.kind_counts
            .lock()
            .map(|counts| counts.get(&kind).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Handled events per kind, in `EventKind::ALL` order, skipping zeroes.
    pub fn counts(&self) -> Vec<(EventKind, u64)> {
        EventKind::ALL
            .into_iter()
            .map(|kind| (kind, self.count(kind)))
            .filter(|(_, count)| *count > 0)
            .collect()
    }

    /// Range to catch up on: from the configured start, or just past the
    /// last block seen if that is later.
    pub fn reconnect_range(&self, configured: DisconnectedRange) -> DisconnectedRange {
        let resume = self.last_block().map(|block| block + 1);
        let start_block = match (configured.start_block, resume) {
            (Some(start), Some(resume)) => Some(start.max(resume)),
            (start, resume) => start.or(resume),
        };
        DisconnectedRange {
            start_block,
            ..configured
        }
    }
}

/// Feeds every event into an [`IngestState`], writing it to disk whenever
/// the last block advances, and passes the previous result through.
pub struct StateHandler {
    state: Arc<IngestState>,
    path: Option<PathBuf>,
}

impl StateHandler {
    pub fn new(state: Arc<IngestState>) -> Self {
        Self { state, path: None }
    }

    pub fn persist_to(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }
}

#[async_trait]
impl EventHandler for StateHandler {
    async fn handle(&self, event: &ChainEvent, previous: Option<Value>) -> Result<Option<Value>> {
        if self.state.record(event) {
            if let Some(path) = &self.path {
                if let Err(e) = self.state.save(path).await {
                    warn!("Could not persist ingest state: {:#}", e);
                }
            }
        }
        Ok(previous)
    }
}
