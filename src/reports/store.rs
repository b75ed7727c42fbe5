//! Namespaced CRUD over saved diagnostic reports.
//!
//! Each report lives under `<namespace><ISO-8601 timestamp>` and is stored as
//! the JSON object `{"timestamp": "...", "content": "..."}`. Keys outside the
//! namespace are invisible to every operation here.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use super::storage::{KeyValueStorage, StoreError};

/// Key prefix used when the config does not override it.
pub const DEFAULT_NAMESPACE: &str = "car_report_";

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// A persisted, immutable diagnostic narration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub key: String,
    pub timestamp: DateTime<Utc>,
    pub content: String,
}

/// On-disk value layout.
#[derive(Debug, Serialize, Deserialize)]
struct StoredReport {
    timestamp: String,
    content: String,
}

fn iso8601(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_entry(key: &str, value: &str) -> Result<Report, String> {
    let stored: StoredReport = serde_json::from_str(value).map_err(|e| e.to_string())?;
    let timestamp = DateTime::parse_from_rfc3339(&stored.timestamp)
        .map_err(|e| format!("bad timestamp '{}': {e}", stored.timestamp))?
        .with_timezone(&Utc);
    Ok(Report {
        key: key.to_string(),
        timestamp,
        content: stored.content,
    })
}

// ---------------------------------------------------------------------------
// ReportStore
// ---------------------------------------------------------------------------

/// Exclusive owner of the persisted report collection.
pub struct ReportStore {
    storage: Arc<dyn KeyValueStorage>,
    namespace: String,
    /// Last timestamp handed out; new ones are forced strictly later.
    last_stamp: Mutex<Option<DateTime<Utc>>>,
}

impl ReportStore {
    pub fn new(storage: Arc<dyn KeyValueStorage>, namespace: impl Into<String>) -> Self {
        Self {
            storage,
            namespace: namespace.into(),
            last_stamp: Mutex::new(None),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Persist `content` under a freshly generated key.
    ///
    /// Never overwrites: if the key for the current millisecond is already
    /// taken (another store on the same storage, or a clock that went
    /// backwards), the timestamp moves forward until a free key is found.
    pub async fn create(&self, content: &str) -> Result<Report, StoreError> {
        let (timestamp, iso, key) = loop {
            let timestamp = self.next_timestamp();
            let iso = iso8601(&timestamp);
            let key = format!("{}{}", self.namespace, iso);
            if self.storage.get(&key).await?.is_none() {
                break (timestamp, iso, key);
            }
            log::debug!("reports: {key} already taken, moving to next millisecond");
        };

        let value = serde_json::to_string(&StoredReport {
            timestamp: iso,
            content: content.to_string(),
        })?;
        self.storage.set(&key, value).await?;

        log::info!("reports: saved {key}");
        Ok(Report {
            key,
            timestamp,
            content: content.to_string(),
        })
    }

    /// Every report in the namespace, most recent first.
    ///
    /// Entries that fail to parse are skipped with a warning. Entries removed
    /// between the key scan and the read are silently absent.
    pub async fn list(&self) -> Result<Vec<Report>, StoreError> {
        let keys = self.namespaced_keys().await?;
        let entries = self.storage.get_many(&keys).await?;

        let mut reports: Vec<Report> = entries
            .into_iter()
            .filter_map(|(key, value)| {
                let value = value?;
                match parse_entry(&key, &value) {
                    Ok(report) => Some(report),
                    Err(e) => {
                        log::warn!("reports: skipping corrupt entry {key}: {e}");
                        None
                    }
                }
            })
            .collect();

        reports.sort_by(|a, b| {
            b.timestamp
                .cmp(&a.timestamp)
                .then_with(|| b.key.cmp(&a.key))
        });
        Ok(reports)
    }

    /// One report by key. Keys outside the namespace, missing keys and
    /// corrupt entries all yield `None`.
    pub async fn get(&self, key: &str) -> Result<Option<Report>, StoreError> {
        if !self.owns(key) {
            return Ok(None);
        }
        let Some(value) = self.storage.get(key).await? else {
            return Ok(None);
        };
        match parse_entry(key, &value) {
            Ok(report) => Ok(Some(report)),
            Err(e) => {
                log::warn!("reports: corrupt entry {key}: {e}");
                Ok(None)
            }
        }
    }

    /// Remove one report. Unknown keys are a no-op.
    pub async fn delete(&self, key: &str) -> Result<(), StoreError> {
        if !self.owns(key) {
            log::debug!("reports: ignoring delete of foreign key {key}");
            return Ok(());
        }
        self.storage.remove(key).await
    }

    /// Remove every report in the namespace; returns how many keys matched.
    pub async fn clear_all(&self) -> Result<usize, StoreError> {
        let keys = self.namespaced_keys().await?;
        let count = keys.len();
        self.storage.remove_many(&keys).await?;
        log::info!("reports: cleared {count} report(s)");
        Ok(count)
    }

    fn owns(&self, key: &str) -> bool {
        key.starts_with(&self.namespace)
    }

    async fn namespaced_keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self
            .storage
            .all_keys()
            .await?
            .into_iter()
            .filter(|k| self.owns(k))
            .collect())
    }

    fn next_timestamp(&self) -> DateTime<Utc> {
        let mut last = self
            .last_stamp
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut now = Utc::now().trunc_subsecs(3);
        if let Some(prev) = *last {
            if now <= prev {
                now = prev + chrono::Duration::milliseconds(1);
            }
        }
        *last = Some(now);
        now
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
