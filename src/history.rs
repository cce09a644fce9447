//! Persisted execution log. One record per submitted transaction, keyed by id.

use alloy_primitives::{Address, B256};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Pending,
    Completed,
    Failed,
}

impl std::fmt::Display for TxStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TxStatus::Pending => "pending",
            TxStatus::Completed => "completed",
            TxStatus::Failed => "failed",
        };
        f.pad(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRecord {
    pub id: String,
    pub run_id: String,
    pub hash: B256,
    pub description: String,
    pub chain_id: u64,
    pub from: Address,
    pub to: Address,
    pub status: TxStatus,
    /// Unix millis of the last status change.
    pub timestamp: u64,
}

pub trait ExecutionLog: Send {
    fn records(&self) -> Vec<ExecutionRecord>;

    /// Insert or replace the record with the same id.
    fn upsert(&mut self, record: ExecutionRecord) -> Result<()>;
}

/// Log stored as a pretty-printed JSON array, rewritten on every upsert.
#[derive(Debug)]
pub struct JsonFileLog {
    path: PathBuf,
    records: Vec<ExecutionRecord>,
}

impl JsonFileLog {
    pub fn open(path: &Path) -> Result<Self> {
        let records = if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("failed to read history {}", path.display()))?;
            if contents.trim().is_empty() {
                Vec::new()
            } else {
                serde_json::from_str(&contents)
                    .with_context(|| format!("failed to parse history {}", path.display()))?
            }
        } else {
            Vec::new()
        };
        Ok(Self {
            path: path.to_path_buf(),
            records,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(&self.records)?;
        fs::write(&self.path, contents)
            .with_context(|| format!("failed to write history {}", self.path.display()))
    }
}

impl ExecutionLog for JsonFileLog {
    fn records(&self) -> Vec<ExecutionRecord> {
        self.records.clone()
    }

    fn upsert(&mut self, record: ExecutionRecord) -> Result<()> {
        upsert_record(&mut self.records, record);
        self.save()
    }
}

/// In-memory log, for callers that do not persist.
#[derive(Debug, Default)]
pub struct MemoryLog {
    records: Vec<ExecutionRecord>,
}

impl ExecutionLog for MemoryLog {
    fn records(&self) -> Vec<ExecutionRecord> {
        self.records.clone()
    }

    fn upsert(&mut self, record: ExecutionRecord) -> Result<()> {
        upsert_record(&mut self.records, record);
        Ok(())
    }
}

fn upsert_record(records: &mut Vec<ExecutionRecord>, record: ExecutionRecord) {
    match records.iter_mut().find(|existing| existing.id == record.id) {
        Some(existing) => *existing = record,
        None => records.push(record),
    }
}

pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record(id: &str, status: TxStatus) -> ExecutionRecord {
        ExecutionRecord {
            id: id.to_string(),
            run_id: "run".to_string(),
            hash: B256::with_last_byte(1),
            description: "Bridge 0.01 ETH to ZetaChain".to_string(),
            chain_id: 11155111,
            from: Address::ZERO,
            to: Address::ZERO,
            status,
            timestamp: 1,
        }
    }

    #[test]
    fn upsert_replaces_by_id() {
        let mut log = MemoryLog::default();
        log.upsert(record("a", TxStatus::Pending)).unwrap();
        log.upsert(record("b", TxStatus::Pending)).unwrap();
        log.upsert(record("a", TxStatus::Completed)).unwrap();
        let records = log.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].status, TxStatus::Completed);
    }

    #[test]
    fn file_log_persists_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("history.json");
        let mut log = JsonFileLog::open(&path).unwrap();
        assert!(log.records().is_empty());
        log.upsert(record("a", TxStatus::Pending)).unwrap();
        log.upsert(record("a", TxStatus::Failed)).unwrap();

        let reopened = JsonFileLog::open(&path).unwrap();
        assert_eq!(reopened.records(), vec![record("a", TxStatus::Failed)]);

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw[0]["status"], "failed");
        assert_eq!(raw[0]["chainId"], 11155111);
    }

    #[test]
    fn corrupt_history_is_reported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{not json").unwrap();
        assert!(JsonFileLog::open(&path).is_err());
    }
}
