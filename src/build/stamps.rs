use crate::error::{GraphError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Object list stamps from the previous run, keyed by node name.
#[derive(Debug, Serialize, Deserialize, Default)]
pub struct StampDb {
    #[serde(rename = "stamps")]
    entries: BTreeMap<String, u64>,
}

/// How a freshly computed stamp compares with the recorded one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StampChange {
    New,
    Changed,
    Unchanged,
}

impl StampDb {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).map_err(|e| GraphError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(|e| GraphError::Io {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let io_err = |e: std::io::Error| GraphError::Io {
            path: path.to_path_buf(),
            source: e,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let content = serde_json::to_string_pretty(self).map_err(|e| io_err(e.into()))?;
        fs::write(path, content).map_err(io_err)
    }

    /// Store `stamp` for `name` and report what changed.
    pub fn record(&mut self, name: &str, stamp: u64) -> StampChange {
        match self.entries.insert(name.to_string(), stamp) {
            None => StampChange::New,
            Some(old) if old == stamp => StampChange::Unchanged,
            Some(_) => StampChange::Changed,
        }
    }
}
