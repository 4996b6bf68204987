//! File-backed allow-list ("贴猴列表") of sender ids.
//!
//! The in-memory set is authoritative for the running process. Every mutation
//! rewrites the whole file and mirrors the members into the live config; a
//! failed write is logged and otherwise ignored.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::config::{ConfigHandle, ReactionConfig};

pub const ALLOW_LIST_FILE: &str = "special_id_list.json";

/// An id as found in older files or configs: either a string or a bare number.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum RawId {
    Text(String),
    Int(i64),
}

impl RawId {
    pub(crate) fn normalize(self) -> Option<String> {
        let id = match self {
            RawId::Text(s) => s.trim().to_string(),
            RawId::Int(n) => n.to_string(),
        };
        (!id.is_empty()).then_some(id)
    }
}

#[derive(Debug, Default, Deserialize)]
struct ListFile {
    #[serde(default)]
    special_id_list: Vec<RawId>,
}

#[derive(Serialize)]
struct ListFileRef<'a> {
    special_id_list: &'a [String],
}

pub struct AllowListStore {
    path: PathBuf,
    ids: Mutex<BTreeSet<String>>,
    config: ConfigHandle,
}

impl AllowListStore {
    /// Load the list from `path`. When the file does not exist yet, the ids
    /// found in the config's `special_id_list` are adopted and written out.
    /// Unreadable or malformed files yield an empty list.
    pub fn load(path: impl Into<PathBuf>, config: ConfigHandle) -> Self {
        let path = path.into();
        let store = Self {
            path,
            ids: Mutex::new(BTreeSet::new()),
            config,
        };

        if store.path.exists() {
            match read_list(&store.path) {
                Ok(ids) => {
                    tracing::info!(
                        "Loaded {} allow-listed ids from {}",
                        ids.len(),
                        store.path.display()
                    );
                    let mut guard = store.lock();
                    *guard = ids;
                    store.mirror(&guard);
                }
                Err(e) => {
                    tracing::error!("Failed to load allow-list: {:#}", e);
                    store.mirror(&store.lock());
                }
            }
        } else {
            let legacy: BTreeSet<String> = store
                .config
                .load()
                .special_id_list
                .iter()
                .filter_map(|id| normalize(id))
                .collect();
            tracing::info!(
                "No allow-list file at {}, adopting {} ids from config",
                store.path.display(),
                legacy.len()
            );
            let mut guard = store.lock();
            *guard = legacy;
            store.save_locked(&guard);
        }

        store
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, id: &str) -> bool {
        normalize(id).is_some_and(|id| self.lock().contains(&id))
    }

    /// Insert `id`; returns false if it was already present (or blank).
    pub fn add(&self, id: &str) -> bool {
        let Some(id) = normalize(id) else {
            return false;
        };
        let mut ids = self.lock();
        let inserted = ids.insert(id);
        self.save_locked(&ids);
        inserted
    }

    /// Remove the entry whose trimmed form equals the trimmed `id`.
    pub fn remove(&self, id: &str) -> bool {
        let Some(id) = normalize(id) else {
            return false;
        };
        let mut ids = self.lock();
        let removed = ids.remove(&id);
        if removed {
            self.save_locked(&ids);
        }
        removed
    }

    pub fn clear(&self) {
        let mut ids = self.lock();
        ids.clear();
        self.save_locked(&ids);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Sorted copy of the current members.
    pub fn snapshot(&self) -> Vec<String> {
        self.lock().iter().cloned().collect()
    }

    /// Persist the current members and refresh the config mirror.
    pub fn save(&self) {
        let ids = self.lock();
        self.save_locked(&ids);
    }

    fn save_locked(&self, ids: &BTreeSet<String>) {
        let list: Vec<String> = ids.iter().cloned().collect();
        match write_list(&self.path, &list) {
            Ok(()) => tracing::info!(
                "Saved {} allow-listed ids to {}",
                list.len(),
                self.path.display()
            ),
            Err(e) => tracing::error!("Failed to save allow-list: {:#}", e),
        }
        self.mirror_list(list);
    }

    fn mirror(&self, ids: &BTreeSet<String>) {
        self.mirror_list(ids.iter().cloned().collect());
    }

    fn mirror_list(&self, list: Vec<String>) {
        self.config.rcu(|cfg| ReactionConfig {
            special_id_list: list.clone(),
            ..ReactionConfig::clone(cfg)
        });
    }

    fn lock(&self) -> MutexGuard<'_, BTreeSet<String>> {
        self.ids.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn normalize(id: &str) -> Option<String> {
    RawId::Text(id.to_string()).normalize()
}

fn read_list(path: &Path) -> Result<BTreeSet<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let file: ListFile = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(file
        .special_id_list
        .into_iter()
        .filter_map(RawId::normalize)
        .collect())
}

fn write_list(path: &Path, ids: &[String]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(&ListFileRef {
        special_id_list: ids,
    })?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}
