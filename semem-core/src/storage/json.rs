//! JSON file storage backend
//!
//! Keeps the full interaction map in memory and flushes the whole file on
//! every write through a temp-file rename, so a crash mid-write never
//! leaves a truncated store behind.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::memory::interaction::Interaction;

use super::StorageBackend;

/// File-backed storage for single-node deployments
pub struct JsonBackend {
    path: PathBuf,
    records: Mutex<Option<HashMap<Uuid, Interaction>>>,
}

impl JsonBackend {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            records: Mutex::new(None),
        }
    }

    async fn load_file(&self) -> Result<HashMap<Uuid, Interaction>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => {
                let interactions: Vec<Interaction> = serde_json::from_str(&raw)
                    .map_err(|e| Error::Storage(format!("corrupt JSON store: {e}")))?;
                Ok(interactions.into_iter().map(|i| (i.id, i)).collect())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(Error::Storage(format!(
                "cannot read {}: {e}",
                self.path.display()
            ))),
        }
    }

    async fn ensure_loaded<'a>(
        &self,
        guard: &'a mut Option<HashMap<Uuid, Interaction>>,
    ) -> Result<&'a mut HashMap<Uuid, Interaction>> {
        if guard.is_none() {
            *guard = Some(self.load_file().await?);
        }
        #[allow(clippy::expect_used)]
        Ok(guard.as_mut().expect("records loaded above"))
    }

    async fn flush(&self, records: &HashMap<Uuid, Interaction>) -> Result<()> {
        let mut interactions: Vec<&Interaction> = records.values().collect();
        interactions.sort_by_key(|i| i.created);
        let raw = serde_json::to_string_pretty(&interactions)?;

        let tmp = self.path.with_extension("json.tmp");
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| Error::Storage(format!("cannot create store dir: {e}")))?;
            }
        }
        tokio::fs::write(&tmp, raw)
            .await
            .map_err(|e| Error::Storage(format!("cannot write {}: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| Error::Storage(format!("cannot replace {}: {e}", self.path.display())))
    }
}

#[async_trait]
impl StorageBackend for JsonBackend {
    async fn save_interaction(&self, interaction: &Interaction) -> Result<()> {
        let mut guard = self.records.lock().await;
        let records = self.ensure_loaded(&mut *guard).await?;
        records.insert(interaction.id, interaction.clone());
        let snapshot = records.clone();
        drop(guard);
        self.flush(&snapshot).await
    }

    async fn load_interactions(&self) -> Result<Vec<Interaction>> {
        let mut guard = self.records.lock().await;
        let records = self.ensure_loaded(&mut *guard).await?;
        let mut interactions: Vec<Interaction> = records.values().cloned().collect();
        interactions.sort_by_key(|i| i.created);
        Ok(interactions)
    }

    async fn delete_interaction(&self, id: Uuid) -> Result<bool> {
        let mut guard = self.records.lock().await;
        let records = self.ensure_loaded(&mut *guard).await?;
        let existed = records.remove(&id).is_some();
        if existed {
            let snapshot = records.clone();
            drop(guard);
            self.flush(&snapshot).await?;
        }
        Ok(existed)
    }
}
