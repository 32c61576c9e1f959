use std::{
    collections::HashMap,
    future::Future,
    io::ErrorKind,
    ops::Deref,
    path::PathBuf,
    sync::{Arc, Mutex},
};

use anyhow::{anyhow, Result};
use chrono::Utc;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::fs::operations::{read_file, write_atomic};

/// Interface for abstracting persistence of whole JSON documents by key.
pub trait DocumentStore: Send + Sync {
    /// Loads the document stored under `key`. `None` means nothing was saved yet.
    fn load<T: DeserializeOwned + Send>(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<T>>> + Send;

    /// Replaces the document stored under `key`.
    fn save<T: Serialize + Sync>(
        &self,
        key: &str,
        document: &T,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Moves an unreadable document out of the way so a fresh one can be saved under `key`
    /// without destroying it.
    fn set_aside(&self, key: &str) -> impl Future<Output = Result<()>> + Send;
}

impl<T: Deref + Send + Sync> DocumentStore for T
where
    T::Target: DocumentStore,
{
    fn load<D: DeserializeOwned + Send>(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<D>>> + Send {
        self.deref().load(key)
    }

    fn save<D: Serialize + Sync>(
        &self,
        key: &str,
        document: &D,
    ) -> impl Future<Output = Result<()>> + Send {
        self.deref().save(key, document)
    }

    fn set_aside(&self, key: &str) -> impl Future<Output = Result<()>> + Send {
        self.deref().set_aside(key)
    }
}

/// Stores every key as a pretty printed `<key>.json` file inside a directory.
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&dir)?;

        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty() || key.contains(['/', '\\', '.']) {
            return Err(anyhow!("Illegal document key {key:?}"));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl DocumentStore for JsonFileStore {
    async fn load<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>> {
        let path = self.path_for(key)?;
        let Some(content) = read_file(&path).await? else {
            debug!("No document at {path:?}");
            return Ok(None);
        };
        let document = serde_json::from_slice(&content)
            .map_err(|e| anyhow!("Document {path:?} is not valid: {e}"))?;
        Ok(Some(document))
    }

    async fn save<T: Serialize + Sync>(&self, key: &str, document: &T) -> Result<()> {
        let path = self.path_for(key)?;
        let content = serde_json::to_vec_pretty(document)?;
        write_atomic(&path, &content).await
    }

    async fn set_aside(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        let backup = self.dir.join(format!(
            "{key}.corrupt-{}.json",
            Utc::now().format("%Y%m%dT%H%M%S%.3f")
        ));
        match tokio::fs::rename(&path, &backup).await {
            Ok(()) => {
                warn!("Moved unreadable {path:?} to {backup:?}");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Keeps documents in process memory. Documents go through [serde_json::Value] so a load
/// never aliases the saved value.
#[derive(Default, Clone)]
pub struct MemoryStore {
    documents: Arc<Mutex<HashMap<String, Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocumentStore for MemoryStore {
    async fn load<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>> {
        let value = self
            .documents
            .lock()
            .map_err(|_| anyhow!("Memory store lock poisoned"))?
            .get(key)
            .cloned();
        value
            .map(serde_json::from_value)
            .transpose()
            .map_err(Into::into)
    }

    async fn save<T: Serialize + Sync>(&self, key: &str, document: &T) -> Result<()> {
        let value = serde_json::to_value(document)?;
        self.documents
            .lock()
            .map_err(|_| anyhow!("Memory store lock poisoned"))?
            .insert(key.to_owned(), value);
        Ok(())
    }

    async fn set_aside(&self, key: &str) -> Result<()> {
        self.documents
            .lock()
            .map_err(|_| anyhow!("Memory store lock poisoned"))?
            .remove(key);
        Ok(())
    }
}

/// Runtime choice between the stores, for places that cannot be generic over one.
#[derive(Clone)]
pub enum DocumentBackend {
    File(Arc<JsonFileStore>),
    Memory(MemoryStore),
}

impl DocumentStore for DocumentBackend {
    async fn load<T: DeserializeOwned + Send>(&self, key: &str) -> Result<Option<T>> {
        match self {
            DocumentBackend::File(store) => store.load(key).await,
            DocumentBackend::Memory(store) => store.load(key).await,
        }
    }

    async fn save<T: Serialize + Sync>(&self, key: &str, document: &T) -> Result<()> {
        match self {
            DocumentBackend::File(store) => store.save(key, document).await,
            DocumentBackend::Memory(store) => store.save(key, document).await,
        }
    }

    async fn set_aside(&self, key: &str) -> Result<()> {
        match self {
            DocumentBackend::File(store) => store.set_aside(key).await,
            DocumentBackend::Memory(store) => store.set_aside(key).await,
        }
    }
}
