//! Server side aggregates. One document holds every user record; each request is a single
//! read-modify-write against it.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::daemon::storage::{
    aggregate::{merge_into, weekly_report},
    document_store::DocumentStore,
    entities::{Category, DaySummary, TimeData},
};

use super::{error::ApiError, types::RealtimeUpdate};

/// Key under which the user records are persisted.
pub const DATABASE_KEY: &str = "db";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub user_id: String,
    #[serde(default)]
    pub time_data: TimeData,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsersDocument {
    #[serde(default)]
    pub users: Vec<UserRecord>,
}

impl UsersDocument {
    fn user(&self, user_id: &str) -> Option<&UserRecord> {
        self.users.iter().find(|user| user.user_id == user_id)
    }

    fn user_mut(&mut self, user_id: &str) -> Option<&mut UserRecord> {
        self.users.iter_mut().find(|user| user.user_id == user_id)
    }
}

/// Aggregates keyed by user. Which user a request belongs to is decided by the caller.
pub struct RemoteAggregateStore<S: DocumentStore> {
    store: S,
    document: Mutex<UsersDocument>,
}

impl<S: DocumentStore> RemoteAggregateStore<S> {
    /// Loads the document and makes sure a record for `default_user` exists. An unreadable
    /// document is an error and is left untouched.
    pub async fn open(store: S, default_user: &str) -> Result<Self> {
        let mut document = store
            .load::<UsersDocument>(DATABASE_KEY)
            .await
            .context("Refusing to replace the unreadable server database")?
            .unwrap_or_default();

        if document.user(default_user).is_none() {
            info!("Creating record for user {default_user:?}");
            document.users.push(UserRecord {
                user_id: default_user.to_owned(),
                time_data: TimeData::new(),
            });
            store.save(DATABASE_KEY, &document).await?;
        }

        Ok(Self {
            store,
            document: Mutex::new(document),
        })
    }

    /// Merges `update` into the aggregate of `date` for `user_id`, then persists the document.
    /// Returns the category the time was charged to.
    pub async fn apply(
        &self,
        user_id: &str,
        update: &RealtimeUpdate,
        date: NaiveDate,
    ) -> Result<Category, ApiError> {
        let mut document = self.document.lock().await;
        let user = document
            .user_mut(user_id)
            .ok_or_else(|| ApiError::UnknownUser(user_id.to_owned()))?;

        let charged = merge_into(
            &mut user.time_data,
            date,
            &update.domain,
            update.seconds,
            update.category(),
        );
        debug!(
            user_id,
            domain = %update.domain,
            seconds = update.seconds,
            %charged,
            "Applied increment for {date}"
        );

        self.store
            .save(DATABASE_KEY, &*document)
            .await
            .map_err(ApiError::Persistence)?;
        Ok(charged)
    }

    /// Every recorded day of `user_id`. Unknown users have no data.
    pub async fn time_data(&self, user_id: &str) -> Result<TimeData, ApiError> {
        let document = self.document.lock().await;
        Ok(document
            .user(user_id)
            .map(|user| user.time_data.clone())
            .unwrap_or_default())
    }

    pub async fn weekly_report(&self, user_id: &str) -> Result<Vec<DaySummary>, ApiError> {
        let document = self.document.lock().await;
        Ok(document
            .user(user_id)
            .map(|user| weekly_report(&user.time_data))
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use std::future::Future;

    use anyhow::{anyhow, Result};
    use chrono::NaiveDate;
    use serde::{de::DeserializeOwned, Serialize};
    use tempfile::tempdir;

    use crate::{
        daemon::storage::document_store::{DocumentStore, JsonFileStore, MemoryStore},
        server::{error::ApiError, types::RealtimeUpdate},
    };

    use super::{RemoteAggregateStore, UsersDocument, DATABASE_KEY};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 8, 2).unwrap()
    }

    fn update(domain: &str, seconds: u64, productive: Option<bool>) -> RealtimeUpdate {
        RealtimeUpdate {
            domain: domain.into(),
            seconds,
            productive,
        }
    }

    #[tokio::test]
    async fn test_open_creates_default_user() -> Result<()> {
        let store = MemoryStore::new();
        RemoteAggregateStore::open(store.clone(), "default").await?;

        let document = store.load::<UsersDocument>(DATABASE_KEY).await?.unwrap();
        assert_eq!(document.users.len(), 1);
        assert_eq!(document.users[0].user_id, "default");
        Ok(())
    }

    #[tokio::test]
    async fn test_apply_twice_accumulates() -> Result<()> {
        let remote = RemoteAggregateStore::open(MemoryStore::new(), "default").await?;
        let github = update("github.com", 120, Some(true));
        remote.apply("default", &github, date()).await?;
        remote.apply("default", &github, date()).await?;

        let time_data = remote.time_data("default").await?;
        assert_eq!(time_data["2024-08-02"].productive, 240);
        assert_eq!(time_data["2024-08-02"].domains["github.com"].time, 240);
        Ok(())
    }

    #[tokio::test]
    async fn test_users_are_partitioned() -> Result<()> {
        let store = MemoryStore::new();
        RemoteAggregateStore::open(store.clone(), "alice").await?;
        let remote = RemoteAggregateStore::open(store, "bob").await?;

        remote
            .apply("alice", &update("github.com", 10, Some(true)), date())
            .await?;

        assert_eq!(remote.time_data("alice").await?.len(), 1);
        assert!(remote.time_data("bob").await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_user() -> Result<()> {
        let remote = RemoteAggregateStore::open(MemoryStore::new(), "default").await?;

        let result = remote
            .apply("nobody", &update("github.com", 10, Some(true)), date())
            .await;
        assert!(matches!(result, Err(ApiError::UnknownUser(_))));
        assert!(remote.time_data("nobody").await?.is_empty());
        assert!(remote.weekly_report("nobody").await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_document_survives_restart() -> Result<()> {
        let dir = tempdir()?;
        {
            let remote =
                RemoteAggregateStore::open(JsonFileStore::new(dir.path().to_owned())?, "default")
                    .await?;
            remote
                .apply("default", &update("youtube.com", 30, Some(false)), date())
                .await?;
        }

        let remote =
            RemoteAggregateStore::open(JsonFileStore::new(dir.path().to_owned())?, "default")
                .await?;
        let time_data = remote.time_data("default").await?;
        assert_eq!(time_data["2024-08-02"].unproductive, 30);
        Ok(())
    }

    #[tokio::test]
    async fn test_open_refuses_truncated_database() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("db.json");
        for content in ["", r#"{"users": [{"userId": "default", "timeData": {"#] {
            std::fs::write(&path, content)?;

            let result =
                RemoteAggregateStore::open(JsonFileStore::new(dir.path().to_owned())?, "default")
                    .await;
            assert!(result.is_err());
            assert_eq!(std::fs::read_to_string(&path)?, content);
        }
        Ok(())
    }

    /// Store that accepts the first write and fails every later one.
    struct FailingStore {
        inner: MemoryStore,
        writes: std::sync::atomic::AtomicUsize,
    }

    impl DocumentStore for FailingStore {
        fn load<T: DeserializeOwned + Send>(
            &self,
            key: &str,
        ) -> impl Future<Output = Result<Option<T>>> + Send {
            self.inner.load(key)
        }

        async fn save<T: Serialize + Sync>(&self, key: &str, document: &T) -> Result<()> {
            if self
                .writes
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst)
                > 0
            {
                return Err(anyhow!("disk full"));
            }
            self.inner.save(key, document).await
        }

        fn set_aside(&self, key: &str) -> impl Future<Output = Result<()>> + Send {
            self.inner.set_aside(key)
        }
    }

    #[tokio::test]
    async fn test_persistence_failure_keeps_merge_in_memory() -> Result<()> {
        let store = FailingStore {
            inner: MemoryStore::new(),
            writes: Default::default(),
        };
        let remote = RemoteAggregateStore::open(store, "default").await?;

        let result = remote
            .apply("default", &update("github.com", 10, Some(true)), date())
            .await;
        assert!(matches!(result, Err(ApiError::Persistence(_))));
        assert_eq!(remote.time_data("default").await?["2024-08-02"].productive, 10);
        Ok(())
    }
}
