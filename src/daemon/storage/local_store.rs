use anyhow::Result;
use chrono::NaiveDate;
use tracing::{debug, error, info};

use super::{
    aggregate::merge_into,
    document_store::DocumentStore,
    entities::{Category, Increment, TimeData},
};

/// Key under which the local daily aggregates are persisted.
pub const TIME_DATA_KEY: &str = "timeData";

/// Durable per-day, per-domain counters of the observing client. Only closed sessions mutate
/// it, through [LocalAggregateStore::merge].
pub struct LocalAggregateStore<S: DocumentStore> {
    store: S,
    time_data: TimeData,
}

impl<S: DocumentStore> LocalAggregateStore<S> {
    /// Loads the recorded days. A document that cannot be read, such as one cut short by a
    /// crash, is set aside and tracking starts from an empty history.
    pub async fn open(store: S) -> Result<Self> {
        let time_data = match store.load::<TimeData>(TIME_DATA_KEY).await {
            Ok(time_data) => time_data.unwrap_or_default(),
            Err(e) => {
                error!("Local store is unreadable, starting a new one: {e:?}");
                store.set_aside(TIME_DATA_KEY).await?;
                TimeData::new()
            }
        };
        info!("Opened local store with {} recorded days", time_data.len());
        Ok(Self { store, time_data })
    }

    /// Merges `increment` into the aggregate of `date` and persists the result. The in-memory
    /// copy keeps the merge even when persisting fails.
    pub async fn merge(&mut self, increment: &Increment, date: NaiveDate) -> Result<Category> {
        let charged = merge_into(
            &mut self.time_data,
            date,
            &increment.domain,
            increment.seconds,
            increment.category,
        );
        debug!(
            domain = %increment.domain,
            seconds = increment.seconds,
            %charged,
            "Merged increment for {date}"
        );
        self.store.save(TIME_DATA_KEY, &self.time_data).await?;
        Ok(charged)
    }

    /// Copy of every recorded day. Changes to it never reach the store.
    pub fn snapshot(&self) -> TimeData {
        self.time_data.clone()
    }
}

/// Reads the persisted aggregates without opening the store for writing.
pub async fn read_snapshot(store: &impl DocumentStore) -> Result<TimeData> {
    Ok(store
        .load::<TimeData>(TIME_DATA_KEY)
        .await?
        .unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    use crate::daemon::storage::{
        document_store::{JsonFileStore, MemoryStore},
        entities::{Category, Increment},
    };

    use super::{read_snapshot, LocalAggregateStore};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn increment(domain: &str, seconds: u64, category: Category) -> Increment {
        Increment {
            domain: domain.into(),
            category,
            seconds,
        }
    }

    #[tokio::test]
    async fn test_merge_persists_to_store() -> Result<()> {
        let dir = tempdir()?;
        let mut local = LocalAggregateStore::open(JsonFileStore::new(dir.path().to_owned())?).await?;
        local
            .merge(&increment("github.com", 120, Category::Productive), date())
            .await?;

        let reopened = LocalAggregateStore::open(JsonFileStore::new(dir.path().to_owned())?).await?;
        let snapshot = reopened.snapshot();
        assert_eq!(snapshot["2024-06-01"].productive, 120);
        assert_eq!(snapshot["2024-06-01"].domains["github.com"].time, 120);
        Ok(())
    }

    #[tokio::test]
    async fn test_interrupted_write_does_not_lose_history() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("timeData.json");

        for truncated in ["", r#"{"2024-06-01": {"productive": 5"#] {
            std::fs::write(&path, truncated)?;

            let mut local =
                LocalAggregateStore::open(JsonFileStore::new(dir.path().to_owned())?).await?;
            assert!(local.snapshot().is_empty());
            local
                .merge(&increment("github.com", 7, Category::Productive), date())
                .await?;

            let backup = std::fs::read_dir(dir.path())?
                .map(|entry| Ok(entry?.path()))
                .collect::<Result<Vec<_>>>()?
                .into_iter()
                .find(|path| {
                    path.to_string_lossy().contains("timeData.corrupt-")
                        && std::fs::read_to_string(path).is_ok_and(|content| content == truncated)
                });
            assert!(backup.is_some(), "{truncated:?} was not kept");
        }

        let snapshot = read_snapshot(&JsonFileStore::new(dir.path().to_owned())?).await?;
        assert_eq!(snapshot["2024-06-01"].productive, 7);
        Ok(())
    }

    #[tokio::test]
    async fn test_reopen_keeps_earlier_days() -> Result<()> {
        let dir = tempdir()?;
        let mut local = LocalAggregateStore::open(JsonFileStore::new(dir.path().to_owned())?).await?;
        local
            .merge(&increment("github.com", 3, Category::Productive), date())
            .await?;

        let mut reopened =
            LocalAggregateStore::open(JsonFileStore::new(dir.path().to_owned())?).await?;
        reopened
            .merge(
                &increment("github.com", 4, Category::Productive),
                NaiveDate::from_ymd_opt(2024, 6, 2).unwrap(),
            )
            .await?;

        let days = reopened.snapshot().into_keys().collect::<Vec<_>>();
        assert_eq!(days, ["2024-06-01", "2024-06-02"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_later_increment_keeps_stored_classification() -> Result<()> {
        let mut local = LocalAggregateStore::open(MemoryStore::new()).await?;
        local
            .merge(&increment("example.org", 10, Category::Neutral), date())
            .await?;
        let charged = local
            .merge(&increment("example.org", 5, Category::Productive), date())
            .await?;

        let day = &local.snapshot()["2024-06-01"];
        assert_eq!(charged, Category::Neutral);
        assert_eq!(day.neutral, 15);
        assert_eq!(day.productive, 0);
        assert_eq!(day.domains["example.org"].classification, Category::Neutral);
        Ok(())
    }

    #[tokio::test]
    async fn test_snapshot_is_a_copy() -> Result<()> {
        let store = MemoryStore::new();
        let mut local = LocalAggregateStore::open(store.clone()).await?;
        local
            .merge(&increment("github.com", 1, Category::Productive), date())
            .await?;

        let mut snapshot = local.snapshot();
        snapshot.clear();

        assert_eq!(local.snapshot().len(), 1);
        assert_eq!(read_snapshot(&store).await?.len(), 1);
        Ok(())
    }
}
