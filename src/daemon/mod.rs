//! The tracker process. Focus events from the browser flow through three stages:
//! [collection] turns them into increments, [processing] merges each increment into the local
//! store and mirrors it to the aggregation service, and [storage] keeps the daily aggregates.

use std::{path::PathBuf, time::Duration};

use anyhow::Result;
use collection::{collector::DataCollectionModule, source::FocusStream, tracker::DwellTracker};
use processing::{
    local_save::LocalSaver, module::IncrementProcessor, sync_forward::SyncForwarder,
    ProcessingModule,
};
use storage::{
    document_store::{DocumentStore, JsonFileStore},
    entities::Increment,
    local_store::LocalAggregateStore,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::{
    classifier::Classifier,
    sync::SyncClient,
    utils::clock::{Clock, DefaultClock},
};

pub mod args;
pub mod collection;
pub mod processing;
pub mod shutdown;
pub mod storage;

/// Directory inside the application directory that holds the local store.
pub const LOCAL_STORE_DIR: &str = "local";

const INCREMENT_CHANNEL_SIZE: usize = 32;

pub struct TrackerOptions {
    pub store_dir: PathBuf,
    pub classifier: Classifier,
    pub flush_interval: Duration,
    /// `None` keeps increments local.
    pub sync: Option<SyncClient>,
}

/// Represents the starting point for the tracker. Runs until the browser closes `events` or
/// the process is interrupted.
pub async fn start_tracker(options: TrackerOptions, events: FocusStream) -> Result<()> {
    let shutdown_token = CancellationToken::new();
    let (sender, receiver) = mpsc::channel::<Increment>(INCREMENT_CHANNEL_SIZE);

    let tracker = DwellTracker::new(options.classifier);
    let collector = create_collector(
        sender,
        events,
        tracker,
        &shutdown_token,
        options.flush_interval,
        DefaultClock,
    );

    let store = JsonFileStore::new(options.store_dir)?;
    let local_saver = create_local_saver(store, DefaultClock).await?;

    let (collection_result, processing_result) = match options.sync {
        Some(client) => {
            let processor =
                ProcessingModule::new(receiver, (local_saver, SyncForwarder::new(client)));
            run_modules(shutdown_token, collector, processor).await
        }
        None => {
            info!("Sync disabled, increments stay local");
            let processor = ProcessingModule::new(receiver, local_saver);
            run_modules(shutdown_token, collector, processor).await
        }
    };

    if let Err(collection_result) = collection_result {
        error!("Collection module got an error {:?}", collection_result);
    }

    if let Err(processing_result) = processing_result {
        error!("Processing module got an error {:?}", processing_result);
    }

    Ok(())
}

async fn run_modules<P: IncrementProcessor>(
    shutdown_token: CancellationToken,
    collector: DataCollectionModule,
    processor: ProcessingModule<P>,
) -> (Result<()>, Result<()>) {
    let collection = async {
        let result = collector.run().await;
        // The collector is done, so nothing is left for the signal listener to stop.
        shutdown_token.cancel();
        result
    };

    let (_, collection_result, processing_result) = tokio::join!(
        shutdown::detect_shutdown(shutdown_token.clone()),
        collection,
        processor.run(),
    );
    (collection_result, processing_result)
}

fn create_collector(
    sender: mpsc::Sender<Increment>,
    events: FocusStream,
    tracker: DwellTracker,
    shutdown_token: &CancellationToken,
    flush_interval: Duration,
    clock: impl Clock,
) -> DataCollectionModule {
    DataCollectionModule::new(
        sender,
        events,
        tracker,
        shutdown_token.clone(),
        flush_interval,
        Box::new(clock),
    )
}

async fn create_local_saver<S: DocumentStore>(
    store: S,
    clock: impl Clock,
) -> Result<LocalSaver<S>> {
    let local = LocalAggregateStore::open(store).await?;
    Ok(LocalSaver::new(local, Box::new(clock)))
}

#[cfg(test)]
mod daemon_tests {
    use std::{sync::Arc, time::Duration};

    use anyhow::{anyhow, Result};
    use chrono::{TimeZone, Utc};
    use futures::StreamExt;
    use tokio::sync::mpsc;
    use tokio_stream::wrappers::UnboundedReceiverStream;
    use tokio_util::sync::CancellationToken;

    use crate::{
        classifier::Classifier,
        daemon::{
            collection::{
                source::FocusStream,
                tracker::{DwellTracker, FocusEvent},
            },
            create_collector, create_local_saver,
            processing::{sync_forward::SyncForwarder, ProcessingModule},
            storage::{
                document_store::MemoryStore, entities::Increment, local_store::read_snapshot,
            },
        },
        sync::{MockIncrementTransport, SyncClient},
        utils::{
            clock::{Clock, TestClock},
            logging::TEST_LOGGING,
            time::date_to_key,
        },
    };

    use super::run_modules;

    fn gain(tab_id: i64, url: &str) -> FocusEvent {
        FocusEvent::FocusGain {
            tab_id,
            url: url.into(),
        }
    }

    /// Drives the whole tracker pipeline on a paused clock: two focus changes, one periodic
    /// flush and the browser closing the host. Every sync attempt fails, which must leave the
    /// local aggregate untouched.
    #[tokio::test(start_paused = true)]
    async fn smoke_test_tracker() -> Result<()> {
        *TEST_LOGGING;
        let clock = TestClock::new(Utc.with_ymd_and_hms(2018, 7, 4, 10, 0, 0).unwrap());
        let today = date_to_key(clock.today());

        let mut transport = MockIncrementTransport::new();
        transport
            .expect_post()
            .times(3)
            .returning(|_| Err(anyhow!("backend unreachable")));
        let client = SyncClient::new(Arc::new(transport));

        let (events_sender, events_receiver) = mpsc::unbounded_channel::<FocusEvent>();
        let events: FocusStream = UnboundedReceiverStream::new(events_receiver).map(Ok).boxed();

        let shutdown_token = CancellationToken::new();
        let (sender, receiver) = mpsc::channel::<Increment>(8);
        let collector = create_collector(
            sender,
            events,
            DwellTracker::new(Classifier::default()),
            &shutdown_token,
            Duration::from_secs(60),
            clock.clone(),
        );

        let store = MemoryStore::new();
        let saver = create_local_saver(store.clone(), clock.clone()).await?;
        let processor = ProcessingModule::new(receiver, (saver, SyncForwarder::new(client)));

        let script = async move {
            events_sender.send(gain(1, "https://github.com/rust-lang/rust"))?;
            tokio::time::sleep(Duration::from_secs(30)).await;
            events_sender.send(gain(2, "https://www.youtube.com/watch?v=1"))?;
            // The flush fires at 60s and splits the youtube session in two.
            tokio::time::sleep(Duration::from_secs(45)).await;
            events_sender.send(gain(3, "not a url"))?;
            tokio::time::sleep(Duration::from_secs(10)).await;
            drop(events_sender);
            anyhow::Ok(())
        };

        let (script_result, (collection_result, processing_result)) =
            tokio::join!(script, run_modules(shutdown_token, collector, processor));
        script_result?;
        collection_result?;
        processing_result?;

        let snapshot = read_snapshot(&store).await?;
        let day = &snapshot[&today];
        assert_eq!(day.domains["github.com"].time, 30);
        assert_eq!(day.domains["youtube.com"].time, 45);
        assert_eq!(day.productive, 30);
        assert_eq!(day.unproductive, 45);
        assert_eq!(day.category_sum(), day.domain_sum());
        assert_eq!(day.domains.len(), 2);

        Ok(())
    }
}
