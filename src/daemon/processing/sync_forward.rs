use std::time::Duration;

use anyhow::Result;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::{daemon::storage::entities::Increment, sync::SyncClient};

use super::module::IncrementProcessor;

/// How long shutdown waits for syncs that are still in flight.
const FINALIZE_GRACE: Duration = Duration::from_secs(5);

/// Mirrors every increment to the aggregation service without waiting for the result.
pub struct SyncForwarder {
    client: SyncClient,
    in_flight: JoinSet<()>,
}

impl SyncForwarder {
    pub fn new(client: SyncClient) -> Self {
        Self {
            client,
            in_flight: JoinSet::new(),
        }
    }
}

impl IncrementProcessor for SyncForwarder {
    async fn process_next(&mut self, increment: &Increment) -> Result<()> {
        while self.in_flight.try_join_next().is_some() {}
        self.in_flight.spawn(self.client.send(increment));
        Ok(())
    }

    async fn finalize(&mut self) -> Result<()> {
        debug!("Waiting for {} in flight syncs", self.in_flight.len());
        let drained = tokio::time::timeout(FINALIZE_GRACE, async {
            while self.in_flight.join_next().await.is_some() {}
        })
        .await;
        if drained.is_err() {
            warn!("Dropping {} syncs that did not finish in time", self.in_flight.len());
            self.in_flight.abort_all();
        }
        Ok(())
    }
}
