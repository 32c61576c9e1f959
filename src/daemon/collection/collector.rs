use std::time::Duration;

use anyhow::Result;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::{daemon::storage::entities::Increment, utils::clock::Clock};

use super::{
    source::FocusStream,
    tracker::{DwellTracker, FocusEvent},
};

/// Drives the [DwellTracker]. Browser events, the flush timer and shutdown are handled one at a
/// time, so a transition always completes before the next one starts.
pub struct DataCollectionModule {
    next: mpsc::Sender<Increment>,
    events: FocusStream,
    tracker: DwellTracker,
    shutdown: CancellationToken,
    flush_interval: Duration,
    time_provider: Box<dyn Clock>,
}

impl DataCollectionModule {
    pub fn new(
        next: mpsc::Sender<Increment>,
        events: FocusStream,
        tracker: DwellTracker,
        shutdown: CancellationToken,
        flush_interval: Duration,
        time_provider: Box<dyn Clock>,
    ) -> Self {
        Self {
            next,
            events,
            tracker,
            shutdown,
            flush_interval,
            time_provider,
        }
    }

    async fn dispatch(&mut self, event: FocusEvent) -> Result<()> {
        let now = self.time_provider.time();
        let Some(increment) = self.tracker.handle(event, now) else {
            return Ok(());
        };

        let span = info_span!("Processing closed session");
        debug!("Sending increment {:?}", increment);
        self.next
            .send(increment)
            .instrument(span)
            .await
            .inspect_err(|e| error!("Unexpected error during sending {e:?}"))?;
        info!("Successfully sent increment");
        Ok(())
    }

    /// Executes the collector event loop. Ends on shutdown or when the browser closes the
    /// event stream, closing any open session first.
    pub async fn run(mut self) -> Result<()> {
        let mut flush_point = self.time_provider.instant() + self.flush_interval;
        loop {
            tokio::select! {
                // Dropping the sender after the final suspend also stops the processing module.
                _ = self.shutdown.cancelled() => {
                    info!("Shutdown requested");
                    return self.dispatch(FocusEvent::Suspend).await;
                }
                _ = self.time_provider.sleep_until(flush_point) => {
                    flush_point += self.flush_interval;
                    self.dispatch(FocusEvent::Flush).await?;
                }
                event = self.events.next() => match event {
                    Some(Ok(event)) => {
                        debug!("Received {event:?}");
                        self.dispatch(event).await?;
                    }
                    Some(Err(e)) => warn!("Skipping focus event: {e:?}"),
                    None => {
                        info!("Focus event stream ended");
                        return self.dispatch(FocusEvent::Suspend).await;
                    }
                },
            }
        }
    }
}
