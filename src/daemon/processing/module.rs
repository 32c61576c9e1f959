use std::future::Future;

use anyhow::Result;

use crate::daemon::storage::entities::Increment;

/// Represents an increment processor. Processors can be chained with a tuple, which runs
/// them in order: `(LocalSaver, SyncForwarder)` merges locally before mirroring remotely.
pub trait IncrementProcessor {
    fn process_next(&mut self, increment: &Increment) -> impl Future<Output = Result<()>>;

    fn finalize(&mut self) -> impl Future<Output = Result<()>>;
}

impl<A: IncrementProcessor, B: IncrementProcessor> IncrementProcessor for (A, B) {
    /// The second processor runs even when the first one fails. The first error wins.
    async fn process_next(&mut self, increment: &Increment) -> Result<()> {
        let first = self.0.process_next(increment).await;
        let second = self.1.process_next(increment).await;
        first.and(second)
    }

    async fn finalize(&mut self) -> Result<()> {
        let first = self.0.finalize().await;
        let second = self.1.finalize().await;
        first.and(second)
    }
}
