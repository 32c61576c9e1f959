use anyhow::Result;

use crate::{
    daemon::storage::{
        document_store::DocumentStore, entities::Increment, local_store::LocalAggregateStore,
    },
    utils::clock::Clock,
};

use super::module::IncrementProcessor;

/// Bridges [ProcessingModule](super::ProcessingModule) and [LocalAggregateStore]. Increments
/// land in the day the clock reports when they are processed.
pub struct LocalSaver<S: DocumentStore> {
    store: LocalAggregateStore<S>,
    date_provider: Box<dyn Clock>,
}

impl<S: DocumentStore> LocalSaver<S> {
    pub fn new(store: LocalAggregateStore<S>, date_provider: Box<dyn Clock>) -> Self {
        Self {
            store,
            date_provider,
        }
    }
}

impl<S: DocumentStore> IncrementProcessor for LocalSaver<S> {
    async fn process_next(&mut self, increment: &Increment) -> Result<()> {
        let today = self.date_provider.today();
        self.store.merge(increment, today).await?;
        Ok(())
    }

    async fn finalize(&mut self) -> Result<()> {
        Ok(())
    }
}
