use anyhow::Result;
use module::IncrementProcessor;
use tokio::sync::mpsc::Receiver;
use tracing::{debug, error, info};

use super::storage::entities::Increment;

pub mod local_save;
pub mod module;
pub mod sync_forward;

/// Receives increments emitted by the tracker and hands them to the processor chain. Errors
/// are logged per increment and never stop the loop.
pub struct ProcessingModule<Processor> {
    receiver: Receiver<Increment>,
    processor: Processor,
}

impl<P: IncrementProcessor> ProcessingModule<P> {
    pub fn new(receiver: Receiver<Increment>, processor: P) -> Self {
        Self {
            receiver,
            processor,
        }
    }

    pub async fn run(mut self) -> Result<()> {
        while let Some(increment) = self.receiver.recv().await {
            debug!("Processing increment {:?}", increment);
            match self.processor.process_next(&increment).await {
                Ok(_) => {
                    info!("Processed increment {:?}", increment)
                }
                Err(e) => {
                    error!("Error processing increment {:?}: {e:?}", increment)
                }
            }
        }

        let result = self.processor.finalize().await;
        self.receiver.close();
        result
    }
}
