//! Bounded event bus
//!
//! A single-subscriber publish channel. Publishing suspends while the
//! buffer is full, which is the pipeline's back-pressure mechanism: the
//! chain source cannot run further ahead than the buffer allows.

use tokio::sync::mpsc;

use crate::application::events::types::PipelineEvent;
use crate::domain::errors::PipelineError;

/// Default buffer capacity
pub const DEFAULT_BUFFER_SIZE: usize = 50;

/// Publishing half of the pipeline bus
#[derive(Clone)]
pub struct EventBus {
    sender: mpsc::Sender<PipelineEvent>,
}

/// Consuming half, owned by the dispatcher
pub type EventReceiver = mpsc::Receiver<PipelineEvent>;

impl EventBus {
    /// Create a bus with the given buffer capacity
    pub fn new(capacity: usize) -> (Self, EventReceiver) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }

    /// Publish an event, suspending while the buffer is full
    pub async fn publish(&self, event: PipelineEvent) -> Result<(), PipelineError> {
        self.sender
            .send(event)
            .await
            .map_err(|_| PipelineError::ChannelClosed)
    }

    /// True while the consumer is still attached
    pub fn is_healthy(&self) -> bool {
        !self.sender.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::ChainPoint;

    #[tokio::test]
    async fn publish_suspends_when_buffer_is_full() {
        let (bus, mut receiver) = EventBus::new(1);

        bus.publish(PipelineEvent::Rollback {
            point: ChainPoint::new(1, "aa"),
        })
        .await
        .unwrap();

        // The second publish must not complete until the consumer drains
        let pending = {
            let bus = bus.clone();
            tokio::spawn(async move {
                bus.publish(PipelineEvent::Rollback {
                    point: ChainPoint::new(2, "bb"),
                })
                .await
            })
        };

        tokio::task::yield_now().await;
        assert!(!pending.is_finished());

        receiver.recv().await.unwrap();
        pending.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn publish_fails_after_consumer_drops() {
        let (bus, receiver) = EventBus::new(1);
        drop(receiver);

        let result = bus
            .publish(PipelineEvent::Rollback {
                point: ChainPoint::new(1, "aa"),
            })
            .await;

        assert!(matches!(result, Err(PipelineError::ChannelClosed)));
        assert!(!bus.is_healthy());
    }
}
