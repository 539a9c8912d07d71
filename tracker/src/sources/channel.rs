use session_tracker_lib::{PositionSample, PositionSource, SourceError};
use tokio::sync::mpsc;

pub type SampleSender = mpsc::Sender<Result<PositionSample, SourceError>>;

/// Samples pushed in from elsewhere, e.g. a connection task.
pub struct ChannelSource {
    rx: mpsc::Receiver<Result<PositionSample, SourceError>>,
    name: String,
}

pub fn channel(capacity: usize, name: impl Into<String>) -> (SampleSender, ChannelSource) {
    let (tx, rx) = mpsc::channel(capacity);
    (tx, ChannelSource { rx, name: name.into() })
}

#[async_trait::async_trait]
impl PositionSource for ChannelSource {
    async fn next_sample(&mut self) -> Result<Option<PositionSample>, SourceError> {
        self.rx.recv().await.transpose()
    }

    /// Anything queued up was meant for the session being stopped.
    async fn release(&mut self) {
        let mut dropped = 0;
        while self.rx.try_recv().is_ok() {
            dropped += 1;
        }
        if dropped > 0 {
            tracing::debug!("Dropped {} queued samples from {}", dropped, self.name);
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    #[tokio::test]
    async fn ends_when_all_senders_are_gone() {
        let (tx, mut source) = channel(4, "test");
        tx.send(Ok(PositionSample::new(1.0, 2.0, None, Utc::now()))).await.unwrap();
        drop(tx);

        assert!(source.next_sample().await.unwrap().is_some());
        assert_eq!(source.next_sample().await, Ok(None));
    }

    #[tokio::test]
    async fn release_discards_queued_samples() {
        let (tx, mut source) = channel(4, "test");
        tx.send(Ok(PositionSample::new(1.0, 2.0, None, Utc::now()))).await.unwrap();
        tx.send(Err(SourceError::Timeout)).await.unwrap();

        source.release().await;
        drop(tx);

        assert_eq!(source.next_sample().await, Ok(None));
    }
}
