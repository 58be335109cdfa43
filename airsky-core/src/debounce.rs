//! Debouncing of free-text search input.

use std::time::Duration;

use tokio::sync::mpsc;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Feeding side of a [`Debouncer`]; one call per keystroke.
#[derive(Debug, Clone)]
pub struct InputSender(mpsc::UnboundedSender<String>);

impl InputSender {
    /// `false` once the debouncer is gone.
    pub fn send(&self, text: impl Into<String>) -> bool {
        self.0.send(text.into()).is_ok()
    }
}

/// Yields an input only after it has been stable for the interval.
#[derive(Debug)]
pub struct Debouncer {
    interval: Duration,
    rx: mpsc::UnboundedReceiver<String>,
}

impl Debouncer {
    pub fn channel(interval: Duration) -> (InputSender, Debouncer) {
        let (tx, rx) = mpsc::unbounded_channel();
        (InputSender(tx), Debouncer { interval, rx })
    }

    /// Latest input once no newer one arrived within the interval. `None`
    /// when every sender is dropped and nothing is pending.
    pub async fn settled(&mut self) -> Option<String> {
        let mut pending = self.rx.recv().await?;
        loop {
            match tokio::time::timeout(self.interval, self.rx.recv()).await {
                Ok(Some(newer)) => pending = newer,
                Ok(None) | Err(_) => return Some(pending),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn burst_collapses_to_last_input() {
        let (tx, mut debouncer) = Debouncer::channel(DEFAULT_DEBOUNCE);

        let typing = tokio::spawn(async move {
            for text in ["L", "Lo", "Lon", "Lond"] {
                tx.send(text);
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
            tx.send("London");
        });

        assert_eq!(debouncer.settled().await.as_deref(), Some("Lond"));
        assert_eq!(debouncer.settled().await.as_deref(), Some("London"));
        typing.await.unwrap();
        assert_eq!(debouncer.settled().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn waits_full_interval_after_last_input() {
        let (tx, mut debouncer) = Debouncer::channel(DEFAULT_DEBOUNCE);
        let start = Instant::now();
        tx.send("Oslo");

        assert_eq!(debouncer.settled().await.as_deref(), Some("Oslo"));
        assert!(start.elapsed() >= DEFAULT_DEBOUNCE);
        drop(tx);
    }
}
