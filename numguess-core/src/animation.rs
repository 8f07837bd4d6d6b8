use crate::play::{MAX_NUMBER, MIN_NUMBER};
use rand::Rng;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Cosmetic ticker that shows a random number while a play is pending.
///
/// Lives exactly as long as the handle: dropping it stops the ticker.
pub struct Animation {
    task: JoinHandle<()>,
}

impl Animation {
    pub fn start<F>(interval: Duration, mut on_tick: F) -> Self
    where
        F: FnMut(u64) + Send + 'static,
    {
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                on_tick(random_number());
            }
        });
        Self { task }
    }

    pub fn stop(self) {}
}

impl Drop for Animation {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn random_number() -> u64 {
    rand::rng().random_range(MIN_NUMBER..=MAX_NUMBER)
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_ticks_stay_in_range_and_stop_on_drop() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let animation = Animation::start(Duration::from_millis(1), move |n| sink.lock().push(n));

        tokio::time::sleep(Duration::from_millis(30)).await;
        animation.stop();
        // Let an in-flight tick settle before sampling.
        tokio::time::sleep(Duration::from_millis(5)).await;
        let count = seen.lock().len();
        tokio::time::sleep(Duration::from_millis(20)).await;

        let seen = seen.lock();
        assert!(count > 0);
        assert_eq!(seen.len(), count);
        assert!(seen.iter().all(|n| (MIN_NUMBER..=MAX_NUMBER).contains(n)));
    }
}
