//! Single-shot and countdown timers owned by one step instance.

use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, Instant};

use super::events::{FlowEvent, FlowEventKind, FlowEventSender};

const TICK: Duration = Duration::from_secs(1);

/// Background timers of the current step. All of them are aborted when
/// the set is cancelled or dropped.
#[derive(Debug, Default)]
pub struct TimerSet {
    handles: Vec<JoinHandle<()>>,
}

impl TimerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emits `seconds` dwell ticks, one per second.
    pub fn start_dwell_countdown(&mut self, sender: FlowEventSender, epoch: u64, seconds: u32) {
        let handle = tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + TICK, TICK);
            for _ in 0..seconds {
                interval.tick().await;
                if sender
                    .send(FlowEvent::new(epoch, FlowEventKind::DwellTick))
                    .is_err()
                {
                    return;
                }
            }
        });
        self.handles.push(handle);
    }

    /// Emits one time-limit event after `limit`.
    pub fn start_chat_limit(&mut self, sender: FlowEventSender, epoch: u64, limit: Duration) {
        let handle = tokio::spawn(async move {
            sleep(limit).await;
            let _ = sender.send(FlowEvent::new(epoch, FlowEventKind::ChatTimeLimitReached));
        });
        self.handles.push(handle);
    }

    pub fn cancel_all(&mut self) {
        for handle in self.handles.drain(..) {
            handle.abort();
        }
    }
}

impl Drop for TimerSet {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test(start_paused = true)]
    async fn dwell_countdown_ticks_once_per_second() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timers = TimerSet::new();
        let start = Instant::now();
        timers.start_dwell_countdown(tx, 7, 3);

        for second in 1..=3u64 {
            let event = rx.recv().await.unwrap();
            assert_eq!(event, FlowEvent::new(7, FlowEventKind::DwellTick));
            assert_eq!(start.elapsed().as_secs(), second);
        }
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn chat_limit_fires_once() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timers = TimerSet::new();
        timers.start_chat_limit(tx, 1, Duration::from_secs(60));

        let event = rx.recv().await.unwrap();
        assert_eq!(event.kind, FlowEventKind::ChatTimeLimitReached);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_timers_never_fire() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timers = TimerSet::new();
        timers.start_chat_limit(tx, 1, Duration::from_secs(60));
        timers.cancel_all();

        // The aborted task drops its sender, closing the channel.
        assert!(rx.recv().await.is_none());
    }
}
