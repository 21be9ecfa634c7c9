use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

const TICK: Duration = Duration::from_secs(1);

/// Countdown events for a single question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    Tick {
        question_index: usize,
        remaining_secs: u64,
    },
    Expired {
        question_index: usize,
    },
}

impl TimerEvent {
    #[must_use]
    pub fn question_index(&self) -> usize {
        match self {
            TimerEvent::Tick { question_index, .. } | TimerEvent::Expired { question_index } => {
                *question_index
            }
        }
    }
}

/// Receiving end for one timer run. Yields `None` once the run ends or is cancelled.
#[derive(Debug)]
pub struct TimerEvents {
    rx: mpsc::UnboundedReceiver<TimerEvent>,
}

impl TimerEvents {
    pub async fn recv(&mut self) -> Option<TimerEvent> {
        self.rx.recv().await
    }
}

/// Per-question countdown running as a cancellable tokio task.
///
/// Starting a new countdown cancels the previous one, and every run gets its
/// own channel, so a superseded run can never deliver an expiry. Dropping the
/// timer cancels the running countdown.
#[derive(Debug, Default)]
pub struct QuestionTimer {
    task: Option<JoinHandle<()>>,
}

impl QuestionTimer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start counting down `duration` for `question_index`.
    ///
    /// Ticks once per second; sub-second remainders round up. Must be called
    /// from within a tokio runtime.
    pub fn start(&mut self, question_index: usize, duration: Duration) -> TimerEvents {
        self.cancel();

        let (tx, rx) = mpsc::unbounded_channel();
        let mut remaining = whole_seconds(duration).max(1);
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + TICK, TICK);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                remaining -= 1;
                if remaining == 0 {
                    let _ = tx.send(TimerEvent::Expired { question_index });
                    break;
                }
                let tick = TimerEvent::Tick {
                    question_index,
                    remaining_secs: remaining,
                };
                if tx.send(tick).is_err() {
                    break;
                }
            }
        });
        self.task = Some(task);
        TimerEvents { rx }
    }

    /// Stop the running countdown, if any.
    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for QuestionTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn whole_seconds(duration: Duration) -> u64 {
    let secs = duration.as_secs();
    if duration.subsec_nanos() > 0 {
        secs.saturating_add(1)
    } else {
        secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn counts_down_then_expires() {
        let mut timer = QuestionTimer::new();
        let mut events = timer.start(4, Duration::from_secs(3));

        let mut seen = Vec::new();
        while let Some(event) = events.recv().await {
            seen.push(event);
        }

        assert_eq!(
            seen,
            vec![
                TimerEvent::Tick {
                    question_index: 4,
                    remaining_secs: 2
                },
                TimerEvent::Tick {
                    question_index: 4,
                    remaining_secs: 1
                },
                TimerEvent::Expired { question_index: 4 },
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_timer_never_expires() {
        let mut timer = QuestionTimer::new();
        let mut events = timer.start(0, Duration::from_secs(2));
        timer.cancel();
        assert!(!timer.is_running());
        assert_eq!(events.recv().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn restarting_supersedes_previous_run() {
        let mut timer = QuestionTimer::new();
        let mut first = timer.start(0, Duration::from_secs(1));
        let mut second = timer.start(1, Duration::from_secs(1));

        assert_eq!(first.recv().await, None);
        assert_eq!(
            second.recv().await,
            Some(TimerEvent::Expired { question_index: 1 })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_timer_cancels_run() {
        let mut timer = QuestionTimer::new();
        let mut events = timer.start(2, Duration::from_secs(5));
        drop(timer);
        assert_eq!(events.recv().await, None);
    }

    #[test]
    fn partial_seconds_round_up() {
        assert_eq!(whole_seconds(Duration::from_millis(1500)), 2);
        assert_eq!(whole_seconds(Duration::from_secs(30)), 30);
    }
}
