//! Single-shot delayed task schedulers

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::debug;

use crate::util::time::ticks_to_duration;

use super::{ScheduledTask, Scheduler};

/// Runs each task on a tokio timer and hands it back through a channel, so
/// the receiving loop applies it on the same logical thread as host events.
#[derive(Clone)]
pub struct TokioScheduler {
    task_tx: mpsc::Sender<ScheduledTask>,
    tick_millis: u64,
}

impl TokioScheduler {
    pub fn new(tick_millis: u64) -> (Self, mpsc::Receiver<ScheduledTask>) {
        let (task_tx, task_rx) = mpsc::channel(64);
        (
            Self {
                task_tx,
                tick_millis,
            },
            task_rx,
        )
    }
}

impl Scheduler for TokioScheduler {
    /// Must be called from within a tokio runtime
    fn schedule_once(&self, delay_ticks: u64, task: ScheduledTask) {
        let task_tx = self.task_tx.clone();
        let delay = ticks_to_duration(delay_ticks, self.tick_millis);

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(e) = task_tx.send(task).await {
                debug!(task = ?e.0, "Task receiver closed, dropping task");
            }
        });
    }
}

#[derive(Debug, Default)]
struct TickQueue {
    now: u64,
    seq: u64,
    /// (due tick, insertion seq, task)
    pending: Vec<(u64, u64, ScheduledTask)>,
}

/// Scheduler driven by explicit tick advances, for hosts that own their
/// clock and for deterministic tests.
#[derive(Debug, Default)]
pub struct TickScheduler {
    queue: Mutex<TickQueue>,
}

impl TickScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn now(&self) -> u64 {
        self.queue.lock().now
    }

    #[cfg(test)]
    pub fn pending(&self) -> usize {
        self.queue.lock().pending.len()
    }

    /// Move the clock forward and return the tasks that became due, in due
    /// order and then scheduling order.
    pub fn advance(&self, ticks: u64) -> Vec<ScheduledTask> {
        let mut queue = self.queue.lock();
        queue.now += ticks;
        let now = queue.now;

        let mut due: Vec<(u64, u64, ScheduledTask)> = Vec::new();
        let mut i = 0;
        while i < queue.pending.len() {
            if queue.pending[i].0 <= now {
                due.push(queue.pending.swap_remove(i));
            } else {
                i += 1;
            }
        }

        due.sort_by_key(|(at, seq, _)| (*at, *seq));
        due.into_iter().map(|(_, _, task)| task).collect()
    }
}

impl Scheduler for TickScheduler {
    fn schedule_once(&self, delay_ticks: u64, task: ScheduledTask) {
        let mut queue = self.queue.lock();
        let due = queue.now + delay_ticks;
        let seq = queue.seq;
        queue.seq += 1;
        queue.pending.push((due, seq, task));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn combat(arena: &str, match_id: u64) -> ScheduledTask {
        ScheduledTask::EnableCombat {
            arena: arena.to_string(),
            match_id,
        }
    }

    #[test]
    fn tick_scheduler_releases_in_due_order() {
        let scheduler = TickScheduler::new();
        scheduler.schedule_once(10, combat("b", 2));
        scheduler.schedule_once(5, combat("a", 1));
        scheduler.schedule_once(10, combat("c", 3));

        assert!(scheduler.advance(4).is_empty());
        assert_eq!(scheduler.advance(1), vec![combat("a", 1)]);
        assert_eq!(scheduler.advance(100), vec![combat("b", 2), combat("c", 3)]);
        assert_eq!(scheduler.pending(), 0);
        assert_eq!(scheduler.now(), 105);
    }

    #[test]
    fn tokio_scheduler_delivers_after_delay() {
        tokio_test::block_on(async {
            let (scheduler, mut task_rx) = TokioScheduler::new(1);
            scheduler.schedule_once(3, combat("arena1", 9));
            let task = task_rx.recv().await;
            assert_eq!(task, Some(combat("arena1", 9)));
        });
    }
}
