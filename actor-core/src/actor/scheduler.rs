use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::StreamExt;
use tokio::select;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio_util::time::delay_queue::{Expired, Key};
use tokio_util::time::DelayQueue;
use tracing::{trace, warn};

enum Command {
    Schedule(Timer),
    Cancel(u64),
    CancelAll,
}

enum Timer {
    Once {
        index: u64,
        block: Box<dyn FnOnce() + Send + 'static>,
    },
    FixedDelay {
        index: u64,
        interval: Duration,
        block: Box<dyn Fn() + Send + 'static>,
    },
}

impl Timer {
    fn index(&self) -> u64 {
        match self {
            Timer::Once { index, .. } => *index,
            Timer::FixedDelay { index, .. } => *index,
        }
    }
}

struct SchedulerLoop {
    rx: UnboundedReceiver<(Command, Option<Duration>)>,
    queue: DelayQueue<Timer>,
    keys: HashMap<u64, Key>,
}

impl SchedulerLoop {
    fn run(self) {
        tokio::spawn(async move {
            let SchedulerLoop { mut rx, mut queue, mut keys } = self;
            loop {
                select! {
                    Some((command, delay)) = rx.recv() => {
                        Self::on_command(command, delay, &mut queue, &mut keys);
                    }
                    Some(expired) = queue.next() => {
                        Self::on_expired(expired, &mut queue, &mut keys);
                    }
                    else => {
                        break;
                    }
                }
            }
            trace!("scheduler loop exit");
        });
    }

    fn on_command(command: Command, delay: Option<Duration>, queue: &mut DelayQueue<Timer>, keys: &mut HashMap<u64, Key>) {
        match command {
            Command::Schedule(timer) => {
                let index = timer.index();
                let delay = delay.unwrap_or_default();
                let key = queue.insert(timer, delay);
                trace!("schedule timer {} after {:?}", index, delay);
                keys.insert(index, key);
            }
            Command::Cancel(index) => {
                if let Some(key) = keys.remove(&index) {
                    if queue.try_remove(&key).is_some() {
                        trace!("timer {} canceled", index);
                    }
                }
            }
            Command::CancelAll => {
                queue.clear();
                keys.clear();
            }
        }
    }

    fn on_expired(expired: Expired<Timer>, queue: &mut DelayQueue<Timer>, keys: &mut HashMap<u64, Key>) {
        match expired.into_inner() {
            Timer::Once { index, block } => {
                keys.remove(&index);
                trace!("execute once timer {}", index);
                block();
            }
            Timer::FixedDelay { index, interval, block } => {
                trace!("execute fixed delay timer {}", index);
                block();
                let key = queue.insert(Timer::FixedDelay { index, interval, block }, interval);
                keys.insert(index, key);
            }
        }
    }
}

/// Handle of a scheduled timer. Dropping the key does not cancel the timer.
#[derive(Debug, Clone)]
pub struct ScheduleKey {
    index: u64,
    sender: UnboundedSender<(Command, Option<Duration>)>,
}

impl ScheduleKey {
    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn cancel(self) {
        let ScheduleKey { index, sender } = self;
        if sender.send((Command::Cancel(index), None)).is_err() {
            warn!("cancel timer {} failed, scheduler closed", index);
        }
    }
}

#[derive(Clone)]
pub struct SchedulerSender {
    index: Arc<AtomicU64>,
    sender: UnboundedSender<(Command, Option<Duration>)>,
}

impl Debug for SchedulerSender {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchedulerSender")
            .field("index", &self.index)
            .finish_non_exhaustive()
    }
}

impl SchedulerSender {
    fn next_index(&self) -> u64 {
        self.index.fetch_add(1, Ordering::Relaxed)
    }

    fn submit(&self, timer: Timer, delay: Duration) -> ScheduleKey {
        let index = timer.index();
        if self.sender.send((Command::Schedule(timer), Some(delay))).is_err() {
            warn!("schedule timer {} failed, scheduler closed", index);
        }
        ScheduleKey {
            index,
            sender: self.sender.clone(),
        }
    }

    pub fn schedule_once<F>(&self, delay: Duration, block: F) -> ScheduleKey where F: FnOnce() + Send + 'static {
        let timer = Timer::Once {
            index: self.next_index(),
            block: Box::new(block),
        };
        self.submit(timer, delay)
    }

    pub fn schedule_with_fixed_delay<F>(
        &self,
        initial_delay: Option<Duration>,
        interval: Duration,
        block: F,
    ) -> ScheduleKey where F: Fn() + Send + 'static {
        let timer = Timer::FixedDelay {
            index: self.next_index(),
            interval,
            block: Box::new(block),
        };
        self.submit(timer, initial_delay.unwrap_or(interval))
    }

    pub fn cancel_all(&self) {
        let _ = self.sender.send((Command::CancelAll, None));
    }
}

/// Spawn a scheduler loop on the current tokio runtime. The loop exits once every
/// sender is dropped and no timer is pending.
pub fn scheduler() -> SchedulerSender {
    let (tx, rx) = unbounded_channel();
    let scheduler_loop = SchedulerLoop {
        rx,
        queue: DelayQueue::new(),
        keys: HashMap::new(),
    };
    scheduler_loop.run();
    SchedulerSender {
        index: Arc::new(AtomicU64::new(0)),
        sender: tx,
    }
}
