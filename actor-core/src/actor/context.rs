use std::future::Future;

use tokio::task::AbortHandle;

use crate::actor::Actor;
use crate::actor::actor_ref::ActorRef;
use crate::actor::scheduler::{scheduler, SchedulerSender};

#[derive(Debug)]
pub struct Context<A> where A: Actor {
    pub(crate) myself: ActorRef<A>,
    pub(crate) stopping: bool,
    pub(crate) scheduler: Option<SchedulerSender>,
    pub(crate) fut_handles: Vec<AbortHandle>,
}

impl<A> Context<A> where A: Actor {
    pub(crate) fn new(myself: ActorRef<A>) -> Self {
        Self {
            myself,
            stopping: false,
            scheduler: None,
            fut_handles: vec![],
        }
    }

    pub fn myself(&self) -> &ActorRef<A> {
        &self.myself
    }

    /// Stop the actor after the current message. Remaining mailbox messages are dropped.
    pub fn stop(&mut self) {
        self.stopping = true;
    }

    pub fn is_stopping(&self) -> bool {
        self.stopping
    }

    pub fn scheduler(&mut self) -> &SchedulerSender {
        self.scheduler.get_or_insert_with(scheduler)
    }

    /// Run a future outside the actor task. The future is aborted when the actor stops,
    /// results should be posted back to [`Context::myself`] as messages.
    pub fn spawn_fut<F>(&mut self, future: F) -> AbortHandle where F: Future<Output=()> + Send + 'static {
        self.fut_handles.retain(|handle| !handle.is_finished());
        let handle = tokio::spawn(future).abort_handle();
        self.fut_handles.push(handle.clone());
        handle
    }

    pub(crate) fn cleanup(&mut self) {
        if let Some(scheduler) = self.scheduler.take() {
            scheduler.cancel_all();
        }
        for handle in self.fut_handles.drain(..) {
            handle.abort();
        }
    }
}
