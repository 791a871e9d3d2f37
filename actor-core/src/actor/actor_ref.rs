use std::any::type_name;
use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::debug;

use crate::actor::{Actor, DynMessage, Message};
use crate::actor::mailbox::{Envelope, MailboxSender};
use crate::error::Error;

pub struct ActorRef<A> where A: Actor {
    name: Arc<str>,
    sender: MailboxSender<A>,
}

impl<A> ActorRef<A> where A: Actor {
    pub(crate) fn new(name: impl Into<Arc<str>>, sender: MailboxSender<A>) -> Self {
        Self {
            name: name.into(),
            sender,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tell(&self, message: DynMessage<A>) {
        if let Err(error) = self.sender.send(Envelope::Message(message)) {
            if let Envelope::Message(message) = error.0 {
                debug!("{} mailbox closed, drop message {}", self, message.name());
            }
        }
    }

    pub fn cast<M>(&self, message: M) where M: Message<A=A> {
        self.tell(Box::new(message));
    }

    /// Send `message` and report whether the mailbox accepted it.
    pub fn try_cast<M>(&self, message: M) -> crate::error::Result<()> where M: Message<A=A> {
        self.sender
            .send(Envelope::Message(Box::new(message)))
            .map_err(|_| Error::MailboxClosed(self.name.to_string()))
    }

    pub fn stop(&self) {
        let _ = self.sender.send(Envelope::Stop);
    }

    pub fn is_terminated(&self) -> bool {
        self.sender.is_closed()
    }

    pub async fn ask<M, R>(
        &self,
        message: impl FnOnce(oneshot::Sender<R>) -> M,
        timeout: Duration,
    ) -> crate::error::Result<R>
        where
            M: Message<A=A>,
            R: Send + 'static {
        let (tx, rx) = oneshot::channel();
        self.try_cast(message(tx))?;
        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(resp)) => Ok(resp),
            Ok(Err(_)) => {
                Err(Error::AskCanceled {
                    actor: self.name.to_string(),
                    message: type_name::<M>(),
                })
            }
            Err(_) => {
                Err(Error::AskTimeout {
                    actor: self.name.to_string(),
                    message: type_name::<M>(),
                    timeout,
                })
            }
        }
    }
}

impl<A> Clone for ActorRef<A> where A: Actor {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            sender: self.sender.clone(),
        }
    }
}

impl<A> PartialEq for ActorRef<A> where A: Actor {
    fn eq(&self, other: &Self) -> bool {
        self.sender.same_channel(&other.sender)
    }
}

impl<A> Eq for ActorRef<A> where A: Actor {}

impl<A> Debug for ActorRef<A> where A: Actor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActorRef")
            .field("name", &self.name)
            .field("actor", &type_name::<A>())
            .finish()
    }
}

impl<A> Display for ActorRef<A> where A: Actor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Actor[{}]", self.name)
    }
}
