use std::fmt::{Debug, Formatter};

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

use crate::actor::{Actor, DynMessage};

pub(crate) enum Envelope<A> where A: Actor {
    Message(DynMessage<A>),
    Stop,
}

impl<A> Debug for Envelope<A> where A: Actor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Envelope::Message(message) => {
                f.debug_tuple("Message").field(&message.name()).finish()
            }
            Envelope::Stop => {
                f.write_str("Stop")
            }
        }
    }
}

pub(crate) type MailboxSender<A> = UnboundedSender<Envelope<A>>;

pub(crate) type Mailbox<A> = UnboundedReceiver<Envelope<A>>;

pub(crate) fn mailbox<A>() -> (MailboxSender<A>, Mailbox<A>) where A: Actor {
    tokio::sync::mpsc::unbounded_channel()
}
