use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::actor::Actor;
use crate::actor::actor_ref::ActorRef;
use crate::actor::context::Context;
use crate::actor::mailbox::{Envelope, Mailbox, mailbox};

/// Spawn `actor` on the current tokio runtime and return its reference.
pub fn spawn_actor<A>(name: impl Into<String>, actor: A) -> ActorRef<A> where A: Actor {
    spawn_actor_with_handle(name, actor).0
}

pub fn spawn_actor_with_handle<A>(name: impl Into<String>, actor: A) -> (ActorRef<A>, JoinHandle<()>) where A: Actor {
    let name = name.into();
    let (tx, rx) = mailbox::<A>();
    let myself = ActorRef::new(name, tx);
    let context = Context::new(myself.clone());
    let handle = tokio::spawn(run(actor, context, rx));
    (myself, handle)
}

async fn run<A>(mut actor: A, mut context: Context<A>, mut mailbox: Mailbox<A>) where A: Actor {
    if let Err(error) = actor.started(&mut context).await {
        error!("{} start error {:?}, stop it", context.myself, error);
        context.stopping = true;
    }
    while !context.stopping {
        match mailbox.recv().await {
            Some(Envelope::Message(message)) => {
                let name = message.name();
                if let Err(error) = message.handle(&mut context, &mut actor).await {
                    error!("{} handle message {} error {:?}", context.myself, name, error);
                }
            }
            Some(Envelope::Stop) | None => {
                context.stopping = true;
            }
        }
    }
    mailbox.close();
    if let Err(error) = actor.stopped(&mut context).await {
        error!("{} stop error {:?}", context.myself, error);
    }
    context.cleanup();
    debug!("{} stopped", context.myself);
}
