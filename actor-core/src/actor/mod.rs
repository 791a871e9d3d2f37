use std::any::type_name;

use async_trait::async_trait;

use crate::actor::context::Context;

pub mod actor_ref;
pub mod address;
pub mod cell;
pub mod context;
pub(crate) mod mailbox;
pub mod scheduler;

#[async_trait]
pub trait Actor: Send + Sized + 'static {
    #[allow(unused_variables)]
    async fn started(&mut self, context: &mut Context<Self>) -> anyhow::Result<()> {
        Ok(())
    }

    #[allow(unused_variables)]
    async fn stopped(&mut self, context: &mut Context<Self>) -> anyhow::Result<()> {
        Ok(())
    }
}

/// A message is handled by exactly one actor type. Handling happens inside the
/// actor's own task, one message at a time, so `handle` has exclusive access to
/// the actor state.
#[async_trait]
pub trait Message: Send + 'static {
    type A: Actor;

    fn name(&self) -> &'static str {
        type_name::<Self>()
    }

    async fn handle(self: Box<Self>, context: &mut Context<Self::A>, actor: &mut Self::A) -> anyhow::Result<()>;
}

pub type DynMessage<A> = Box<dyn Message<A=A>>;
