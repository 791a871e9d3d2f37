use async_trait::async_trait;
use tokio::sync::oneshot::Sender;

use actor_core::actor::context::Context;
use actor_core::Message;

use crate::singleton::cluster_singleton_manager::ClusterSingletonManager;

#[derive(Debug)]
pub(super) struct ShutdownSingleton(pub(super) Sender<()>);

#[async_trait]
impl Message for ShutdownSingleton {
    type A = ClusterSingletonManager;

    async fn handle(self: Box<Self>, context: &mut Context<Self::A>, actor: &mut Self::A) -> anyhow::Result<()> {
        actor.shutdown(context).await;
        let _ = self.0.send(());
        Ok(())
    }
}
