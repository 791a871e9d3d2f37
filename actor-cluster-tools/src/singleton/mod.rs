use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use async_trait::async_trait;

use crate::singleton::protocol::CorrelationId;

pub mod cluster_singleton;
pub mod cluster_singleton_manager;
pub mod cluster_singleton_proxy;
mod dedup_cache;
pub mod error;
pub mod lifecycle;
pub mod protocol;
pub mod singleton_endpoint;

/// Business object hosted by exactly one node of the cluster at a time. The instance is
/// owned by the local [`ClusterSingletonManager`](cluster_singleton_manager::ClusterSingletonManager)
/// and only sees requests while it is active.
#[async_trait]
pub trait Singleton: Send + 'static {
    async fn started(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn handle(&mut self, request: SingletonRequest) -> anyhow::Result<Vec<u8>>;

    async fn stopped(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SingletonRequest {
    pub correlation_id: CorrelationId,
    /// Set by callers that retry. A handover loses the response cache, instances that must not
    /// apply a request twice should remember the keys they have seen themselves.
    pub idempotency_key: Option<String>,
    pub payload: Vec<u8>,
}

/// Creates a fresh singleton instance every time the local node takes over.
#[derive(Clone)]
pub struct SingletonProps {
    factory: Arc<dyn Fn() -> anyhow::Result<Box<dyn Singleton>> + Send + Sync>,
}

impl SingletonProps {
    pub fn new<S, F>(factory: F) -> Self
        where
            S: Singleton,
            F: Fn() -> anyhow::Result<S> + Send + Sync + 'static {
        let factory = move || {
            let singleton: Box<dyn Singleton> = Box::new(factory()?);
            Ok(singleton)
        };
        Self {
            factory: Arc::new(factory),
        }
    }

    pub(crate) fn create(&self) -> anyhow::Result<Box<dyn Singleton>> {
        (self.factory)()
    }
}

impl Debug for SingletonProps {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SingletonProps").finish_non_exhaustive()
    }
}
