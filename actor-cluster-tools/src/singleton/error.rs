use std::time::Duration;

use thiserror::Error;

use actor_core::actor::address::UniqueAddress;

/// Failures of the singleton coordinator. Only the proxy side variants ever reach a caller,
/// the others are logged and turned into lifecycle transitions.
#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum SingletonError {
    #[error("singleton {singleton} election ambiguous, elected {elected} but {claimant} claims the active instance")]
    ElectionAmbiguous {
        singleton: String,
        elected: UniqueAddress,
        claimant: UniqueAddress,
    },
    #[error("singleton {singleton} instance start failure: {reason}")]
    InstanceStartFailure {
        singleton: String,
        reason: String,
    },
    #[error("singleton request not answered within {0:?}")]
    RoutingTimeout(Duration),
    #[error("singleton host {target:?} unreachable after {attempts} delivery attempts")]
    UnreachableTarget {
        target: Option<UniqueAddress>,
        attempts: u32,
    },
    #[error("singleton proxy buffer full({0}), oldest request dropped")]
    BufferOverflow(usize),
    #[error("singleton proxy terminated")]
    ProxyTerminated,
    #[error("singleton failed to handle request: {0}")]
    Remote(String),
    #[error("singleton message codec error: {0}")]
    Codec(String),
}
