use std::fmt::{Display, Formatter};

/// Per node lifecycle of a singleton instance.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum LifecycleState {
    Idle,
    Starting,
    Active,
    Stopping,
}

impl Display for LifecycleState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum LifecycleEvent {
    BecameLeader {
        generation: u64,
    },
    LostLeadership {
        generation: u64,
    },
    InstanceStarted,
    InstanceStopped,
    InstanceStartFailed {
        reason: String,
    },
}
