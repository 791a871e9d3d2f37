pub mod cluster_listener;
pub mod node;
pub mod ping_pong;
pub mod singleton_aware;
