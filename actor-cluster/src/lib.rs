pub mod cluster;
pub mod cluster_daemon;
pub mod cluster_event;
pub mod leader_elector;
pub mod member;
pub mod membership_event;
pub mod membership_hub;
pub mod membership_protocol;
pub mod membership_view;
