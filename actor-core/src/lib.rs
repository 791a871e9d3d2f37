pub use actor::{Actor, DynMessage, Message};

pub mod actor;
pub mod config;
pub mod error;
pub mod ext;
pub mod util;
