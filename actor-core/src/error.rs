use std::time::Duration;

use thiserror::Error;

pub type Result<T, E = Error> = core::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("mailbox of actor {0} is closed")]
    MailboxClosed(String),
    #[error("ask {actor} with {message} timeout after {timeout:?}")]
    AskTimeout {
        actor: String,
        message: &'static str,
        timeout: Duration,
    },
    #[error("actor {actor} dropped the reply channel of {message}")]
    AskCanceled {
        actor: String,
        message: &'static str,
    },
}
