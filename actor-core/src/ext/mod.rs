use std::any::type_name;

use anyhow::Context;
use bincode::{Decode, Encode};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::LocalTime;

pub fn encode_bytes<T>(value: &T) -> anyhow::Result<Vec<u8>> where T: Encode {
    bincode::encode_to_vec(value, bincode::config::standard()).context(type_name::<T>())
}

pub fn decode_bytes<T>(bytes: &[u8]) -> anyhow::Result<T> where T: Decode<()> {
    bincode::decode_from_slice(bytes, bincode::config::standard()).context(type_name::<T>()).map(|(t, _)| t)
}

pub fn init_logger(level: tracing::Level) {
    let format = tracing_subscriber::fmt::format()
        .with_timer(LocalTime::rfc_3339())
        .pretty();
    tracing_subscriber::FmtSubscriber::builder()
        .event_format(format)
        .with_max_level(level)
        .init();
}

pub fn init_logger_with_filter(filter: impl Into<EnvFilter>) {
    let format = tracing_subscriber::fmt::format()
        .with_timer(LocalTime::rfc_3339())
        .pretty()
        .with_file(false);
    tracing_subscriber::FmtSubscriber::builder()
        .event_format(format)
        .with_env_filter(filter)
        .init();
}

/// Incarnation id for a freshly started node.
pub fn random_uid() -> i64 {
    loop {
        let uid = rand::random::<i64>();
        if uid != 0 {
            return uid;
        }
    }
}
