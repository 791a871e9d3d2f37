pub mod remote_envelope;
pub mod transport;
