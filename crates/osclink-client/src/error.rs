//! Client error types

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("not connected")]
    NotConnected,

    #[error("already connected to {0}")]
    AlreadyConnected(String),

    #[error("send failed: {0}")]
    SendFailed(String),

    #[error("malformed packet: {0}")]
    MalformedPacket(String),

    #[error("invalid address pattern: {0}")]
    InvalidAddress(String),

    #[error("transmitter already running")]
    AlreadyRunning,

    #[error("transport error: {0}")]
    Transport(#[from] osclink_transport::TransportError),

    #[error("client error: {0}")]
    Other(String),
}
