//! osclink Transport Layer
//!
//! Transport plumbing for osclink:
//! - TCP (stream, length-prefix framed)
//! - UDP (datagram, one packet per datagram)
//!
//! Both transports deliver inbound data as [`TransportEvent`]s over
//! channels; consumers only ever see complete, already-delineated
//! payloads. Stream reassembly lives in [`framing`] and in the TCP I/O
//! task.

pub mod error;
pub mod framing;
pub mod traits;

#[cfg(feature = "tcp")]
pub mod tcp;

#[cfg(feature = "udp")]
pub mod udp;

pub use error::{Result, TransportError};
pub use framing::ByteOrder;
pub use traits::{TransportEvent, TransportReceiver, TransportSender};

#[cfg(feature = "tcp")]
pub use tcp::{TcpConfig, TcpReceiver, TcpSender, TcpTransport};

#[cfg(feature = "udp")]
pub use udp::{UdpConfig, UdpReceiver, UdpSender, UdpTransport};
