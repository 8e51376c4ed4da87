//! osclink Client Library
//!
//! High-level async OSC client over UDP or length-framed TCP.
//!
//! # Example
//!
//! ```ignore
//! use osclink_client::prelude::*;
//! use rosc::{OscMessage, OscPacket, OscType};
//!
//! #[tokio::main]
//! async fn main() -> osclink_client::Result<()> {
//!     let mut client = OscClient::builder()
//!         .filter_registered_methods(true)
//!         .build();
//!
//!     client.register_method("/synth/freq")?;
//!     let mut events = client.subscribe();
//!
//!     client.connect_udp("127.0.0.1", 9000).await?;
//!     client
//!         .send(&OscPacket::Message(OscMessage {
//!             addr: "/synth/freq".to_string(),
//!             args: vec![OscType::Float(440.0)],
//!         }))
//!         .await?;
//!
//!     while let Some(event) = events.recv().await {
//!         if let ClientEvent::MessageReceived(msg) = event {
//!             println!("{} {:?}", msg.addr, msg.args);
//!         }
//!     }
//!
//!     client.close().await;
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod client;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod methods;
pub mod transmitter;

pub use builder::OscClientBuilder;
pub use client::OscClient;
pub use error::{ClientError, Result};
pub use events::{ClientEvent, EventBus};
pub use methods::MethodRegistry;
pub use transmitter::{Beacon, BeaconConfig, BeaconEvent};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::builder::OscClientBuilder;
    pub use crate::client::OscClient;
    pub use crate::error::{ClientError, Result};
    pub use crate::events::ClientEvent;
    pub use crate::transmitter::{Beacon, BeaconConfig, BeaconEvent};
    pub use osclink_transport::ByteOrder;
}
