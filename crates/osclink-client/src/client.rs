//! Main osclink client implementation
//!
//! One live connection per client, TCP (length-framed) or UDP (raw
//! datagrams). Inbound payloads flow through the [`Dispatcher`] onto the
//! client's event bus; see [`crate::events`] for the notification surface.

use bytes::Bytes;
use parking_lot::Mutex;
use rosc::OscPacket;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use osclink_transport::{
    TcpConfig, TcpTransport, TransportEvent, TransportReceiver, TransportSender, UdpTransport,
};

use crate::builder::OscClientBuilder;
use crate::dispatch::Dispatcher;
use crate::error::{ClientError, Result};
use crate::events::{ClientEvent, EventBus};
use crate::methods::MethodRegistry;

/// One live transport session
struct Connection {
    remote: SocketAddr,
    local: Option<SocketAddr>,
    sender: Arc<dyn TransportSender>,
    recv_task: JoinHandle<()>,
}

/// An OSC client
pub struct OscClient {
    tcp_config: TcpConfig,
    udp_local_port: u16,

    events: Arc<EventBus>,
    methods: Arc<MethodRegistry>,
    dispatcher: Arc<Dispatcher>,

    /// True while inbound payloads should be dispatched; cleared before
    /// disposal in `close()` so no dispatch races the teardown
    handling: Arc<AtomicBool>,

    connection: Mutex<Option<Connection>>,
}

impl OscClient {
    pub(crate) fn new(
        tcp_config: TcpConfig,
        udp_local_port: u16,
        filter_registered_methods: bool,
        consume_parse_errors: bool,
    ) -> Self {
        let events = Arc::new(EventBus::new());
        let methods = Arc::new(MethodRegistry::new());
        let dispatcher = Arc::new(Dispatcher::new(events.clone(), methods.clone()));
        dispatcher.set_filter_registered_methods(filter_registered_methods);
        dispatcher.set_consume_parse_errors(consume_parse_errors);

        Self {
            tcp_config,
            udp_local_port,
            events,
            methods,
            dispatcher,
            handling: Arc::new(AtomicBool::new(false)),
            connection: Mutex::new(None),
        }
    }

    /// Create a builder
    pub fn builder() -> OscClientBuilder {
        OscClientBuilder::new()
    }

    /// Connect over TCP. Payloads are length-prefix framed in the
    /// configured byte order; blocks until the transport-level connect
    /// completes or fails.
    ///
    /// Reconnecting to the endpoint already live is an idempotent no-op
    /// (no re-handshake). Connecting to a different endpoint while live
    /// is rejected with [`ClientError::AlreadyConnected`]; close first.
    pub async fn connect(&mut self, addr: &str, port: u16) -> Result<()> {
        let remote = resolve(addr, port).await?;
        if self.check_live(remote)? {
            return Ok(());
        }

        let transport = TcpTransport::with_config(self.tcp_config.clone());
        let (sender, mut receiver) = transport.connect(&remote.to_string()).await?;

        let handling = self.handling.clone();
        let dispatcher = self.dispatcher.clone();
        let events = self.events.clone();

        let recv_task = tokio::spawn(async move {
            while let Some(event) = receiver.recv().await {
                match event {
                    TransportEvent::Data(data) => {
                        if handling.load(Ordering::SeqCst) {
                            dispatcher.dispatch(remote, &data);
                        } else {
                            debug!("Discarding {} bytes received while not handling", data.len());
                        }
                    }
                    TransportEvent::Disconnected { reason } => {
                        info!("Disconnected from {}: {:?}", remote, reason);
                        break;
                    }
                    TransportEvent::Error(e) => {
                        error!("Receive error from {}: {}", remote, e);
                        events.publish(ClientEvent::ReceiveFailed(e));
                        break;
                    }
                    TransportEvent::Connected => {}
                }
            }
        });

        self.install(Connection {
            remote,
            local: None,
            sender: Arc::new(sender),
            recv_task,
        });
        Ok(())
    }

    /// Connect over UDP: binds a local socket and targets the remote.
    /// One packet per datagram, no framing. Same liveness rules as
    /// [`connect`](Self::connect).
    pub async fn connect_udp(&mut self, addr: &str, port: u16) -> Result<()> {
        let remote = resolve(addr, port).await?;
        if self.check_live(remote)? {
            return Ok(());
        }

        let transport = UdpTransport::bind(&format!("0.0.0.0:{}", self.udp_local_port)).await?;
        let local = transport.local_addr().ok();
        let sender = transport.sender_to(remote);
        let mut receiver = transport.start_receiver();

        let handling = self.handling.clone();
        let dispatcher = self.dispatcher.clone();
        let events = self.events.clone();

        let recv_task = tokio::spawn(async move {
            while let Some((event, from)) = receiver.recv_from().await {
                match event {
                    TransportEvent::Data(data) => {
                        if handling.load(Ordering::SeqCst) {
                            dispatcher.dispatch(from, &data);
                        } else {
                            debug!("Discarding {} bytes received while not handling", data.len());
                        }
                    }
                    TransportEvent::Error(e) => {
                        error!("Receive error: {}", e);
                        events.publish(ClientEvent::ReceiveFailed(e));
                        break;
                    }
                    _ => {}
                }
            }
        });

        self.install(Connection {
            remote,
            local,
            sender: Arc::new(sender),
            recv_task,
        });
        Ok(())
    }

    /// Idempotent-reuse / reject check against the live connection.
    /// Returns true when the existing connection should be reused.
    fn check_live(&self, remote: SocketAddr) -> Result<bool> {
        let guard = self.connection.lock();
        match guard.as_ref() {
            Some(conn) if conn.remote == remote => {
                debug!("Already connected to {}, reusing", remote);
                Ok(true)
            }
            Some(conn) => Err(ClientError::AlreadyConnected(conn.remote.to_string())),
            None => Ok(false),
        }
    }

    fn install(&self, connection: Connection) {
        info!("Connected to {}", connection.remote);
        *self.connection.lock() = Some(connection);
        self.handling.store(true, Ordering::SeqCst);
    }

    /// Close the connection. Safe to call when already closed.
    pub async fn close(&self) {
        self.handling.store(false, Ordering::SeqCst);

        let conn = self.connection.lock().take();
        if let Some(conn) = conn {
            let _ = conn.sender.close().await;
            conn.recv_task.abort();
            info!("Connection to {} closed", conn.remote);
        }
    }

    /// Check if connected
    pub fn is_connected(&self) -> bool {
        self.connection
            .lock()
            .as_ref()
            .map(|c| c.sender.is_connected())
            .unwrap_or(false)
    }

    /// Remote endpoint of the live connection
    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.connection.lock().as_ref().map(|c| c.remote)
    }

    /// Local endpoint of the live connection (UDP only)
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.connection.lock().as_ref().and_then(|c| c.local)
    }

    /// Serialize and send one packet. TCP payloads get the length
    /// prefix; UDP payloads go out as one raw datagram each.
    pub async fn send(&self, packet: &OscPacket) -> Result<()> {
        let sender = {
            let guard = self.connection.lock();
            match guard.as_ref() {
                Some(conn) => conn.sender.clone(),
                None => return Err(ClientError::NotConnected),
            }
        };

        let bytes = rosc::encoder::encode(packet)
            .map_err(|e| ClientError::SendFailed(format!("OSC encode error: {:?}", e)))?;

        sender.send(Bytes::from(bytes)).await?;
        Ok(())
    }

    /// Register a new event subscriber
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<ClientEvent> {
        self.events.subscribe()
    }

    /// Register an address pattern of interest
    pub fn register_method(&self, pattern: &str) -> Result<()> {
        self.methods.register(pattern)
    }

    /// Remove a registered pattern (no-op when absent)
    pub fn unregister_method(&self, pattern: &str) {
        self.methods.unregister(pattern)
    }

    /// Remove all registered patterns
    pub fn clear_methods(&self) {
        self.methods.clear()
    }

    /// Registered patterns in insertion order
    pub fn registered_methods(&self) -> Vec<String> {
        self.methods.registered()
    }

    /// When true, only messages with a registered address are emitted
    pub fn set_filter_registered_methods(&self, enabled: bool) {
        self.dispatcher.set_filter_registered_methods(enabled);
    }

    pub fn filter_registered_methods(&self) -> bool {
        self.dispatcher.filter_registered_methods()
    }

    /// When true, decode failures are dropped silently
    pub fn set_consume_parse_errors(&self, enabled: bool) {
        self.dispatcher.set_consume_parse_errors(enabled);
    }

    pub fn consume_parse_errors(&self) -> bool {
        self.dispatcher.consume_parse_errors()
    }
}

async fn resolve(addr: &str, port: u16) -> Result<SocketAddr> {
    let endpoint = format!("{}:{}", addr, port);
    let resolved = tokio::net::lookup_host(&endpoint)
        .await
        .map_err(|e| ClientError::ConnectionFailed(format!("{}: {}", endpoint, e)))?
        .next()
        .ok_or_else(|| ClientError::ConnectionFailed(format!("{}: no address", endpoint)));
    resolved
}
