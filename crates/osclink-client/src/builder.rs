//! Client builder pattern

use osclink_transport::{ByteOrder, TcpConfig};

use crate::client::OscClient;

/// Builder for [`OscClient`]
pub struct OscClientBuilder {
    tcp_config: TcpConfig,
    udp_local_port: u16,
    filter_registered_methods: bool,
    consume_parse_errors: bool,
}

impl OscClientBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self {
            tcp_config: TcpConfig::default(),
            udp_local_port: 0,
            filter_registered_methods: false,
            consume_parse_errors: true,
        }
    }

    /// Byte order of the TCP length prefix
    pub fn byte_order(mut self, order: ByteOrder) -> Self {
        self.tcp_config.byte_order = order;
        self
    }

    /// TCP configuration (frame limit, keepalive)
    pub fn tcp_config(mut self, config: TcpConfig) -> Self {
        self.tcp_config = config;
        self
    }

    /// Local source port for UDP connections (0 = OS-assigned)
    pub fn udp_local_port(mut self, port: u16) -> Self {
        self.udp_local_port = port;
        self
    }

    /// Only emit messages whose address is registered
    pub fn filter_registered_methods(mut self, enabled: bool) -> Self {
        self.filter_registered_methods = enabled;
        self
    }

    /// Silently drop inbound payloads that fail to decode
    pub fn consume_parse_errors(mut self, enabled: bool) -> Self {
        self.consume_parse_errors = enabled;
        self
    }

    /// Build a disconnected client
    pub fn build(self) -> OscClient {
        OscClient::new(
            self.tcp_config,
            self.udp_local_port,
            self.filter_registered_methods,
            self.consume_parse_errors,
        )
    }
}

impl Default for OscClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
