//! Inbound packet dispatch
//!
//! Decodes raw payloads into OSC packets and publishes typed events:
//! one unconditional `PacketReceived` per decoded payload, a
//! `BundleReceived` for every bundle (before any of its children), and a
//! `MessageReceived` for every message that passes filtering, whether
//! top-level or nested. Bundles are walked with an explicit worklist, so
//! adversarially deep nesting cannot overflow the call stack.
//!
//! Decode failures never terminate the receive loop: they either surface
//! as a `ReceiveFailed` event or are swallowed, per configuration.

use rosc::OscPacket;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

use crate::error::ClientError;
use crate::events::{ClientEvent, EventBus};
use crate::methods::MethodRegistry;

/// Classifies decoded packets and publishes client events
pub struct Dispatcher {
    events: Arc<EventBus>,
    methods: Arc<MethodRegistry>,
    filter_registered_methods: AtomicBool,
    consume_parse_errors: AtomicBool,
}

impl Dispatcher {
    pub fn new(events: Arc<EventBus>, methods: Arc<MethodRegistry>) -> Self {
        Self {
            events,
            methods,
            filter_registered_methods: AtomicBool::new(false),
            consume_parse_errors: AtomicBool::new(true),
        }
    }

    /// When true, only messages whose address is registered are emitted
    pub fn set_filter_registered_methods(&self, enabled: bool) {
        self.filter_registered_methods
            .store(enabled, Ordering::SeqCst);
    }

    pub fn filter_registered_methods(&self) -> bool {
        self.filter_registered_methods.load(Ordering::SeqCst)
    }

    /// When true, decode failures are dropped without a `ReceiveFailed` event
    pub fn set_consume_parse_errors(&self, enabled: bool) {
        self.consume_parse_errors.store(enabled, Ordering::SeqCst);
    }

    pub fn consume_parse_errors(&self) -> bool {
        self.consume_parse_errors.load(Ordering::SeqCst)
    }

    /// Decode one already-delineated payload and publish its events
    pub fn dispatch(&self, source: SocketAddr, raw: &[u8]) {
        let packet = match rosc::decoder::decode_udp(raw) {
            Ok((_, packet)) => packet,
            Err(e) => {
                let err = ClientError::MalformedPacket(format!("{:?}", e));
                debug!("Dropping payload from {}: {}", source, err);
                if !self.consume_parse_errors() {
                    self.events.publish(ClientEvent::ReceiveFailed(err.to_string()));
                }
                return;
            }
        };

        debug!("Dispatching packet from {}", source);
        self.events.publish(ClientEvent::PacketReceived(packet.clone()));
        self.walk(packet);
    }

    /// Depth-first pre-order walk over a packet tree
    fn walk(&self, packet: OscPacket) {
        let mut stack = vec![packet];

        while let Some(node) = stack.pop() {
            match node {
                OscPacket::Message(msg) => {
                    if !self.filter_registered_methods() || self.methods.contains(&msg.addr) {
                        self.events.publish(ClientEvent::MessageReceived(msg));
                    }
                }
                OscPacket::Bundle(bundle) => {
                    self.events.publish(ClientEvent::BundleReceived(bundle.clone()));
                    // Reverse push so children pop in wire order
                    for child in bundle.content.into_iter().rev() {
                        stack.push(child);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rosc::{OscBundle, OscMessage, OscTime, OscType};
    use tokio::sync::mpsc::UnboundedReceiver;

    fn source() -> SocketAddr {
        "127.0.0.1:9000".parse().unwrap()
    }

    fn message(addr: &str) -> OscPacket {
        OscPacket::Message(OscMessage {
            addr: addr.to_string(),
            args: vec![],
        })
    }

    fn bundle(content: Vec<OscPacket>) -> OscPacket {
        OscPacket::Bundle(OscBundle {
            timetag: OscTime {
                seconds: 0,
                fractional: 1,
            },
            content,
        })
    }

    fn setup() -> (Dispatcher, Arc<MethodRegistry>, UnboundedReceiver<ClientEvent>) {
        let events = Arc::new(EventBus::new());
        let methods = Arc::new(MethodRegistry::new());
        let rx = events.subscribe();
        (Dispatcher::new(events, methods.clone()), methods, rx)
    }

    fn drain(rx: &mut UnboundedReceiver<ClientEvent>) -> Vec<ClientEvent> {
        let mut out = Vec::new();
        while let Ok(event) = rx.try_recv() {
            out.push(event);
        }
        out
    }

    fn encode(packet: &OscPacket) -> Vec<u8> {
        rosc::encoder::encode(packet).unwrap()
    }

    #[test]
    fn test_top_level_message() {
        let (dispatcher, _, mut rx) = setup();
        dispatcher.dispatch(source(), &encode(&message("/a")));

        let events = drain(&mut rx);
        assert_eq!(events.len(), 2);
        assert!(matches!(&events[0], ClientEvent::PacketReceived(_)));
        match &events[1] {
            ClientEvent::MessageReceived(msg) => assert_eq!(msg.addr, "/a"),
            other => panic!("expected MessageReceived, got {:?}", other),
        }
    }

    #[test]
    fn test_nested_bundle_preorder() {
        let (dispatcher, _, mut rx) = setup();

        let inner = bundle(vec![message("/b")]);
        let outer = bundle(vec![message("/a"), inner]);
        dispatcher.dispatch(source(), &encode(&outer));

        let events = drain(&mut rx);
        let labels: Vec<String> = events
            .iter()
            .map(|e| match e {
                ClientEvent::PacketReceived(_) => "packet".to_string(),
                ClientEvent::BundleReceived(_) => "bundle".to_string(),
                ClientEvent::MessageReceived(m) => format!("msg {}", m.addr),
                ClientEvent::ReceiveFailed(_) => "failed".to_string(),
            })
            .collect();

        assert_eq!(
            labels,
            vec!["packet", "bundle", "msg /a", "bundle", "msg /b"]
        );
    }

    #[test]
    fn test_filtering_emits_registered_subset() {
        let (dispatcher, methods, mut rx) = setup();
        dispatcher.set_filter_registered_methods(true);
        methods.register("/keep").unwrap();

        let packet = bundle(vec![message("/keep"), message("/drop"), message("/keep")]);
        dispatcher.dispatch(source(), &encode(&packet));

        let received: Vec<String> = drain(&mut rx)
            .into_iter()
            .filter_map(|e| match e {
                ClientEvent::MessageReceived(m) => Some(m.addr),
                _ => None,
            })
            .collect();

        assert_eq!(received, vec!["/keep", "/keep"]);
    }

    #[test]
    fn test_filtering_disabled_emits_all() {
        let (dispatcher, _, mut rx) = setup();

        // Three levels deep: N = 4 messages total
        let packet = bundle(vec![
            message("/1"),
            bundle(vec![message("/2"), bundle(vec![message("/3")]), message("/4")]),
        ]);
        dispatcher.dispatch(source(), &encode(&packet));

        let count = drain(&mut rx)
            .iter()
            .filter(|e| matches!(e, ClientEvent::MessageReceived(_)))
            .count();
        assert_eq!(count, 4);
    }

    #[test]
    fn test_registered_message_with_float_arg() {
        let (dispatcher, methods, mut rx) = setup();
        dispatcher.set_filter_registered_methods(true);
        methods.register("/synth/freq").unwrap();

        let packet = OscPacket::Message(OscMessage {
            addr: "/synth/freq".to_string(),
            args: vec![OscType::Float(440.0)],
        });
        dispatcher.dispatch(source(), &encode(&packet));

        let messages: Vec<OscMessage> = drain(&mut rx)
            .into_iter()
            .filter_map(|e| match e {
                ClientEvent::MessageReceived(m) => Some(m),
                _ => None,
            })
            .collect();

        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].addr, "/synth/freq");
        assert_eq!(messages[0].args, vec![OscType::Float(440.0)]);
    }

    #[test]
    fn test_malformed_payload_reported() {
        let (dispatcher, _, mut rx) = setup();
        dispatcher.set_consume_parse_errors(false);

        dispatcher.dispatch(source(), b"\x01\x02not osc");

        let events = drain(&mut rx);
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], ClientEvent::ReceiveFailed(_)));
    }

    #[test]
    fn test_malformed_payload_consumed() {
        let (dispatcher, _, mut rx) = setup();
        dispatcher.set_consume_parse_errors(true);

        dispatcher.dispatch(source(), b"\x01\x02not osc");

        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_deeply_nested_bundles() {
        let (dispatcher, _, mut rx) = setup();

        let mut packet = message("/leaf");
        for _ in 0..256 {
            packet = bundle(vec![packet]);
        }
        dispatcher.dispatch(source(), &encode(&packet));

        let events = drain(&mut rx);
        let bundles = events
            .iter()
            .filter(|e| matches!(e, ClientEvent::BundleReceived(_)))
            .count();
        let messages = events
            .iter()
            .filter(|e| matches!(e, ClientEvent::MessageReceived(_)))
            .count();

        assert_eq!(bundles, 256);
        assert_eq!(messages, 1);
        // Leaf message is the last event out
        assert!(matches!(events.last(), Some(ClientEvent::MessageReceived(_))));
    }
}
