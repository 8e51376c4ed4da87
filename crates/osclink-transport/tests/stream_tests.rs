//! TCP streaming tests
//!
//! Framing discipline against a raw peer socket:
//! - one frame split across several TCP segments
//! - several frames coalesced into one segment
//! - little-endian length prefixes
//! - peer shutdown and oversized frames

use bytes::Bytes;
use osclink_transport::framing::{self, ByteOrder};
use osclink_transport::{
    TcpConfig, TcpTransport, TransportEvent, TransportReceiver, TransportSender,
};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tokio::time::timeout;

async fn recv_data(receiver: &mut impl TransportReceiver) -> Bytes {
    loop {
        match timeout(Duration::from_secs(2), receiver.recv())
            .await
            .expect("receive timed out")
        {
            Some(TransportEvent::Data(data)) => return data,
            Some(TransportEvent::Connected) => continue,
            other => panic!("expected Data event, got {:?}", other),
        }
    }
}

#[tokio::test]
async fn test_frame_split_across_segments() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let peer = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let framed = framing::frame(b"split across reads", ByteOrder::Big);

        // Drip the frame out a few bytes at a time
        for chunk in framed.chunks(5) {
            stream.write_all(chunk).await.unwrap();
            stream.flush().await.unwrap();
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        stream
    });

    let transport = TcpTransport::new();
    let (_sender, mut receiver) = transport.connect(&addr.to_string()).await.unwrap();

    let payload = recv_data(&mut receiver).await;
    assert_eq!(payload.as_ref(), b"split across reads");

    let _ = peer.await.unwrap();
}

#[tokio::test]
async fn test_frames_coalesced_in_one_segment() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let peer = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut wire = Vec::new();
        wire.extend_from_slice(&framing::frame(b"first", ByteOrder::Big));
        wire.extend_from_slice(&framing::frame(b"second", ByteOrder::Big));
        wire.extend_from_slice(&framing::frame(b"third", ByteOrder::Big));
        stream.write_all(&wire).await.unwrap();
        stream
    });

    let transport = TcpTransport::new();
    let (_sender, mut receiver) = transport.connect(&addr.to_string()).await.unwrap();

    assert_eq!(recv_data(&mut receiver).await.as_ref(), b"first");
    assert_eq!(recv_data(&mut receiver).await.as_ref(), b"second");
    assert_eq!(recv_data(&mut receiver).await.as_ref(), b"third");

    let _ = peer.await.unwrap();
}

#[tokio::test]
async fn test_little_endian_prefix() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let peer = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let framed = framing::frame(b"little", ByteOrder::Little);
        stream.write_all(&framed).await.unwrap();
        stream
    });

    let transport = TcpTransport::with_config(TcpConfig {
        byte_order: ByteOrder::Little,
        ..TcpConfig::default()
    });
    let (sender, mut receiver) = transport.connect(&addr.to_string()).await.unwrap();

    assert_eq!(recv_data(&mut receiver).await.as_ref(), b"little");

    // Outbound uses the same order
    sender.send(Bytes::from_static(b"echo")).await.unwrap();
    let mut stream = peer.await.unwrap();
    let mut buf = vec![0u8; 8];
    tokio::io::AsyncReadExt::read_exact(&mut stream, &mut buf)
        .await
        .unwrap();
    assert_eq!(&buf[..4], &[4, 0, 0, 0]);
    assert_eq!(&buf[4..], b"echo");
}

#[tokio::test]
async fn test_peer_shutdown_emits_disconnected() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let peer = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        drop(stream);
    });

    let transport = TcpTransport::new();
    let (_sender, mut receiver) = transport.connect(&addr.to_string()).await.unwrap();
    peer.await.unwrap();

    match timeout(Duration::from_secs(2), receiver.recv())
        .await
        .expect("receive timed out")
    {
        Some(TransportEvent::Disconnected { .. }) => {}
        other => panic!("expected Disconnected event, got {:?}", other),
    }
}

#[tokio::test]
async fn test_oversized_frame_drops_connection() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let peer = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        // Announce a frame far past the configured limit
        stream.write_all(&[0xFF, 0xFF, 0xFF, 0xFF]).await.unwrap();
        stream
    });

    let transport = TcpTransport::with_config(TcpConfig {
        max_frame_size: 1024,
        ..TcpConfig::default()
    });
    let (_sender, mut receiver) = transport.connect(&addr.to_string()).await.unwrap();
    let _ = peer.await.unwrap();

    match timeout(Duration::from_secs(2), receiver.recv())
        .await
        .expect("receive timed out")
    {
        Some(TransportEvent::Disconnected { reason: Some(reason) }) => {
            assert!(reason.contains("frame too large"), "reason: {}", reason);
        }
        other => panic!("expected Disconnected event, got {:?}", other),
    }
}
