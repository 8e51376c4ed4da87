//! Periodic beacon transmitter
//!
//! A send-only UDP loop that repeats one fixed packet at a fixed interval,
//! for keep-alive and test transmission. Exactly one worker task runs per
//! started beacon; `stop()` signals it and awaits the join handle, so no
//! send can happen after `stop()` returns and the socket is released by
//! then.

use bytes::Bytes;
use rosc::OscPacket;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use osclink_transport::{TransportSender, UdpTransport};

use crate::error::{ClientError, Result};

/// Beacon configuration
#[derive(Debug, Clone)]
pub struct BeaconConfig {
    /// Local source port for the send-only socket (0 = OS-assigned)
    pub local_port: u16,
    /// Delay between transmissions
    pub interval: Duration,
}

impl Default for BeaconConfig {
    fn default() -> Self {
        Self {
            local_port: 0,
            interval: Duration::from_secs(1),
        }
    }
}

/// Progress reports from the beacon worker
#[derive(Debug, Clone)]
pub enum BeaconEvent {
    /// One transmission completed; carries the running count
    Sent(u64),
    /// A send failed; the worker loop has terminated
    Failed(String),
}

/// Periodic UDP transmitter
pub struct Beacon {
    target: SocketAddr,
    config: BeaconConfig,
    stop: Arc<Notify>,
    stopped: Arc<AtomicBool>,
    counter: Arc<AtomicU64>,
    worker: Option<JoinHandle<()>>,
}

impl Beacon {
    pub fn new(target: SocketAddr, config: BeaconConfig) -> Self {
        Self {
            target,
            config,
            stop: Arc::new(Notify::new()),
            stopped: Arc::new(AtomicBool::new(true)),
            counter: Arc::new(AtomicU64::new(0)),
            worker: None,
        }
    }

    /// Start transmitting `packet` every interval until [`stop`](Self::stop).
    ///
    /// Binds the send-only socket, resets the counter, and spawns the
    /// single worker task. Returns the progress channel. Fails with
    /// [`ClientError::AlreadyRunning`] when a worker is still attached.
    pub async fn start(&mut self, packet: OscPacket) -> Result<mpsc::UnboundedReceiver<BeaconEvent>> {
        if self.worker.is_some() {
            return Err(ClientError::AlreadyRunning);
        }

        // The packet is fixed for the session; encode it once up front
        let payload = rosc::encoder::encode(&packet)
            .map_err(|e| ClientError::SendFailed(format!("OSC encode error: {:?}", e)))?;
        let payload = Bytes::from(payload);

        let transport = UdpTransport::bind(&format!("0.0.0.0:{}", self.config.local_port)).await?;
        let sender = transport.sender_to(self.target);

        self.counter.store(0, Ordering::SeqCst);
        self.stopped.store(false, Ordering::SeqCst);
        // Fresh signal per session so a stale stop permit from a previous
        // session cannot cancel this one
        self.stop = Arc::new(Notify::new());

        let (tx, rx) = mpsc::unbounded_channel();
        let stop = self.stop.clone();
        let stopped = self.stopped.clone();
        let counter = self.counter.clone();
        let interval = self.config.interval;
        let target = self.target;

        info!("Beacon started, target {}", target);

        self.worker = Some(tokio::spawn(async move {
            while !stopped.load(Ordering::SeqCst) {
                match sender.send(payload.clone()).await {
                    Ok(()) => {
                        let count = counter.fetch_add(1, Ordering::SeqCst) + 1;
                        debug!("Beacon sent packet {} to {}", count, target);
                        let _ = tx.send(BeaconEvent::Sent(count));
                    }
                    Err(e) => {
                        error!("Beacon send to {} failed: {}", target, e);
                        let _ = tx.send(BeaconEvent::Failed(e.to_string()));
                        break;
                    }
                }

                tokio::select! {
                    _ = stop.notified() => break,
                    _ = tokio::time::sleep(interval) => {}
                }
            }

            stopped.store(true, Ordering::SeqCst);
        }));

        Ok(rx)
    }

    /// Signal the worker and wait for it to exit.
    ///
    /// When this returns the counter is frozen, no further send will
    /// happen, and the socket has been dropped. Safe to call when the
    /// worker already exited on a send failure, or was never started.
    pub async fn stop(&mut self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.stop.notify_one();

        if let Some(worker) = self.worker.take() {
            let _ = worker.await;
            info!("Beacon stopped after {} transmissions", self.count());
        }
    }

    /// Whether the worker loop is still running
    pub fn is_running(&self) -> bool {
        self.worker.is_some() && !self.stopped.load(Ordering::SeqCst)
    }

    /// Transmissions completed so far
    pub fn count(&self) -> u64 {
        self.counter.load(Ordering::SeqCst)
    }
}
