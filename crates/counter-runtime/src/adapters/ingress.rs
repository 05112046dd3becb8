//! # TCP Vote Ingress
//!
//! Accepts connections on the bus address and publishes every
//! newline-delimited frame, unchanged apart from the line terminator, to the
//! vote topic. A trailing frame without a newline is published when the peer
//! closes. Frames are opaque: empty lines are valid (empty) votes.

use shared_bus::{EventPublisher, InMemoryEventBus};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::RuntimeError;

/// Upper bound on a single line, `\n` excluded. Longer lines end the
/// connection without being published.
pub const MAX_FRAME_LEN: usize = 64 * 1024;

pub struct TcpVoteIngress {
    listener: TcpListener,
    bus: Arc<InMemoryEventBus>,
    topic: String,
}

impl TcpVoteIngress {
    /// Bind the listener. Failure is fatal to the runtime.
    pub async fn bind(
        address: &str,
        bus: Arc<InMemoryEventBus>,
        topic: impl Into<String>,
    ) -> Result<Self, RuntimeError> {
        let listener = TcpListener::bind(address)
            .await
            .map_err(|source| RuntimeError::IngressBind {
                address: address.to_string(),
                source,
            })?;
        Ok(Self {
            listener,
            bus,
            topic: topic.into(),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until `shutdown` turns true.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        if let Ok(addr) = self.local_addr() {
            info!(%addr, topic = %self.topic, "Vote ingress listening");
        }

        while !*shutdown.borrow() {
            tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        debug!(%peer, "Ingress connection accepted");
                        let bus = Arc::clone(&self.bus);
                        let topic = self.topic.clone();
                        tokio::spawn(async move {
                            let published = read_frames(stream, &bus, &topic).await;
                            debug!(%peer, published, "Ingress connection closed");
                        });
                    }
                    Err(e) => warn!(error = %e, "Ingress accept failed"),
                },
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
        info!("Vote ingress stopped");
    }
}

/// Publish each frame read from `stream`. Returns the number published.
async fn read_frames(stream: TcpStream, bus: &InMemoryEventBus, topic: &str) -> usize {
    let mut reader = BufReader::new(stream);
    let mut frame = Vec::new();
    let mut published = 0;

    loop {
        frame.clear();
        let mut limited = (&mut reader).take(MAX_FRAME_LEN as u64 + 1);
        match limited.read_until(b'\n', &mut frame).await {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "Ingress read failed");
                break;
            }
        }

        let terminated = frame.last() == Some(&b'\n');
        if terminated {
            frame.pop();
        }
        if frame.len() > MAX_FRAME_LEN {
            warn!(len = frame.len(), "Ingress frame too long, closing connection");
            break;
        }
        if terminated && frame.last() == Some(&b'\r') {
            frame.pop();
        }

        if let Err(e) = bus.publish(topic, frame.clone()).await {
            warn!(error = %e, "Ingress publish failed, closing connection");
            break;
        }
        published += 1;
    }
    published
}
