//! Where telemetry records go once smoothed.

use std::net::{SocketAddr, UdpSocket};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// One published value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    /// Full topic, `<client_name>/status/<channel>`.
    pub topic: String,
    /// Smoothed value; equals `raw` for change-driven channels.
    pub value: f64,
    pub raw: f64,
}

/// Outbound telemetry transport.  Best-effort: failures are logged, never
/// returned.
pub trait Publisher {
    fn publish(&mut self, record: &TelemetryRecord);
}

/// Writes every record to the log.
#[derive(Debug, Default)]
pub struct LogPublisher;

impl Publisher for LogPublisher {
    fn publish(&mut self, record: &TelemetryRecord) {
        info!(
            topic = %record.topic,
            value = record.value,
            raw = record.raw,
            "telemetry"
        );
    }
}

/// Sends every record as a JSON datagram.
#[derive(Debug)]
pub struct UdpJsonPublisher {
    socket: UdpSocket,
    target: SocketAddr,
}

impl UdpJsonPublisher {
    /// # Errors
    ///
    /// Returns the I/O error if no local socket can be created.
    pub fn new(target: SocketAddr) -> std::io::Result<Self> {
        let local: SocketAddr = if target.is_ipv4() {
            SocketAddr::from(([0, 0, 0, 0], 0))
        } else {
            SocketAddr::from(([0u16; 8], 0))
        };
        let socket = UdpSocket::bind(local)?;
        socket.set_nonblocking(true)?;
        info!("publishing telemetry to udp://{target}");
        Ok(Self { socket, target })
    }
}

impl Publisher for UdpJsonPublisher {
    fn publish(&mut self, record: &TelemetryRecord) {
        let bytes = match serde_json::to_vec(record) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("failed to encode telemetry record: {e}");
                return;
            }
        };
        if let Err(e) = self.socket.send_to(&bytes, self.target) {
            warn!(topic = %record.topic, "telemetry send to {} failed: {e}", self.target);
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
