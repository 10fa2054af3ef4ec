//! Remote configuration over UDP.
//!
//! Each datagram carries one JSON object, `{"topic": "...", "payload": "..."}`.
//! Datagrams that do not parse are logged and dropped.

use std::io;
use std::net::SocketAddr;

use tokio::net::UdpSocket;
use tracing::{debug, info, warn};

use super::network::NetworkError;
use crate::application::remote_config::{ControlMessage, ControlSource};

/// Largest datagram accepted.
const MAX_DATAGRAM: usize = 2048;

#[derive(Debug)]
pub struct UdpControlSource {
    socket: UdpSocket,
    buf: Vec<u8>,
}

impl UdpControlSource {
    /// # Errors
    ///
    /// Returns [`NetworkError::BindFailed`] if `addr` is unavailable.
    pub async fn bind(addr: SocketAddr) -> Result<Self, NetworkError> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|source| NetworkError::BindFailed { addr, source })?;
        info!(
            "remote configuration listening on udp://{}",
            socket.local_addr().unwrap_or(addr)
        );
        Ok(Self {
            socket,
            buf: vec![0; MAX_DATAGRAM],
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }
}

impl ControlSource for UdpControlSource {
    fn poll(&mut self) -> Option<ControlMessage> {
        loop {
            let (len, src) = match self.socket.try_recv_from(&mut self.buf) {
                Ok(received) => received,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return None,
                Err(e) => {
                    warn!("control socket error: {e}");
                    return None;
                }
            };
            match serde_json::from_slice::<ControlMessage>(&self.buf[..len]) {
                Ok(msg) => {
                    debug!(%src, topic = %msg.topic, "control message");
                    return Some(msg);
                }
                Err(e) => warn!(%src, "dropping malformed control datagram: {e}"),
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    async fn bound() -> (UdpControlSource, UdpSocket, SocketAddr) {
        let source = UdpControlSource::bind("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        let addr = source.local_addr().unwrap();
        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        (source, sender, addr)
    }

    /// Polls until a message arrives or a second passes.
    async fn poll_for(source: &mut UdpControlSource) -> Option<ControlMessage> {
        for _ in 0..100 {
            if let Some(msg) = source.poll() {
                return Some(msg);
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        None
    }

    #[tokio::test]
    async fn test_poll_without_datagrams_returns_none() {
        let (mut source, _sender, _) = bound().await;
        assert_eq!(source.poll(), None);
    }

    #[tokio::test]
    async fn test_poll_decodes_json_message() {
        // Arrange
        let (mut source, sender, addr) = bound().await;

        // Act
        sender
            .send_to(br#"{"topic":"wall/set/bri","payload":"40"}"#, addr)
            .await
            .unwrap();

        // Assert
        assert_eq!(
            poll_for(&mut source).await,
            Some(ControlMessage {
                topic: "wall/set/bri".to_string(),
                payload: "40".to_string(),
            })
        );
    }

    #[tokio::test]
    async fn test_malformed_datagram_is_skipped() {
        let (mut source, sender, addr) = bound().await;

        sender.send_to(b"not json", addr).await.unwrap();
        sender
            .send_to(br#"{"topic":"wall/set/on","payload":"0"}"#, addr)
            .await
            .unwrap();

        let msg = poll_for(&mut source).await.expect("second datagram");
        assert_eq!(msg.topic, "wall/set/on");
    }
}
