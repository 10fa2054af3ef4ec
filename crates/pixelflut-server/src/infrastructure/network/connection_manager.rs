//! ConnectionManager: the active-connection set.
//!
//! Owns every listener and every connected client.  The scheduler calls it
//! through the [`ConnectionPool`] capability:
//!
//! - `accept_pending` takes every client currently waiting on any listener,
//!   sends the dialect greeting and appends it to the set.
//! - `prune` drops clients that hung up and have nothing left to decode.
//!   The survivors keep their relative order.
//! - `drain_pass` visits every client once and lets each handle at most one
//!   unit of input, so a chatty client cannot starve the others.
//!
//! There is no cap on the number of connections.

use std::time::Duration;

use pixelflut_core::{Framebuffer, TelemetryCounters};
use tokio::time::Instant;
use tracing::{info, warn};

use super::connection::Connection;
use super::listener::Acceptor;
use crate::application::scheduler::ConnectionPool;

pub struct ConnectionManager {
    acceptors: Vec<Box<dyn Acceptor>>,
    connections: Vec<Connection>,
    width: u16,
    height: u16,
    read_timeout: Duration,
}

impl ConnectionManager {
    /// Creates an empty manager for a `width × height` canvas.
    pub fn new(width: u16, height: u16, read_timeout: Duration) -> Self {
        Self {
            acceptors: Vec::new(),
            connections: Vec::new(),
            width,
            height,
            read_timeout,
        }
    }

    pub fn add_acceptor(&mut self, acceptor: Box<dyn Acceptor>) {
        self.acceptors.push(acceptor);
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    fn accept_from(&mut self, index: usize) -> usize {
        let dialect = self.acceptors[index].dialect();
        let mut accepted = 0;
        loop {
            let (stream, peer) = match self.acceptors[index].try_accept() {
                Ok(Some(pending)) => pending,
                Ok(None) => break,
                Err(e) => {
                    warn!("{dialect} accept failed: {e}");
                    break;
                }
            };
            let decoder = match dialect.decoder(self.width, self.height) {
                Ok(decoder) => decoder,
                Err(e) => {
                    warn!(%peer, "rejecting {dialect} client: {e}");
                    continue;
                }
            };
            let conn = Connection::open(stream, peer, decoder);
            info!(
                conn = %conn.id(),
                %peer,
                %dialect,
                clients = self.connections.len() + 1,
                "client joined"
            );
            self.connections.push(conn);
            accepted += 1;
        }
        accepted
    }
}

impl ConnectionPool for ConnectionManager {
    fn accept_pending(&mut self) -> usize {
        (0..self.acceptors.len()).map(|i| self.accept_from(i)).sum()
    }

    fn prune(&mut self) -> usize {
        let before = self.connections.len();
        self.connections.retain(|conn| {
            if conn.is_finished() {
                info!(conn = %conn.id(), peer = %conn.peer(), "client left");
                false
            } else {
                true
            }
        });
        let removed = before - self.connections.len();
        if removed > 0 {
            info!(clients = self.connections.len(), "pruned {removed} connection(s)");
        }
        removed
    }

    fn client_count(&self) -> usize {
        self.connections.len()
    }

    fn drain_pass(
        &mut self,
        fb: &mut Framebuffer,
        counters: &mut TelemetryCounters,
        now: Instant,
    ) -> usize {
        let mut worked = 0;
        for conn in &mut self.connections {
            if conn.process_one(fb, counters, now, self.read_timeout) {
                worked += 1;
            }
        }
        worked
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
