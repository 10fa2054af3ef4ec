//! Network infrastructure for the pixelflut server.
//!
//! # Sub-modules
//!
//! - **`listener`** – Binds one TCP listener per protocol dialect and accepts
//!   pending clients without ever waiting for one.
//!
//! - **`connection`** – Per-client state: the socket, its input buffer, the
//!   dialect decoder and the partial-command read timeout.
//!
//! - **`connection_manager`** – The active-connection set: accept, prune and
//!   the round-robin drain pass that hands at most one command per client to
//!   the dispatcher.
//!
//! # Non-blocking I/O (for beginners)
//!
//! Every socket here is driven with `try_read` / `try_write`, which return
//! [`std::io::ErrorKind::WouldBlock`] immediately instead of waiting.  That is
//! what lets a single task serve any number of clients: nobody ever sits
//! waiting on one slow peer.  The scheduler yields to the runtime between
//! passes so the reactor can refresh socket readiness.

pub mod connection;
pub mod connection_manager;
pub mod listener;

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

/// Error type for listener setup.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("bind failed on {addr}: {source}")]
    BindFailed {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
}

/// A non-blocking byte stream to one client.
///
/// Both methods must return [`io::ErrorKind::WouldBlock`] rather than wait.
pub trait PixelStream: Send {
    fn try_read(&mut self, buf: &mut [u8]) -> io::Result<usize>;
    fn try_write(&mut self, buf: &[u8]) -> io::Result<usize>;
}

impl PixelStream for tokio::net::TcpStream {
    fn try_read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        tokio::net::TcpStream::try_read(self, buf)
    }

    fn try_write(&mut self, buf: &[u8]) -> io::Result<usize> {
        tokio::net::TcpStream::try_write(self, buf)
    }
}
