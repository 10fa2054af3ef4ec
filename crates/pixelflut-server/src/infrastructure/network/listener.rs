//! TCP listeners, one per protocol dialect.
//!
//! The dialect is chosen by the port a client connects to; there is no
//! sniffing of the first byte.

use std::io;
use std::net::SocketAddr;

use futures_util::FutureExt;
use pixelflut_core::Dialect;
use tokio::net::TcpListener;
use tracing::{debug, info};

use super::{NetworkError, PixelStream};

/// Source of newly connected clients.
pub trait Acceptor {
    /// Dialect spoken by clients from this acceptor.
    fn dialect(&self) -> Dialect;

    /// Returns the next pending client, or `None` if nobody is waiting.
    /// Never waits.
    fn try_accept(&mut self) -> io::Result<Option<(Box<dyn PixelStream>, SocketAddr)>>;
}

/// A bound TCP listener for one dialect.
#[derive(Debug)]
pub struct TcpAcceptor {
    listener: TcpListener,
    dialect: Dialect,
}

impl TcpAcceptor {
    /// Binds `addr` for `dialect` clients.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::BindFailed`] if the address is unavailable.
    pub async fn bind(addr: SocketAddr, dialect: Dialect) -> Result<Self, NetworkError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| NetworkError::BindFailed { addr, source })?;
        let local = listener.local_addr().unwrap_or(addr);
        info!("{dialect} listener bound on {local}");
        Ok(Self { listener, dialect })
    }

    /// The bound address; useful when binding port 0.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

impl Acceptor for TcpAcceptor {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn try_accept(&mut self) -> io::Result<Option<(Box<dyn PixelStream>, SocketAddr)>> {
        // Poll the accept future exactly once; Pending means nobody is waiting.
        match self.listener.accept().now_or_never() {
            None => Ok(None),
            Some(Ok((stream, peer))) => {
                if let Err(e) = stream.set_nodelay(true) {
                    debug!(%peer, error = %e, "could not disable Nagle");
                }
                Ok(Some((Box::new(stream), peer)))
            }
            Some(Err(e)) => Err(e),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
