//! One connected client.
//!
//! A [`Connection`] owns the socket, an input buffer and the decoder for the
//! dialect of the listener it arrived on.  The scheduler drives it through
//! [`Connection::process_one`], which reads whatever the socket has ready,
//! then handles at most one unit of input: a command, a text reply, a blank
//! line or one malformed command.
//!
//! # Outbound bytes
//!
//! The handshake and text replies go through an outbox that is flushed at the
//! start of every [`Connection::process_one`].  Whatever the socket cannot
//! take yet stays queued for the next pass.  Once [`MAX_OUTBOX`] bytes are
//! waiting, further replies are dropped.
//!
//! # Liveness
//!
//! End-of-stream or a read/write error marks the connection dead, but bytes
//! already buffered are still decoded.  The connection manager removes it on
//! the next prune pass once [`Connection::is_finished`] reports true.
//!
//! # Partial commands
//!
//! A binary command that stays incomplete for the read timeout (no new bytes
//! arriving) is discarded as one malformed command, consuming everything
//! buffered.  The text dialect never times out a partial line.  When the peer
//! has hung up, a partial binary command is charged as malformed at once and a
//! partial text line is dropped.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use pixelflut_core::{Decoded, Decoder, Dialect, Dispatcher, Framebuffer, TelemetryCounters};
use tokio::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

use super::PixelStream;

/// Upper bound on buffered, not yet decoded input per client.
///
/// Larger than the biggest binary command (a 255×255 blit).
pub const MAX_BUFFERED: usize = 256 * 1024;

/// Bytes requested from the socket per read.
pub const READ_CHUNK: usize = 16 * 1024;

/// Upper bound on queued, not yet written output per client.
pub const MAX_OUTBOX: usize = 64 * 1024;

pub struct Connection {
    id: Uuid,
    peer: SocketAddr,
    stream: Box<dyn PixelStream>,
    decoder: Box<dyn Decoder>,
    buf: Vec<u8>,
    outbox: Vec<u8>,
    /// Offset of the first undecoded byte in `buf`.
    start: usize,
    alive: bool,
    /// When the current incomplete command last made progress.
    stalled_since: Option<Instant>,
}

impl Connection {
    /// Wraps a freshly accepted stream and sends the dialect's greeting.
    pub fn open(
        stream: Box<dyn PixelStream>,
        peer: SocketAddr,
        decoder: Box<dyn Decoder>,
    ) -> Self {
        let mut conn = Self {
            id: Uuid::new_v4(),
            peer,
            stream,
            decoder,
            buf: Vec::with_capacity(READ_CHUNK),
            outbox: Vec::new(),
            start: 0,
            alive: true,
            stalled_since: None,
        };
        let greeting = conn.decoder.greeting().to_vec();
        conn.queue(&greeting);
        conn
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn dialect(&self) -> Dialect {
        self.decoder.dialect()
    }

    /// Whether the peer is still connected.
    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Bytes received but not yet decoded.
    pub fn pending(&self) -> usize {
        self.buf.len() - self.start
    }

    /// Bytes waiting to be written to the peer.
    pub fn unsent(&self) -> usize {
        self.outbox.len()
    }

    /// Dead and nothing left to decode: ready to be pruned.
    pub fn is_finished(&self) -> bool {
        !self.alive && self.pending() == 0
    }

    /// Flushes queued output, reads what the socket has ready, then handles
    /// at most one unit of input.  Returns `true` if anything was written,
    /// read or consumed.
    pub fn process_one(
        &mut self,
        fb: &mut Framebuffer,
        counters: &mut TelemetryCounters,
        now: Instant,
        read_timeout: Duration,
    ) -> bool {
        let written = self.flush_outbox();
        let read = if self.alive { self.fill() } else { 0 };
        let moved = read > 0 || written > 0;
        if read > 0 {
            self.stalled_since = None;
        }

        match self.decoder.decode(&self.buf[self.start..]) {
            Decoded::Command { command, consumed } => {
                debug!(conn = %self.id, command = command.name(), consumed, "command");
                Dispatcher::apply(fb, &command, consumed, counters);
                self.advance(consumed);
                true
            }
            Decoded::Reply { text, consumed } => {
                counters.record_command(consumed);
                self.advance(consumed);
                self.queue(text.as_bytes());
                true
            }
            Decoded::Ignored { consumed } => {
                self.advance(consumed);
                true
            }
            Decoded::Malformed { consumed } => {
                debug!(conn = %self.id, consumed, "malformed command");
                counters.record_malformed(consumed);
                self.advance(consumed);
                true
            }
            Decoded::Incomplete => self.handle_incomplete(counters, now, read_timeout) || moved,
        }
    }

    fn handle_incomplete(
        &mut self,
        counters: &mut TelemetryCounters,
        now: Instant,
        read_timeout: Duration,
    ) -> bool {
        let pending = self.pending();
        if pending == 0 {
            self.stalled_since = None;
            return false;
        }

        if !self.alive {
            if self.decoder.partial_expires() {
                debug!(conn = %self.id, pending, "peer closed mid-command");
                counters.record_malformed(pending);
            }
            self.advance(pending);
            return true;
        }

        if !self.decoder.partial_expires() {
            return false;
        }

        let since = *self.stalled_since.get_or_insert(now);
        if now.duration_since(since) >= read_timeout {
            warn!(
                conn = %self.id,
                peer = %self.peer,
                pending,
                "incomplete command timed out, discarding"
            );
            counters.record_malformed(pending);
            self.advance(pending);
            return true;
        }
        false
    }

    fn advance(&mut self, consumed: usize) {
        self.start += consumed;
        if self.start == self.buf.len() {
            self.buf.clear();
            self.start = 0;
        }
        self.stalled_since = None;
    }

    /// Pulls up to [`READ_CHUNK`] bytes from the socket.  Returns the number
    /// of bytes read; end-of-stream and errors mark the connection dead.
    fn fill(&mut self) -> usize {
        if self.start > 0 {
            self.buf.drain(..self.start);
            self.start = 0;
        }
        let old_len = self.buf.len();
        let want = READ_CHUNK.min(MAX_BUFFERED - old_len);
        if want == 0 {
            return 0;
        }

        self.buf.resize(old_len + want, 0);
        let result = self.stream.try_read(&mut self.buf[old_len..]);
        let read = match result {
            Ok(0) => {
                debug!(conn = %self.id, "peer closed");
                self.alive = false;
                0
            }
            Ok(n) => n,
            Err(e) if is_transient(&e) => 0,
            Err(e) => {
                debug!(conn = %self.id, error = %e, "read failed");
                self.alive = false;
                0
            }
        };
        self.buf.truncate(old_len + read);
        read
    }

    /// Appends `bytes` to the outbox and tries to write it out right away.
    fn queue(&mut self, bytes: &[u8]) {
        if bytes.is_empty() || !self.alive {
            return;
        }
        if self.outbox.len() + bytes.len() > MAX_OUTBOX {
            debug!(conn = %self.id, dropped = bytes.len(), "outbox full");
            return;
        }
        self.outbox.extend_from_slice(bytes);
        self.flush_outbox();
    }

    /// Writes as much of the outbox as the socket takes.  Returns the number
    /// of bytes written; a hard error marks the connection dead.
    fn flush_outbox(&mut self) -> usize {
        let mut written = 0;
        while written < self.outbox.len() {
            match self.stream.try_write(&self.outbox[written..]) {
                Ok(0) => break,
                Ok(n) => written += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => {
                    debug!(conn = %self.id, error = %e, "write failed");
                    self.alive = false;
                    self.outbox.clear();
                    return written;
                }
            }
        }
        self.outbox.drain(..written);
        written
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("peer", &self.peer)
            .field("dialect", &self.dialect())
            .field("alive", &self.alive)
            .field("pending", &self.pending())
            .field("unsent", &self.unsent())
            .finish()
    }
}

fn is_transient(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    )
}

// ── Test doubles ──────────────────────────────────────────────────────────────

/// In-memory stream scripted by the test through a shared handle.
#[cfg(test)]
pub(crate) mod fakes {
    use std::collections::VecDeque;
    use std::io;
    use std::sync::{Arc, Mutex};

    use super::PixelStream;

    #[derive(Debug, Default)]
    pub struct ScriptState {
        pub incoming: VecDeque<u8>,
        pub outgoing: Vec<u8>,
        pub closed: bool,
        pub fail_reads: bool,
        pub writes_blocked: bool,
    }

    #[derive(Debug, Clone, Default)]
    pub struct ScriptedStream(pub Arc<Mutex<ScriptState>>);

    impl ScriptedStream {
        pub fn push(&self, bytes: &[u8]) {
            self.0.lock().unwrap().incoming.extend(bytes);
        }

        pub fn close(&self) {
            self.0.lock().unwrap().closed = true;
        }

        pub fn written(&self) -> Vec<u8> {
            self.0.lock().unwrap().outgoing.clone()
        }

        pub fn block_writes(&self, blocked: bool) {
            self.0.lock().unwrap().writes_blocked = blocked;
        }
    }

    impl PixelStream for ScriptedStream {
        fn try_read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let mut state = self.0.lock().unwrap();
            if state.fail_reads {
                return Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset"));
            }
            if state.incoming.is_empty() {
                return if state.closed {
                    Ok(0)
                } else {
                    Err(io::ErrorKind::WouldBlock.into())
                };
            }
            let n = buf.len().min(state.incoming.len());
            for (slot, byte) in buf.iter_mut().zip(state.incoming.drain(..n)) {
                *slot = byte;
            }
            Ok(n)
        }

        fn try_write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let mut state = self.0.lock().unwrap();
            if state.writes_blocked {
                return Err(io::ErrorKind::WouldBlock.into());
            }
            state.outgoing.extend_from_slice(buf);
            Ok(buf.len())
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
