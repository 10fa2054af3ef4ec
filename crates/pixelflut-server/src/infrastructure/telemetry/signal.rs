//! Wireless signal strength from `/proc/net/wireless`.
//!
//! The file looks like this; the signal level is the fourth column:
//!
//! ```text
//! Inter-| sta-|   Quality        |   Discarded packets               | Missed | WE
//!  face | tus | link level noise |  nwid  crypt   frag  retry   misc | beacon | 22
//!  wlan0: 0000   54.  -56.  -256        0      0      0      0      0        0
//! ```

use std::path::PathBuf;

use tracing::debug;

use crate::application::scheduler::SignalSource;

pub const PROC_NET_WIRELESS: &str = "/proc/net/wireless";

/// Signal level in dBm of `interface`, if the table lists it.
pub fn parse_wireless(content: &str, interface: &str) -> Option<f64> {
    content.lines().find_map(|line| {
        let (name, rest) = line.split_once(':')?;
        if name.trim() != interface {
            return None;
        }
        let level = rest.split_whitespace().nth(2)?;
        level.trim_end_matches('.').parse().ok()
    })
}

/// Samples one interface's signal level.  Yields nothing on systems
/// without the table or without the interface.
#[derive(Debug, Clone)]
pub struct WirelessSignal {
    path: PathBuf,
    interface: String,
}

impl WirelessSignal {
    pub fn new(interface: impl Into<String>) -> Self {
        Self::from_path(PROC_NET_WIRELESS, interface)
    }

    pub fn from_path(path: impl Into<PathBuf>, interface: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            interface: interface.into(),
        }
    }
}

impl SignalSource for WirelessSignal {
    fn sample(&mut self) -> Option<f64> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                debug!("cannot read {}: {e}", self.path.display());
                return None;
            }
        };
        let level = parse_wireless(&content, &self.interface);
        if level.is_none() {
            debug!(interface = %self.interface, "interface not listed in wireless table");
        }
        level
    }
}
