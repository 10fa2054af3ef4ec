//! Remote runtime configuration: brightness and power.
//!
//! Settings arrive as `{topic, payload}` messages from a [`ControlSource`].
//! Two topics are understood, both under the server's client name:
//!
//! | Topic                  | Payload                         | Effect            |
//! |------------------------|---------------------------------|-------------------|
//! | `<name>/set/bri`       | integer, parsed leniently       | global brightness |
//! | `<name>/set/on`        | `"0"` means off, anything else on | power           |
//!
//! Brightness payloads are read like C's `atoi`: leading whitespace, an
//! optional sign, then as many digits as there are.  Anything unparsable is
//! 0.  The result is clamped into `1..=255`, so a remote `0` dims the canvas
//! to its minimum rather than switching it off.
//!
//! Every applied setting is acknowledged by publishing the resulting state.

use pixelflut_core::{Channel, Framebuffer, PixelSurface, TelemetrySink};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Lowest brightness a remote setting can produce.
pub const MIN_BRIGHTNESS: u8 = 1;

/// One inbound settings message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlMessage {
    pub topic: String,
    pub payload: String,
}

/// Source of inbound settings.  Never waits.
pub trait ControlSource {
    fn poll(&mut self) -> Option<ControlMessage>;
}

/// A recognised setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Setting {
    Brightness(u8),
    Power(bool),
}

impl Setting {
    /// Interprets `msg` for a server named `client_name`.  Unknown topics
    /// yield `None`.
    pub fn parse(client_name: &str, msg: &ControlMessage) -> Option<Self> {
        let suffix = msg
            .topic
            .strip_prefix(client_name)
            .and_then(|rest| rest.strip_prefix('/'))?;
        match suffix {
            "set/bri" => Some(Setting::Brightness(parse_brightness(&msg.payload))),
            "set/on" => Some(Setting::Power(msg.payload.trim() != "0")),
            _ => None,
        }
    }
}

/// Lenient integer parse clamped into `MIN_BRIGHTNESS..=255`.
pub fn parse_brightness(payload: &str) -> u8 {
    leading_integer(payload).clamp(i64::from(MIN_BRIGHTNESS), i64::from(u8::MAX)) as u8
}

fn leading_integer(s: &str) -> i64 {
    let s = s.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let magnitude = digits
        .bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0i64, |acc, d| {
            acc.saturating_mul(10).saturating_add(i64::from(d - b'0'))
        });
    if negative {
        -magnitude
    } else {
        magnitude
    }
}

/// Applies `setting` and acknowledges it on `sink`.
pub fn apply(
    setting: Setting,
    fb: &mut Framebuffer,
    surface: &mut dyn PixelSurface,
    sink: &mut dyn TelemetrySink,
) {
    match setting {
        Setting::Brightness(value) => {
            info!(brightness = value, "brightness changed");
            fb.set_brightness(value);
            if let Err(e) = surface.set_brightness(value) {
                warn!("surface rejected brightness {value}: {e}");
            }
            sink.record(Channel::Brightness, f64::from(value));
        }
        Setting::Power(on) => {
            info!(power = on, "power changed");
            fb.set_power(on);
            sink.record(Channel::Power, if on { 1.0 } else { 0.0 });
        }
    }
}

/// Publishes the current brightness and power state.
pub fn announce(fb: &Framebuffer, sink: &mut dyn TelemetrySink) {
    sink.record(Channel::Brightness, f64::from(fb.brightness()));
    sink.record(Channel::Power, if fb.power() { 1.0 } else { 0.0 });
}

// ── Tests ─────────────────────────────────────────────────────────────────────
