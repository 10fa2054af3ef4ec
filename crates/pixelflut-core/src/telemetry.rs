//! Per-interval traffic counters and the telemetry capability.
//!
//! The scheduler owns one [`TelemetryAggregator`].  Every dispatched command
//! and every malformed command is charged to its [`TelemetryCounters`]; when
//! the rates tick fires, [`TelemetryAggregator::snapshot_and_reset`] turns the
//! counts into per-second rates and zeroes the counters in one step.
//!
//! Where the rates go next (smoothing, logging, publishing over the network)
//! is the business of whoever implements [`TelemetrySink`].

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Monotonic counts for the current interval.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TelemetryCounters {
    /// Commands executed, including ones that landed entirely off-canvas.
    pub commands: u64,
    /// Input bytes consumed, including malformed input.
    pub bytes: u64,
    /// Malformed commands.
    pub errors: u64,
}

impl TelemetryCounters {
    pub fn record_command(&mut self, wire_len: usize) {
        self.commands += 1;
        self.bytes += wire_len as u64;
    }

    /// Charges one malformed command.  Its bytes still count as traffic.
    pub fn record_malformed(&mut self, wire_len: usize) {
        self.errors += 1;
        self.bytes += wire_len as u64;
    }
}

/// Rates for one finished interval, in units per second.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateSample {
    pub commands_per_second: f64,
    pub errors_per_second: f64,
    pub bytes_per_second: f64,
}

impl RateSample {
    /// Hands all three rates to `sink`.
    pub fn forward(&self, sink: &mut dyn TelemetrySink) {
        sink.record(Channel::CommandsPerSecond, self.commands_per_second);
        sink.record(Channel::ErrorsPerSecond, self.errors_per_second);
        sink.record(Channel::BytesPerSecond, self.bytes_per_second);
    }
}

/// Owns the live counters and converts them into rate samples.
#[derive(Debug, Default)]
pub struct TelemetryAggregator {
    counters: TelemetryCounters,
}

impl TelemetryAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current (not yet sampled) counts.
    pub fn counters(&self) -> &TelemetryCounters {
        &self.counters
    }

    /// Mutable access for the dispatcher and the connection drain.
    pub fn counters_mut(&mut self) -> &mut TelemetryCounters {
        &mut self.counters
    }

    /// Converts the counts accumulated over `period` into rates and resets
    /// the counters to zero.
    ///
    /// A zero `period` yields the raw counts rather than dividing by zero.
    pub fn snapshot_and_reset(&mut self, period: Duration) -> RateSample {
        let counters = std::mem::take(&mut self.counters);
        let secs = period.as_secs_f64();
        let per_second = |count: u64| {
            if secs > 0.0 {
                count as f64 / secs
            } else {
                count as f64
            }
        };
        RateSample {
            commands_per_second: per_second(counters.commands),
            errors_per_second: per_second(counters.errors),
            bytes_per_second: per_second(counters.bytes),
        }
    }
}

/// Named numeric telemetry channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Channel {
    CommandsPerSecond,
    ErrorsPerSecond,
    BytesPerSecond,
    /// Wireless signal strength in dBm.
    SignalStrength,
    /// Number of connected clients.
    Clients,
    /// Global brightness, 1..=255.
    Brightness,
    /// Power state, 1 for on and 0 for off.
    Power,
}

impl Channel {
    pub const ALL: [Channel; 7] = [
        Channel::CommandsPerSecond,
        Channel::ErrorsPerSecond,
        Channel::BytesPerSecond,
        Channel::SignalStrength,
        Channel::Clients,
        Channel::Brightness,
        Channel::Power,
    ];

    /// Topic suffix under which the channel is published.
    pub fn topic(self) -> &'static str {
        match self {
            Channel::CommandsPerSecond => "status/commands-per-second",
            Channel::ErrorsPerSecond => "status/errors-per-second",
            Channel::BytesPerSecond => "status/bytes-per-second",
            Channel::SignalStrength => "status/rssi",
            Channel::Clients => "status/clients",
            Channel::Brightness => "status/bri",
            Channel::Power => "status/on",
        }
    }

    /// Periodic channels are damped before publishing; change-driven ones
    /// (clients, brightness, power) are published as-is.
    pub fn is_smoothed(self) -> bool {
        matches!(
            self,
            Channel::CommandsPerSecond
                | Channel::ErrorsPerSecond
                | Channel::BytesPerSecond
                | Channel::SignalStrength
        )
    }
}

/// Receiver of raw telemetry values.
pub trait TelemetrySink {
    fn record(&mut self, channel: Channel, raw: f64);
}

// ── Tests ─────────────────────────────────────────────────────────────────────
