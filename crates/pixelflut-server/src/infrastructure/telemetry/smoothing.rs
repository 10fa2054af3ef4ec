//! Damping of periodic rates before they are published.
//!
//! Each smoothed channel runs its own one-dimensional Kalman filter.  Raw
//! samples arrive every sampling interval; the filtered value is published
//! on the first sample and then on every `publish_every`-th one, together
//! with the raw sample that produced it.  Change-driven channels (clients,
//! brightness, power) skip the filter and publish immediately.

use std::collections::HashMap;

use pixelflut_core::{Channel, TelemetrySink};
use tracing::trace;

use super::publisher::{Publisher, TelemetryRecord};

/// Process noise of every filter.
pub const PROCESS_NOISE: f64 = 0.01;

/// Scalar Kalman filter with constant measurement error.
#[derive(Debug, Clone)]
pub struct KalmanFilter {
    err_measure: f64,
    err_estimate: f64,
    q: f64,
    last_estimate: Option<f64>,
}

impl KalmanFilter {
    /// Filter whose measurement and initial estimate error both equal
    /// `sensitivity`.  Larger values smooth harder.
    pub fn new(sensitivity: f64) -> Self {
        Self {
            err_measure: sensitivity,
            err_estimate: sensitivity,
            q: PROCESS_NOISE,
            last_estimate: None,
        }
    }

    /// Feeds one measurement and returns the new estimate.
    ///
    /// The first measurement seeds the estimate.
    pub fn update(&mut self, measurement: f64) -> f64 {
        let Some(last) = self.last_estimate else {
            self.last_estimate = Some(measurement);
            return measurement;
        };
        let gain = self.err_estimate / (self.err_estimate + self.err_measure);
        let current = last + gain * (measurement - last);
        self.err_estimate = (1.0 - gain) * self.err_estimate + (last - current).abs() * self.q;
        self.last_estimate = Some(current);
        current
    }
}

#[derive(Debug)]
struct SmoothedChannel {
    filter: KalmanFilter,
    publish_every: u32,
    samples: u64,
}

/// How often each smoothed channel publishes.
#[derive(Debug, Clone, Copy)]
pub struct SmoothingConfig {
    pub sensitivity: f64,
    /// Applies to commands, errors and bytes per second.
    pub rates_publish_every: u32,
    pub signal_publish_every: u32,
}

/// [`TelemetrySink`] that filters, throttles and hands records to publishers.
pub struct SmoothingSink {
    client_name: String,
    channels: HashMap<Channel, SmoothedChannel>,
    publishers: Vec<Box<dyn Publisher>>,
}

impl SmoothingSink {
    pub fn new(client_name: impl Into<String>, config: SmoothingConfig) -> Self {
        let channels = Channel::ALL
            .into_iter()
            .filter(|c| c.is_smoothed())
            .map(|channel| {
                let publish_every = match channel {
                    Channel::SignalStrength => config.signal_publish_every,
                    _ => config.rates_publish_every,
                };
                let state = SmoothedChannel {
                    filter: KalmanFilter::new(config.sensitivity),
                    publish_every: publish_every.max(1),
                    samples: 0,
                };
                (channel, state)
            })
            .collect();
        Self {
            client_name: client_name.into(),
            channels,
            publishers: Vec::new(),
        }
    }

    pub fn with_publisher(mut self, publisher: Box<dyn Publisher>) -> Self {
        self.publishers.push(publisher);
        self
    }

    fn emit(&mut self, channel: Channel, value: f64, raw: f64) {
        let record = TelemetryRecord {
            topic: format!("{}/{}", self.client_name, channel.topic()),
            value,
            raw,
        };
        for publisher in &mut self.publishers {
            publisher.publish(&record);
        }
    }
}

impl TelemetrySink for SmoothingSink {
    fn record(&mut self, channel: Channel, raw: f64) {
        let Some(state) = self.channels.get_mut(&channel) else {
            self.emit(channel, raw, raw);
            return;
        };
        let value = state.filter.update(raw);
        let due = state.samples % u64::from(state.publish_every) == 0;
        state.samples += 1;
        trace!(?channel, raw, value, due, "sample");
        if due {
            self.emit(channel, value, raw);
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
