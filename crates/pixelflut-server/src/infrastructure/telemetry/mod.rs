//! Telemetry adapters: smoothing, publishing and signal sampling.

pub mod publisher;
pub mod signal;
pub mod smoothing;

pub use publisher::{LogPublisher, Publisher, TelemetryRecord, UdpJsonPublisher};
pub use signal::WirelessSignal;
pub use smoothing::{KalmanFilter, SmoothingConfig, SmoothingSink};
