//! The control loop.
//!
//! Everything the server does happens on this one task, in this order,
//! forever:
//!
//! ```text
//!        ┌──────────────────────────────────────────────────────────┐
//!        ▼                                                          │
//!  AcceptAndPrune ──► deadline = min(rates, signal, render)         │
//!        │                                                          │
//!        ▼                                                          │
//!  Drain until deadline: every client handles ≤ 1 command per pass  │
//!        │                                                          │
//!        ▼                                                          │
//!  Fire whichever ticks are due (rates, signal, render/flush) ──────┘
//! ```
//!
//! Each tick keeps its own schedule.  After firing it moves forward by
//! exactly one period (more if the loop fell behind), so ticks never drift
//! and never run twice for the same slot.
//!
//! Between drain passes the task yields to the runtime (after a productive
//! pass) or sleeps briefly (after an idle pass, never past the deadline), so
//! the reactor can refresh socket readiness and an idle server does not spin.

use std::time::Duration;

use pixelflut_core::{
    Channel, Framebuffer, PixelSurface, Rgb, TelemetryAggregator, TelemetryCounters, TelemetrySink,
};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::remote_config::{self, ControlSource, Setting};

/// The active-connection set as the scheduler sees it.
pub trait ConnectionPool {
    /// Takes every client waiting to connect.  Returns how many joined.
    fn accept_pending(&mut self) -> usize;

    /// Drops clients that are gone.  Returns how many were removed.
    fn prune(&mut self) -> usize;

    fn client_count(&self) -> usize;

    /// Lets every client handle at most one unit of input.  Returns how many
    /// clients did any work.
    fn drain_pass(
        &mut self,
        fb: &mut Framebuffer,
        counters: &mut TelemetryCounters,
        now: Instant,
    ) -> usize;
}

/// Source of signal-strength samples, in dBm.
pub trait SignalSource {
    /// `None` when no sample is available right now.
    fn sample(&mut self) -> Option<f64>;
}

/// Colours shown by the startup self-test, one second each.
pub const STARTUP_TEST_SEQUENCE: [Rgb; 5] = [
    Rgb::RED,
    Rgb::GREEN,
    Rgb::BLUE,
    Rgb::new(64, 64, 64),
    Rgb::BLACK,
];

/// Loop timing.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Time between flushes.
    pub frame_period: Duration,
    /// Time between command/error/byte rate samples.
    pub rates_interval: Duration,
    /// Time between signal-strength samples.
    pub signal_interval: Duration,
    /// Sleep after a drain pass that found nothing to do.
    pub idle_backoff: Duration,
    /// Prefix of the control topics this server answers to.
    pub client_name: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            frame_period: Duration::from_secs(1) / 30,
            rates_interval: Duration::from_secs(5),
            signal_interval: Duration::from_secs(5),
            idle_backoff: Duration::from_millis(1),
            client_name: "pixelflut".to_string(),
        }
    }
}

/// What one cycle did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub joined: usize,
    pub left: usize,
    /// Units of client input handled during the drain phase.
    pub drained: usize,
    pub rates_sampled: bool,
    pub signal_sampled: bool,
    pub flushed: bool,
}

#[derive(Debug, Clone, Copy)]
struct Deadlines {
    rates: Instant,
    signal: Instant,
    render: Instant,
}

impl Deadlines {
    fn starting_at(now: Instant, config: &SchedulerConfig) -> Self {
        Self {
            rates: now + config.rates_interval,
            signal: now + config.signal_interval,
            render: now + config.frame_period,
        }
    }

    fn soonest(&self) -> Instant {
        self.rates.min(self.signal).min(self.render)
    }
}

pub struct Scheduler {
    pool: Box<dyn ConnectionPool>,
    framebuffer: Framebuffer,
    surface: Box<dyn PixelSurface>,
    telemetry: Box<dyn TelemetrySink>,
    aggregator: TelemetryAggregator,
    control: Option<Box<dyn ControlSource>>,
    signal: Option<Box<dyn SignalSource>>,
    config: SchedulerConfig,
    deadlines: Deadlines,
    last_published_clients: usize,
}

impl Scheduler {
    pub fn new(
        pool: Box<dyn ConnectionPool>,
        framebuffer: Framebuffer,
        surface: Box<dyn PixelSurface>,
        telemetry: Box<dyn TelemetrySink>,
        config: SchedulerConfig,
    ) -> Self {
        let deadlines = Deadlines::starting_at(Instant::now(), &config);
        Self {
            pool,
            framebuffer,
            surface,
            telemetry,
            aggregator: TelemetryAggregator::new(),
            control: None,
            signal: None,
            config,
            deadlines,
            last_published_clients: 0,
        }
    }

    pub fn with_control(mut self, control: Box<dyn ControlSource>) -> Self {
        self.control = Some(control);
        self
    }

    pub fn with_signal(mut self, signal: Box<dyn SignalSource>) -> Self {
        self.signal = Some(signal);
        self
    }

    pub fn framebuffer(&self) -> &Framebuffer {
        &self.framebuffer
    }

    /// Sets up the surface, announces brightness and power, and starts every
    /// tick schedule from now.
    pub fn start(&mut self) {
        let brightness = self.framebuffer.brightness();
        if let Err(e) = self.surface.setup(brightness) {
            warn!("surface setup failed: {e}");
        }
        remote_config::announce(&self.framebuffer, self.telemetry.as_mut());
        self.deadlines = Deadlines::starting_at(Instant::now(), &self.config);
        info!(
            width = self.framebuffer.width(),
            height = self.framebuffer.height(),
            brightness,
            power = self.framebuffer.power(),
            "scheduler started"
        );
    }

    /// Shows each colour of [`STARTUP_TEST_SEQUENCE`] for one second,
    /// bypassing the framebuffer, then restarts the tick schedules.
    pub async fn run_startup_test(&mut self) {
        info!("running startup colour test");
        for color in STARTUP_TEST_SEQUENCE {
            let shown = self
                .surface
                .fill(color)
                .and_then(|()| self.surface.flush());
            if let Err(e) = shown {
                warn!("startup test: surface failed: {e}");
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
        self.deadlines = Deadlines::starting_at(Instant::now(), &self.config);
    }

    /// Runs cycles forever.  Call [`start`](Self::start) first.
    pub async fn run(&mut self) {
        loop {
            self.run_cycle().await;
        }
    }

    /// One full AcceptAndPrune → Drain → ticks cycle.
    pub async fn run_cycle(&mut self) -> CycleReport {
        let mut report = CycleReport {
            left: self.pool.prune(),
            joined: self.pool.accept_pending(),
            ..CycleReport::default()
        };
        self.poll_control();
        self.publish_client_count();

        let deadline = self.deadlines.soonest();
        report.drained = self.drain_until(deadline).await;

        let now = Instant::now();
        if now >= self.deadlines.rates {
            let sample = self.aggregator.snapshot_and_reset(self.config.rates_interval);
            debug!(?sample, "rates sampled");
            sample.forward(self.telemetry.as_mut());
            advance(&mut self.deadlines.rates, self.config.rates_interval, now);
            report.rates_sampled = true;
        }
        if now >= self.deadlines.signal {
            if let Some(strength) = self.signal.as_mut().and_then(|s| s.sample()) {
                self.telemetry.record(Channel::SignalStrength, strength);
            }
            advance(&mut self.deadlines.signal, self.config.signal_interval, now);
            report.signal_sampled = true;
        }
        if now >= self.deadlines.render {
            if let Err(e) = self.framebuffer.flush(self.surface.as_mut()) {
                warn!("flush failed: {e}");
            }
            advance(&mut self.deadlines.render, self.config.frame_period, now);
            report.flushed = true;
        }
        report
    }

    fn poll_control(&mut self) {
        let Some(control) = self.control.as_mut() else {
            return;
        };
        while let Some(msg) = control.poll() {
            match Setting::parse(&self.config.client_name, &msg) {
                Some(setting) => remote_config::apply(
                    setting,
                    &mut self.framebuffer,
                    self.surface.as_mut(),
                    self.telemetry.as_mut(),
                ),
                None => debug!(topic = %msg.topic, "ignoring control message"),
            }
        }
    }

    /// Publishes the client count, but only when it changed.
    fn publish_client_count(&mut self) {
        let count = self.pool.client_count();
        if count != self.last_published_clients {
            self.last_published_clients = count;
            self.telemetry.record(Channel::Clients, count as f64);
        }
    }

    async fn drain_until(&mut self, deadline: Instant) -> usize {
        let mut drained = 0;
        loop {
            let now = Instant::now();
            if now >= deadline {
                return drained;
            }
            let worked = self.pool.drain_pass(
                &mut self.framebuffer,
                self.aggregator.counters_mut(),
                now,
            );
            drained += worked;
            if worked > 0 {
                tokio::task::yield_now().await;
            } else {
                tokio::time::sleep(self.config.idle_backoff.min(deadline - now)).await;
            }
        }
    }
}

/// Moves `next` forward by whole periods until it lies after `now`.
fn advance(next: &mut Instant, period: Duration, now: Instant) {
    if period.is_zero() {
        *next = now;
        return;
    }
    *next += period;
    while *next <= now {
        *next += period;
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use mockall::mock;
    use mockall::predicate::eq;
    use pixelflut_core::{Command, Dispatcher, SurfaceError};

    use super::*;
    use crate::application::remote_config::ControlMessage;

    mock! {
        pub Surface {}
        impl PixelSurface for Surface {
            fn setup(&mut self, initial_brightness: u8) -> Result<(), SurfaceError>;
            fn set_brightness(&mut self, value: u8) -> Result<(), SurfaceError>;
            fn fill(&mut self, color: Rgb) -> Result<(), SurfaceError>;
            fn set_pixel(&mut self, x: u16, y: u16, color: Rgb) -> Result<(), SurfaceError>;
            fn flush(&mut self) -> Result<(), SurfaceError>;
        }
    }

    /// Pool with a scripted client count and a queue of commands, one per pass.
    #[derive(Default)]
    struct FakePool {
        counts: VecDeque<usize>,
        current: usize,
        work: VecDeque<Command>,
    }

    impl ConnectionPool for FakePool {
        fn accept_pending(&mut self) -> usize {
            if let Some(next) = self.counts.pop_front() {
                self.current = next;
            }
            0
        }
        fn prune(&mut self) -> usize {
            0
        }
        fn client_count(&self) -> usize {
            self.current
        }
        fn drain_pass(
            &mut self,
            fb: &mut Framebuffer,
            counters: &mut TelemetryCounters,
            _now: Instant,
        ) -> usize {
            match self.work.pop_front() {
                Some(cmd) => {
                    Dispatcher::apply(fb, &cmd, 4, counters);
                    1
                }
                None => 0,
            }
        }
    }

    #[derive(Clone, Default)]
    struct SharedSink(Arc<Mutex<Vec<(Channel, f64)>>>);

    impl SharedSink {
        fn on(&self, channel: Channel) -> Vec<f64> {
            self.0
                .lock()
                .unwrap()
                .iter()
                .filter(|(c, _)| *c == channel)
                .map(|(_, v)| *v)
                .collect()
        }
    }

    impl TelemetrySink for SharedSink {
        fn record(&mut self, channel: Channel, raw: f64) {
            self.0.lock().unwrap().push((channel, raw));
        }
    }

    #[derive(Clone, Default)]
    struct CountingSurface(Arc<Mutex<(usize, Vec<Rgb>)>>);

    impl CountingSurface {
        fn flushes(&self) -> usize {
            self.0.lock().unwrap().0
        }
        fn fills(&self) -> Vec<Rgb> {
            self.0.lock().unwrap().1.clone()
        }
    }

    impl PixelSurface for CountingSurface {
        fn setup(&mut self, _: u8) -> Result<(), SurfaceError> {
            Ok(())
        }
        fn set_brightness(&mut self, _: u8) -> Result<(), SurfaceError> {
            Ok(())
        }
        fn fill(&mut self, color: Rgb) -> Result<(), SurfaceError> {
            self.0.lock().unwrap().1.push(color);
            Ok(())
        }
        fn set_pixel(&mut self, _: u16, _: u16, _: Rgb) -> Result<(), SurfaceError> {
            Ok(())
        }
        fn flush(&mut self) -> Result<(), SurfaceError> {
            self.0.lock().unwrap().0 += 1;
            Ok(())
        }
    }

    struct QueueControl(VecDeque<ControlMessage>);

    impl ControlSource for QueueControl {
        fn poll(&mut self) -> Option<ControlMessage> {
            self.0.pop_front()
        }
    }

    struct FixedSignal(f64);

    impl SignalSource for FixedSignal {
        fn sample(&mut self) -> Option<f64> {
            Some(self.0)
        }
    }

    fn config() -> SchedulerConfig {
        SchedulerConfig {
            frame_period: Duration::from_millis(100),
            rates_interval: Duration::from_secs(1),
            signal_interval: Duration::from_secs(2),
            idle_backoff: Duration::from_millis(1),
            client_name: "wall".to_string(),
        }
    }

    fn scheduler(pool: FakePool, surface: CountingSurface, sink: SharedSink) -> Scheduler {
        Scheduler::new(
            Box::new(pool),
            Framebuffer::with_size(4, 4),
            Box::new(surface),
            Box::new(sink),
            config(),
        )
    }

    async fn run_for(s: &mut Scheduler, span: Duration) -> Vec<CycleReport> {
        let end = Instant::now() + span;
        let mut reports = Vec::new();
        while Instant::now() < end {
            reports.push(s.run_cycle().await);
        }
        reports
    }

    #[test]
    fn test_advance_moves_by_exact_periods_and_catches_up() {
        let t0 = Instant::now();
        let period = Duration::from_millis(10);

        let mut next = t0 + period;
        advance(&mut next, period, t0 + period);
        assert_eq!(next, t0 + period * 2);

        // Fell behind by 3.5 periods: skip ahead, but stay on the grid.
        let mut next = t0 + period;
        advance(&mut next, period, t0 + period * 9 / 2);
        assert_eq!(next, t0 + period * 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_sets_up_surface_and_announces_state() {
        // Arrange
        let mut surface = MockSurface::new();
        surface
            .expect_setup()
            .with(eq(80))
            .times(1)
            .returning(|_| Ok(()));
        let sink = SharedSink::default();
        let mut fb = Framebuffer::with_size(2, 2);
        fb.set_brightness(80);
        let mut s = Scheduler::new(
            Box::new(FakePool::default()),
            fb,
            Box::new(surface),
            Box::new(sink.clone()),
            config(),
        );

        // Act
        s.start();

        // Assert
        assert_eq!(sink.on(Channel::Brightness), vec![80.0]);
        assert_eq!(sink.on(Channel::Power), vec![1.0]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_render_tick_flushes_once_per_frame_period() {
        let surface = CountingSurface::default();
        let mut s = scheduler(FakePool::default(), surface.clone(), SharedSink::default());
        s.start();

        let reports = run_for(&mut s, Duration::from_secs(1)).await;

        assert_eq!(surface.flushes(), 10);
        assert_eq!(reports.iter().filter(|r| r.flushed).count(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_queued_commands_drain_before_first_flush() {
        // Arrange: with the clock paused, passes take no time, so the whole
        // queue drains before the first frame is due.
        let pool = FakePool {
            work: (0..500).map(|_| Command::Fill { color: Rgb::RED }).collect(),
            ..FakePool::default()
        };
        let surface = CountingSurface::default();
        let mut s = scheduler(pool, surface.clone(), SharedSink::default());
        s.start();

        // Act
        let report = s.run_cycle().await;

        // Assert
        assert_eq!(report.drained, 500);
        assert!(report.flushed);
        assert_eq!(surface.flushes(), 1);
        assert_eq!(s.framebuffer().get(3, 3), Some(Rgb::RED));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rates_tick_forwards_per_second_rates_and_resets() {
        // Arrange: 10 commands of 4 bytes within the first one-second interval.
        let pool = FakePool {
            work: (0..10).map(|_| Command::Fill { color: Rgb::BLUE }).collect(),
            ..FakePool::default()
        };
        let sink = SharedSink::default();
        let mut s = scheduler(pool, CountingSurface::default(), sink.clone());
        s.start();

        // Act
        run_for(&mut s, Duration::from_secs(2)).await;

        // Assert: first interval saw the traffic, the second saw none.
        assert_eq!(sink.on(Channel::CommandsPerSecond), vec![10.0, 0.0]);
        assert_eq!(sink.on(Channel::BytesPerSecond), vec![40.0, 0.0]);
        assert_eq!(sink.on(Channel::ErrorsPerSecond), vec![0.0, 0.0]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_client_count_published_only_on_transitions() {
        // Arrange
        let pool = FakePool {
            counts: VecDeque::from(vec![0, 0, 1, 1, 1, 2, 2, 0, 0]),
            ..FakePool::default()
        };
        let sink = SharedSink::default();
        let mut s = scheduler(pool, CountingSurface::default(), sink.clone());
        s.start();

        // Act
        for _ in 0..12 {
            s.run_cycle().await;
        }

        // Assert
        assert_eq!(sink.on(Channel::Clients), vec![1.0, 2.0, 0.0]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_control_messages_are_applied_and_acknowledged() {
        // Arrange
        let control = QueueControl(VecDeque::from(vec![
            ControlMessage {
                topic: "wall/set/bri".into(),
                payload: "0".into(),
            },
            ControlMessage {
                topic: "elsewhere/set/on".into(),
                payload: "0".into(),
            },
            ControlMessage {
                topic: "wall/set/on".into(),
                payload: "0".into(),
            },
        ]));
        let sink = SharedSink::default();
        let surface = CountingSurface::default();
        let mut s = scheduler(FakePool::default(), surface.clone(), sink.clone())
            .with_control(Box::new(control));
        s.start();

        // Act
        let report = s.run_cycle().await;

        // Assert: bri 0 clamps to 1, the foreign topic is ignored, power off
        // blanks the flushed frame.
        assert_eq!(s.framebuffer().brightness(), 1);
        assert!(!s.framebuffer().power());
        assert_eq!(sink.on(Channel::Brightness), vec![255.0, 1.0]);
        assert_eq!(sink.on(Channel::Power), vec![1.0, 0.0]);
        assert!(report.flushed);
        assert_eq!(surface.fills(), vec![Rgb::BLACK]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_signal_tick_records_strength_on_its_own_period() {
        let sink = SharedSink::default();
        let mut s = scheduler(FakePool::default(), CountingSurface::default(), sink.clone())
            .with_signal(Box::new(FixedSignal(-56.0)));
        s.start();

        run_for(&mut s, Duration::from_secs(5)).await;

        // Signal every 2 s, rates every 1 s.
        assert_eq!(sink.on(Channel::SignalStrength), vec![-56.0, -56.0]);
        assert_eq!(sink.on(Channel::CommandsPerSecond).len(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_startup_test_shows_sequence_on_surface() {
        let surface = CountingSurface::default();
        let mut s = scheduler(FakePool::default(), surface.clone(), SharedSink::default());

        s.run_startup_test().await;

        assert_eq!(surface.fills(), STARTUP_TEST_SEQUENCE.to_vec());
        assert_eq!(surface.flushes(), STARTUP_TEST_SEQUENCE.len());
    }
}
