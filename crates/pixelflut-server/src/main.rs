//! Pixelflut server entry point.
//!
//! # Usage
//!
//! ```text
//! pixelflut-server [OPTIONS]
//!
//! Options:
//!   --config    <PATH>  Configuration file [env: PIXELFLUT_CONFIG]
//!   --bind      <IP>    Address every socket binds to
//!   --port      <PORT>  Binary dialect port, 0 disables
//!   --text-port <PORT>  Text dialect port, 0 disables
//!   --width     <N>     Canvas width
//!   --height    <N>     Canvas height
//!   --surface   <KIND>  memory | log | udp-strip
//! ```
//!
//! Command-line values take precedence over the configuration file.
//!
//! # What happens at startup
//!
//! 1. The configuration is loaded, overridden from the command line and
//!    validated.
//! 2. `tracing_subscriber` is initialised.  `RUST_LOG` wins over the
//!    configured `log_level`.
//! 3. One TCP listener per enabled dialect is bound, then the surface, the
//!    telemetry pipeline and the optional control socket are opened.
//! 4. The surface is set up, the optional colour test runs, and the
//!    scheduler runs on a current-thread runtime until Ctrl+C.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use pixelflut_core::{Dialect, Framebuffer};
use pixelflut_server::application::scheduler::{Scheduler, SchedulerConfig};
use pixelflut_server::infrastructure::control::UdpControlSource;
use pixelflut_server::infrastructure::network::connection_manager::ConnectionManager;
use pixelflut_server::infrastructure::network::listener::TcpAcceptor;
use pixelflut_server::infrastructure::storage::config::{load_config, ServerConfig, SurfaceKind};
use pixelflut_server::infrastructure::surface::open_surface;
use pixelflut_server::infrastructure::telemetry::{
    LogPublisher, SmoothingConfig, SmoothingSink, UdpJsonPublisher, WirelessSignal,
};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Collaborative LED canvas server.
#[derive(Debug, Parser)]
#[command(
    name = "pixelflut-server",
    about = "Single-threaded pixelflut server for LED canvases",
    version
)]
struct Cli {
    /// Path of the TOML configuration file.
    ///
    /// Defaults to `config.toml` in the platform configuration directory.
    #[arg(long, env = "PIXELFLUT_CONFIG")]
    config: Option<PathBuf>,

    /// IP address every socket binds to.
    #[arg(long)]
    bind: Option<String>,

    /// TCP port of the binary dialect.  0 disables it.
    #[arg(long)]
    port: Option<u16>,

    /// TCP port of the text dialect.  0 disables it.
    #[arg(long)]
    text_port: Option<u16>,

    #[arg(long)]
    width: Option<u16>,

    #[arg(long)]
    height: Option<u16>,

    /// Display back-end: memory, log or udp-strip.
    #[arg(long)]
    surface: Option<SurfaceKind>,
}

impl Cli {
    /// Overrides `cfg` with every option given on the command line.
    fn apply_to(&self, cfg: &mut ServerConfig) {
        if let Some(bind) = &self.bind {
            cfg.server.bind_address = bind.clone();
        }
        if let Some(port) = self.port {
            cfg.server.binary_port = port;
        }
        if let Some(port) = self.text_port {
            cfg.server.text_port = port;
        }
        if let Some(width) = self.width {
            cfg.canvas.width = width;
        }
        if let Some(height) = self.height {
            cfg.canvas.height = height;
        }
        if let Some(surface) = self.surface {
            cfg.display.surface = surface;
        }
    }

    /// Loads the configuration file and applies the overrides.
    fn resolve_config(&self) -> anyhow::Result<ServerConfig> {
        let mut cfg = load_config(self.config.as_deref()).context("failed to load configuration")?;
        self.apply_to(&mut cfg);
        cfg.validate().context("invalid configuration")?;
        Ok(cfg)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = cli.resolve_config()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&cfg.server.log_level)),
        )
        .init();

    info!(
        "pixelflut server starting: {}x{} canvas, {:?} surface",
        cfg.canvas.width, cfg.canvas.height, cfg.display.surface
    );

    let mut scheduler = build_scheduler(&cfg).await?;

    scheduler.start();
    if cfg.display.startup_test {
        scheduler.run_startup_test().await;
    }

    tokio::select! {
        () = scheduler.run() => {}
        result = tokio::signal::ctrl_c() => match result {
            Ok(()) => info!("received Ctrl+C, shutting down"),
            Err(e) => error!("failed to listen for Ctrl+C signal: {e}"),
        },
    }

    info!("pixelflut server stopped");
    Ok(())
}

/// Binds every socket and assembles the scheduler described by `cfg`.
async fn build_scheduler(cfg: &ServerConfig) -> anyhow::Result<Scheduler> {
    let topology = cfg.canvas.topology();

    let mut pool = ConnectionManager::new(
        cfg.canvas.width,
        cfg.canvas.height,
        cfg.server.read_timeout(),
    );
    let listeners = [
        (cfg.server.binary_port(), Dialect::Binary),
        (cfg.server.text_port(), Dialect::Text),
    ];
    for (port, dialect) in listeners {
        let Some(port) = port else { continue };
        let addr = cfg.server.socket_addr(port)?;
        let acceptor = TcpAcceptor::bind(addr, dialect)
            .await
            .with_context(|| format!("failed to start the {dialect} listener"))?;
        pool.add_acceptor(Box::new(acceptor));
    }

    let opened = open_surface(&cfg.display, &topology).context("failed to open surface")?;

    let mut telemetry = SmoothingSink::new(
        cfg.server.client_name.clone(),
        SmoothingConfig {
            sensitivity: cfg.telemetry.sensitivity,
            rates_publish_every: cfg.telemetry.rates_publish_every,
            signal_publish_every: cfg.telemetry.signal_publish_every,
        },
    )
    .with_publisher(Box::new(LogPublisher));
    if let Some(target) = cfg.telemetry.publish_addr()? {
        match UdpJsonPublisher::new(target) {
            Ok(publisher) => telemetry = telemetry.with_publisher(Box::new(publisher)),
            Err(e) => warn!("telemetry to {target} disabled: {e}"),
        }
    }

    let mut framebuffer = Framebuffer::new(topology);
    framebuffer.set_brightness(cfg.display.initial_brightness());
    framebuffer.set_power(cfg.display.power);

    let mut scheduler = Scheduler::new(
        Box::new(pool),
        framebuffer,
        opened.surface,
        Box::new(telemetry),
        SchedulerConfig {
            frame_period: cfg.display.frame_period(),
            rates_interval: cfg.telemetry.rates_interval(),
            signal_interval: cfg.telemetry.signal_interval(),
            idle_backoff: cfg.server.idle_backoff(),
            client_name: cfg.server.client_name.clone(),
        },
    )
    .with_signal(Box::new(WirelessSignal::new(
        cfg.telemetry.wireless_interface.clone(),
    )));

    if let Some(port) = cfg.control.port {
        let addr = cfg.server.socket_addr(port)?;
        let control = UdpControlSource::bind(addr)
            .await
            .context("failed to start the remote configuration listener")?;
        scheduler = scheduler.with_control(Box::new(control));
    }

    Ok(scheduler)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
