//! minilab-mutesync - Rust implementation
//!
//! Mirrors Voicemeeter mute state onto Arturia MiniLab mkII pad LEDs.

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use minilab_mutesync::blink::BlinkScheduler;
use minilab_mutesync::config::{AppConfig, Mode};
use minilab_mutesync::controller::FeedbackController;
use minilab_mutesync::device;
#[cfg(not(windows))]
use minilab_mutesync::error::FeedbackError;
use minilab_mutesync::leds::PadLeds;
use minilab_mutesync::mixer::{ConsoleMixer, MixerSource};
use minilab_mutesync::store::ButtonStore;

/// MiniLab MuteSync - mixer mute state on the pad backlights
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// List available MIDI ports
    #[arg(long)]
    list_ports: bool,

    /// Override the operating mode from the config file
    #[arg(long, value_enum)]
    mode: Option<Mode>,

    /// Use the console mixer stub instead of the Voicemeeter Remote API
    #[arg(long)]
    console_mixer: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(&args.log_level)?;

    info!("Starting minilab-mutesync...");

    // Handle list ports
    if args.list_ports {
        device::list_ports_formatted();
        return Ok(());
    }

    // Load configuration
    let mut config = AppConfig::load(&args.config).await?;
    if let Some(mode) = args.mode {
        config.mode = mode;
    }
    info!(
        "Configuration loaded: {} buttons, {:?} mode",
        config.buttons.len(),
        config.mode
    );

    // Set up shutdown signal
    let shutdown_signal = shutdown_signal();

    match config.mode {
        Mode::Mirror => run_mirror(config, args.console_mixer, shutdown_signal).await?,
        Mode::Direct => run_direct(config, shutdown_signal).await?,
    }

    info!("minilab-mutesync shutdown complete");
    Ok(())
}

/// Build the shared core: state store, LED emitter, blink scheduler,
/// feedback controller.
fn build_core(config: &AppConfig) -> (Arc<ButtonStore>, PadLeds, Arc<BlinkScheduler>, FeedbackController) {
    let store = Arc::new(ButtonStore::new(&config.buttons));
    let leds = PadLeds::disconnected();
    let blink = Arc::new(BlinkScheduler::new(
        store.clone(),
        leds.clone(),
        config.timing.blink_half_period(),
    ));
    let controller = FeedbackController::new(
        store.clone(),
        leds.clone(),
        blink.clone(),
        config.timing.release_settle(),
    );
    (store, leds, blink, controller)
}

/// Select the mixer backend for mirror mode.
fn build_mixer(config: &AppConfig, console: bool) -> Result<Arc<dyn MixerSource>> {
    if console {
        let strip_count = config
            .buttons
            .iter()
            .map(|b| b.strip + 1)
            .max()
            .unwrap_or(0);
        return Ok(Arc::new(ConsoleMixer::new(strip_count)));
    }

    #[cfg(windows)]
    {
        Ok(Arc::new(
            minilab_mutesync::mixer::VoicemeeterRemote::new()?,
        ))
    }

    #[cfg(not(windows))]
    {
        Err(FeedbackError::BackendUnavailable(
            "the Voicemeeter Remote API only exists on Windows; use --console-mixer or direct mode"
                .into(),
        )
        .into())
    }
}

/// Mirror mode: poll the mixer and drive the LEDs from its mute state.
async fn run_mirror(
    config: AppConfig,
    console_mixer: bool,
    shutdown: impl std::future::Future<Output = ()>,
) -> Result<()> {
    let (store, leds, blink, controller) = build_core(&config);

    // Mixer session comes up before any hardware state is touched
    let mixer = build_mixer(&config, console_mixer)?;
    mixer
        .login()
        .await
        .with_context(|| format!("Mixer backend '{}' login failed", mixer.name()))?;

    // Open the controller; on failure, close the mixer session again
    let output = match device::open_output(&config.midi.output_port) {
        Ok(connection) => connection,
        Err(e) => {
            let _ = mixer.logout().await;
            return Err(e);
        },
    };
    leds.attach(Box::new(output));

    // Paint resting colors, then sync once with the live mixer state
    controller.paint_defaults().await;
    controller.reconcile_all(mixer.as_ref()).await;

    info!(
        "✅ Mirroring '{}' mute state onto {} pads",
        mixer.name(),
        store.len()
    );

    let mut poll = tokio::time::interval(config.timing.poll_interval());
    poll.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = poll.tick() => {
                match mixer.is_dirty().await {
                    Ok(true) => controller.reconcile_all(mixer.as_ref()).await,
                    Ok(false) => {},
                    Err(e) => warn!("Mixer dirty-poll failed: {}", e),
                }
            }

            _ = &mut shutdown => {
                info!("Shutdown signal received, stopping mirror loop");
                break;
            }
        }
    }

    // Join every blink task before the device handle goes away
    blink.shutdown().await;
    leds.detach();

    if let Err(e) = mixer.logout().await {
        warn!("Mixer logout failed: {}", e);
    }

    Ok(())
}

/// Direct mode: the controller's own pads toggle mute state.
async fn run_direct(
    config: AppConfig,
    shutdown: impl std::future::Future<Output = ()>,
) -> Result<()> {
    let (store, leds, blink, controller) = build_core(&config);

    let output = device::open_output(&config.midi.output_port)?;
    leds.attach(Box::new(output));

    // Pad events flow from the midir callback into this queue
    let (event_tx, mut event_rx) = mpsc::channel(1000);
    let input = device::open_input(&config.midi.input_port, event_tx)?;

    controller.paint_defaults().await;

    info!(
        "✅ Listening for pad presses on '{}' ({} pads)",
        config.midi.input_port,
        store.len()
    );

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            Some(event) = event_rx.recv() => {
                debug!(
                    "Pad event: {:02X} {:02X} {:02X}",
                    event.status, event.data1, event.data2
                );
                controller.on_note_event(event).await;
            }

            _ = &mut shutdown => {
                info!("Shutdown signal received, stopping input loop");
                break;
            }
        }
    }

    // Stop producing before tearing down the output side
    drop(input);
    blink.shutdown().await;
    leds.detach();

    Ok(())
}

fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false),
        )
        .init();

    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C signal handler");
    info!("Shutdown signal received");
}
