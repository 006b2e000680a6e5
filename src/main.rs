//! Entry point: media-keysd, a user daemon that reacts to X11 media keys.
//!
//! # Startup sequence
//!
//! 1. Parse the command line and initialise logging.
//! 2. Load [`AppConfig`] (defaults when no settings file exists).
//! 3. Connect to the X server.
//! 4. Open the ALSA mixer and look up the backlight property; a device that
//!    is disabled in the config, or absent, simply has no keys grabbed.
//! 5. Grab the media keys on the root window.
//! 6. Spawn the key listener thread.
//! 7. Run the daemon on a current-thread tokio runtime until SIGINT or
//!    SIGTERM.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use x11rb::rust_connection::RustConnection;

use media_keysd::{
    audio::Volume,
    backlight::Backlight,
    config::AppConfig,
    daemon::Daemon,
    keys::{KeyGrabber, KeyListener, MediaKey},
};

/// Adjusts volume and backlight brightness when media keys are pressed.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Settings file [default: ~/.config/media-keysd/settings.toml]
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,

    /// Log each adjustment (same as RUST_LOG=debug)
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1. Logging
    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    // 2. Configuration
    let config = match &cli.config {
        Some(path) => AppConfig::load_required(path)?,
        None => AppConfig::load()?,
    };

    if cli.print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    log::info!("media-keysd starting up");

    // 3. X server
    let (conn, screen_num) = x11rb::connect(None).context("connecting to X server")?;
    let conn = Arc::new(conn);

    // 4. Devices
    let volume = open_volume(&config)?;
    let backlight = open_backlight(&config, &conn, screen_num)?;

    if volume.is_none() && backlight.is_none() {
        bail!("nothing to control: audio and backlight are both unavailable");
    }

    // 5. Grabs, only for the devices we actually have
    let bindings: Vec<_> = config
        .keys
        .bindings()?
        .into_iter()
        .filter(|(key, _)| wanted(*key, volume.is_some(), backlight.is_some()))
        .collect();
    let keymap = KeyGrabber::new(&*conn, screen_num)
        .grab(&bindings)
        .context("grabbing media keys")?;
    if keymap.is_empty() {
        bail!("none of the configured media keys exist on this keyboard");
    }
    log::info!("listening on {} keycode(s)", keymap.len());

    // 6. Listener thread
    let (key_tx, key_rx) = mpsc::channel::<MediaKey>(16);
    let _listener = KeyListener::start(Arc::clone(&conn), keymap, key_tx)
        .context("spawning key listener thread")?;

    // 7. Dispatch loop.  A current-thread runtime keeps the ALSA mixer,
    //    which is not Send, on this thread.
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("building tokio runtime")?;

    rt.block_on(async {
        let shutdown = shutdown_signal()?;
        let mut daemon = Daemon::new(volume, backlight, config.step);
        daemon.run(key_rx, shutdown).await;
        Ok::<(), anyhow::Error>(())
    })
}

fn open_volume(config: &AppConfig) -> Result<Option<Volume>> {
    if !config.audio.enabled {
        log::info!("audio control disabled");
        return Ok(None);
    }
    let volume = Volume::open(&config.audio.card, &config.audio.element)?;
    log::info!(
        "controlling ALSA element {} on card {}",
        volume.element(),
        config.audio.card
    );
    Ok(Some(volume))
}

fn open_backlight(
    config: &AppConfig,
    conn: &Arc<RustConnection>,
    screen_num: usize,
) -> Result<Option<Backlight>> {
    if !config.backlight.enabled {
        log::info!("backlight control disabled");
        return Ok(None);
    }
    let backlight = Backlight::new(Arc::clone(conn), screen_num, &config.backlight.property)
        .context("no backlight")?;
    match &backlight {
        Some(_) => log::info!("controlling RandR property {}", config.backlight.property),
        None => log::warn!(
            "X server has no {:?} output property; brightness keys not grabbed",
            config.backlight.property
        ),
    }
    Ok(backlight)
}

fn wanted(key: MediaKey, have_audio: bool, have_backlight: bool) -> bool {
    if key.is_audio() {
        have_audio
    } else {
        have_backlight
    }
}

/// Resolves on SIGINT or SIGTERM.
fn shutdown_signal() -> Result<impl std::future::Future<Output = ()>> {
    let mut interrupt = signal(SignalKind::interrupt()).context("installing SIGINT handler")?;
    let mut terminate = signal(SignalKind::terminate()).context("installing SIGTERM handler")?;

    Ok(async move {
        tokio::select! {
            _ = interrupt.recv() => log::debug!("received SIGINT"),
            _ = terminate.recv() => log::debug!("received SIGTERM"),
        }
    })
}
