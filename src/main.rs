//! Application entry point — Shadowing Rater.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (returns default on first run).
//! 3. Create [`tokio`] runtime (multi-thread, 2 workers).
//! 4. Build the clip player ([`CpalPlayer`]) and submitter
//!    ([`FormSubmitter`]) from config.
//! 5. Create the command / event channels.
//! 6. Spawn the session runner on the tokio runtime.
//! 7. Run [`eframe::run_native`] — blocks the main thread until the window
//!    is closed.

use std::sync::Arc;

use tokio::sync::mpsc;

use shadowing_rater::{
    app::RaterApp,
    audio::{ClipPlayer, CpalPlayer},
    config::AppConfig,
    session::{SessionCommand, SessionEvent, SessionRunner},
    submit::{BackupWriter, FormSubmitter, Submitter},
};

use eframe::egui;

// ---------------------------------------------------------------------------
// Native options builder
// ---------------------------------------------------------------------------

fn native_options(config: &AppConfig) -> eframe::NativeOptions {
    let mut vp = egui::ViewportBuilder::default()
        .with_inner_size([760.0, 600.0])
        .with_min_inner_size([640.0, 480.0]);

    if config.ui.start_maximized {
        vp = vp.with_maximized(true);
    }

    if let Some((x, y)) = config.ui.window_position {
        vp = vp.with_position(egui::pos2(x, y));
    }

    eframe::NativeOptions {
        viewport: vp,
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> eframe::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Shadowing Rater starting up");

    // 2. Configuration
    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });
    log::info!(
        "session shape: {} blocks × {} pairs, {}s breaks",
        config.session.total_blocks,
        config.session.pairs_per_block,
        config.session.break_secs
    );

    // 3. Tokio runtime (2 worker threads — playback and submission each take one)
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("failed to create tokio runtime");

    // 4. Player + submitter
    let player: Arc<dyn ClipPlayer> =
        Arc::new(CpalPlayer::new(config.audio.output_device.clone()));
    let submitter: Arc<dyn Submitter> = Arc::new(FormSubmitter::from_config(&config.form));
    let backup = BackupWriter::new(config.export.resolved_dir());

    // 5. Channel setup
    let (command_tx, command_rx) = mpsc::channel::<SessionCommand>(16);
    let (event_tx, event_rx) = mpsc::channel::<SessionEvent>(32);

    // 6. Spawn the session runner onto the tokio runtime
    let runner = SessionRunner::new(config.clone(), player, submitter, backup, event_tx);
    rt.spawn(runner.run(command_rx));

    // 7. Build the egui app and run it (blocks until the window is closed)
    let app = RaterApp::new(command_tx, event_rx, config.clone());
    let options = native_options(&config);

    eframe::run_native(
        "Shadowing Rater",
        options,
        Box::new(move |_cc| Ok(Box::new(app))),
    )
}
