//! Shadowing Rater — egui/eframe application.
//!
//! # Architecture
//!
//! [`RaterApp`] is the top-level [`eframe::App`].  It owns two channel
//! endpoints:
//!
//! * `command_tx` — sends [`SessionCommand`] to the session runner.
//! * `event_rx`  — receives [`SessionEvent`] from the runner.
//!
//! The UI is a mirror: it renders whatever the runner last reported and
//! translates clicks into commands.  All experiment rules live in the
//! session core, so nothing here can advance the session on its own.
//!
//! # Screens
//!
//! | Screen | Content |
//! |--------|---------|
//! | `Welcome` | Participant form + consent + start button |
//! | `Rating` | Progress bar, play buttons, 1–5 scale, next button |
//! | `Break` | Countdown, shadowing fact, skip button |
//! | `Completion` | Total time, submission status, backup download |

use std::path::PathBuf;
use std::time::Duration;

use eframe::egui;
use tokio::sync::mpsc;

use crate::config::AppConfig;
use crate::session::{
    Gender, ParticipantForm, Position, Rating, SessionCommand, SessionEvent,
};

// ---------------------------------------------------------------------------
// Break-screen filler content
// ---------------------------------------------------------------------------

/// Shadowing facts shown during rest breaks, one per break in pool order.
const BREAK_FACTS: [&str; 5] = [
    "Shadowing was popularised by the linguist Alexander Arguelles as a \
     synchronous repeat-after-the-speaker technique. Research links it to \
     gains in both fluency and speech perception.",
    "The human brain processes roughly 20–30 phonemes per second — \
     shadowing practice measurably raises that processing speed and \
     strengthens phonological working memory.",
    "Studies report accuracy gains of over 25% on speech-recognition tasks \
     for learners who practise shadowing regularly.",
    "Shadowing is more than imitation: it synchronises auditory input, \
     phonological analysis, memory storage and speech output in real time.",
    "Professional simultaneous interpreters train with shadowing to build \
     fluent, accurate speech processing under time pressure.",
];

// ---------------------------------------------------------------------------
// Screen — UI-side state machine
// ---------------------------------------------------------------------------

/// Which screen is showing, as mirrored from the runner's events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Screen {
    Welcome,
    Rating,
    Break,
    Completion,
}

/// Submission outcome mirror for the completion screen.
#[derive(Debug, Clone, PartialEq)]
enum SubmissionStatus {
    InFlight,
    Success(String),
    Failed(String),
}

// ---------------------------------------------------------------------------
// RaterApp
// ---------------------------------------------------------------------------

/// eframe application — the participant-facing experiment window.
pub struct RaterApp {
    // ── Screen state ─────────────────────────────────────────────────────
    screen: Screen,

    // ── Welcome ──────────────────────────────────────────────────────────
    /// Raw intake form state bound to the text fields.
    form: ParticipantForm,
    /// Validation failure from the last start attempt.
    form_error: Option<String>,

    // ── Rating ───────────────────────────────────────────────────────────
    /// Current (block, pair) as last reported by the runner.
    position: Option<Position>,
    /// Completed-pairs fraction for the progress bar.
    progress: f64,
    /// The currently selected (pending) rating.
    selected: Option<Rating>,
    /// Show the "select a rating first" prompt.
    rating_prompt: bool,
    /// Playback is running; play buttons are disabled.
    playing: bool,

    // ── Break ────────────────────────────────────────────────────────────
    completed_block: u32,
    secs_left: u32,

    // ── Completion ───────────────────────────────────────────────────────
    total_minutes: i64,
    submission: SubmissionStatus,
    backup_path: Option<PathBuf>,
    backup_error: Option<String>,

    /// Internal runner error, shown at the bottom of any screen.
    error_message: Option<String>,

    // ── Channels ─────────────────────────────────────────────────────────
    /// Send commands to the background session runner.
    command_tx: mpsc::Sender<SessionCommand>,
    /// Receive events from the background session runner.
    event_rx: mpsc::Receiver<SessionEvent>,

    // ── Configuration ────────────────────────────────────────────────────
    /// Application configuration (read-only after startup).
    config: AppConfig,
}

impl RaterApp {
    /// Create a new [`RaterApp`].
    ///
    /// * `command_tx` — sender end of the session command channel.
    /// * `event_rx`   — receiver end of the session event channel.
    /// * `config`     — loaded application configuration.
    pub fn new(
        command_tx: mpsc::Sender<SessionCommand>,
        event_rx: mpsc::Receiver<SessionEvent>,
        config: AppConfig,
    ) -> Self {
        Self {
            screen: Screen::Welcome,
            form: ParticipantForm::default(),
            form_error: None,
            position: None,
            progress: 0.0,
            selected: None,
            rating_prompt: false,
            playing: false,
            completed_block: 0,
            secs_left: 0,
            total_minutes: 0,
            submission: SubmissionStatus::InFlight,
            backup_path: None,
            backup_error: None,
            error_message: None,
            command_tx,
            event_rx,
            config,
        }
    }

    // ── Channel polling ──────────────────────────────────────────────────

    /// Drain all pending session events (non-blocking).
    fn poll_events(&mut self) {
        while let Ok(event) = self.event_rx.try_recv() {
            match event {
                SessionEvent::PairLoaded {
                    position, progress, ..
                } => {
                    self.screen = Screen::Rating;
                    self.position = Some(position);
                    self.progress = progress;
                    self.selected = None;
                    self.rating_prompt = false;
                }
                SessionEvent::RatingSelected(rating) => {
                    self.selected = Some(rating);
                    self.rating_prompt = false;
                }
                SessionEvent::RatingRequired => {
                    self.rating_prompt = true;
                }
                SessionEvent::BreakStarted {
                    completed_block,
                    secs_left,
                } => {
                    self.screen = Screen::Break;
                    self.completed_block = completed_block;
                    self.secs_left = secs_left;
                }
                SessionEvent::BreakTick { secs_left } => {
                    self.secs_left = secs_left;
                }
                SessionEvent::Completed {
                    total_duration_mins,
                } => {
                    self.screen = Screen::Completion;
                    self.total_minutes = total_duration_mins;
                    self.submission = SubmissionStatus::InFlight;
                }
                SessionEvent::SubmissionFinished { ok, message } => {
                    self.submission = if ok {
                        SubmissionStatus::Success(message)
                    } else {
                        SubmissionStatus::Failed(message)
                    };
                }
                SessionEvent::PlaybackFinished => {
                    self.playing = false;
                }
                SessionEvent::BackupSaved { path } => {
                    self.backup_path = Some(path);
                    self.backup_error = None;
                }
                SessionEvent::BackupFailed { message } => {
                    self.backup_error = Some(message);
                }
                SessionEvent::Error { message } => {
                    self.error_message = Some(message);
                }
            }
        }
    }

    fn send(&self, cmd: SessionCommand) {
        // try_send: the runner drains quickly and the UI must never block.
        if let Err(e) = self.command_tx.try_send(cmd) {
            log::warn!("command dropped: {e}");
        }
    }

    // ── Screen renderers ─────────────────────────────────────────────────

    /// Render the Welcome screen: intake form + consent + start.
    fn draw_welcome(&mut self, ui: &mut egui::Ui) {
        ui.heading("Shadowing Similarity Rating");
        ui.add_space(4.0);
        ui.label(format!(
            "You will rate {} pairs of audio clips ({} blocks of {}), with a \
             short break between blocks.",
            self.config.session.total_pairs(),
            self.config.session.total_blocks,
            self.config.session.pairs_per_block,
        ));
        ui.add_space(12.0);

        egui::Grid::new("participant-form")
            .num_columns(2)
            .spacing([12.0, 8.0])
            .show(ui, |ui| {
                ui.label("Participant ID");
                ui.text_edit_singleline(&mut self.form.participant_id);
                ui.end_row();

                ui.label("Age");
                ui.text_edit_singleline(&mut self.form.age);
                ui.end_row();

                ui.label("Gender");
                egui::ComboBox::from_id_salt("gender")
                    .selected_text(
                        self.form
                            .gender
                            .map(|g| g.label())
                            .unwrap_or("Select…"),
                    )
                    .show_ui(ui, |ui| {
                        for gender in Gender::ALL {
                            ui.selectable_value(
                                &mut self.form.gender,
                                Some(gender),
                                gender.label(),
                            );
                        }
                    });
                ui.end_row();

                ui.label("Native language");
                ui.text_edit_singleline(&mut self.form.native_language);
                ui.end_row();
            });

        ui.add_space(8.0);
        ui.checkbox(
            &mut self.form.consent,
            "I agree to participate in this experiment and to the collection \
             of my ratings.",
        );

        ui.add_space(12.0);
        let start = ui.add_enabled(
            self.form.consent,
            egui::Button::new(egui::RichText::new("Start experiment").size(16.0)),
        );
        if start.clicked() {
            match self.form.validate(chrono::Utc::now()) {
                Ok(participant) => {
                    self.form_error = None;
                    self.send(SessionCommand::Start(participant));
                }
                Err(e) => self.form_error = Some(e.to_string()),
            }
        }

        if let Some(ref err) = self.form_error {
            ui.add_space(6.0);
            ui.label(
                egui::RichText::new(err.as_str())
                    .color(egui::Color32::from_rgb(255, 136, 68)),
            );
        }
    }

    /// Render the Rating screen: progress, playback, 1–5 scale, next.
    fn draw_rating(&mut self, ui: &mut egui::Ui) {
        if let Some(pos) = self.position {
            ui.horizontal(|ui| {
                ui.label(
                    egui::RichText::new(format!("Block {}", pos.block)).strong(),
                );
                ui.label(format!("Pair {}", pos.pair));
            });
        }
        ui.add(
            egui::ProgressBar::new(self.progress as f32)
                .show_percentage()
                .desired_width(f32::INFINITY),
        );
        ui.add_space(12.0);

        ui.label("Listen to both clips, then rate how similar the shadowing is to the original.");
        ui.add_space(6.0);

        ui.horizontal(|ui| {
            let can_play = !self.playing;
            if ui
                .add_enabled(can_play, egui::Button::new("▶ Play both"))
                .clicked()
            {
                self.playing = true;
                self.send(SessionCommand::PlaySequential);
            }
            if ui
                .add_enabled(can_play, egui::Button::new("▶ Play together"))
                .clicked()
            {
                self.playing = true;
                self.send(SessionCommand::PlaySimultaneous);
            }
            if ui
                .add_enabled(can_play, egui::Button::new("↺ Original"))
                .clicked()
            {
                self.playing = true;
                self.send(SessionCommand::PlayOriginal);
            }
            if ui
                .add_enabled(can_play, egui::Button::new("↺ Shadowing"))
                .clicked()
            {
                self.playing = true;
                self.send(SessionCommand::PlayShadowing);
            }
        });

        ui.add_space(16.0);
        ui.separator();
        ui.add_space(8.0);

        ui.horizontal(|ui| {
            for rating in Rating::ALL {
                let is_selected = self.selected == Some(rating);
                if ui
                    .selectable_label(
                        is_selected,
                        egui::RichText::new(rating.value().to_string()).size(20.0),
                    )
                    .clicked()
                {
                    // Optimistic: the runner echoes RatingSelected next frame.
                    self.selected = Some(rating);
                    self.rating_prompt = false;
                    self.send(SessionCommand::SelectRating(rating));
                }
            }
        });

        ui.add_space(4.0);
        match self.selected {
            Some(rating) => {
                ui.label(format!("{} — {}", rating.value(), rating.label()));
            }
            None => {
                ui.label(
                    egui::RichText::new("Not yet rated")
                        .color(egui::Color32::from_rgb(130, 130, 130)),
                );
            }
        }

        if self.rating_prompt {
            ui.label(
                egui::RichText::new("Please select a rating first.")
                    .color(egui::Color32::from_rgb(255, 136, 68)),
            );
        }

        ui.add_space(12.0);
        let next = ui.add_enabled(
            self.selected.is_some(),
            egui::Button::new(egui::RichText::new("Next pair").size(15.0)),
        );
        if next.clicked() {
            self.send(SessionCommand::NextPair);
        }
    }

    /// Render the Break screen: countdown + fact + skip.
    fn draw_break(&mut self, ui: &mut egui::Ui) {
        ui.heading(format!("Block {} complete — take a break!", self.completed_block));
        ui.add_space(12.0);

        ui.label(
            egui::RichText::new(format!("{}", self.secs_left))
                .size(48.0)
                .color(egui::Color32::from_rgb(68, 136, 255)),
        );
        ui.label("seconds until the next block starts automatically");

        ui.add_space(16.0);
        let fact_idx = (self.completed_block.max(1) as usize - 1) % BREAK_FACTS.len();
        ui.group(|ui| {
            ui.label(egui::RichText::new("Did you know?").strong());
            ui.label(BREAK_FACTS[fact_idx]);
        });

        ui.add_space(16.0);
        if ui.button("Skip break").clicked() {
            self.send(SessionCommand::SkipBreak);
        }
    }

    /// Render the Completion screen: totals, submission status, backup.
    fn draw_completion(&mut self, ui: &mut egui::Ui) {
        ui.heading("Thank you for participating!");
        ui.add_space(8.0);
        ui.label(format!("Total time: {} minutes", self.total_minutes));
        ui.add_space(12.0);

        match &self.submission {
            SubmissionStatus::InFlight => {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label("Uploading data…");
                });
            }
            SubmissionStatus::Success(message) => {
                ui.label(
                    egui::RichText::new(message.as_str())
                        .color(egui::Color32::from_rgb(80, 200, 120)),
                );
            }
            SubmissionStatus::Failed(message) => {
                ui.label(
                    egui::RichText::new(message.as_str())
                        .color(egui::Color32::from_rgb(255, 136, 68)),
                );
            }
        }

        // The backup download is offered after both outcomes.
        if self.submission != SubmissionStatus::InFlight {
            ui.add_space(12.0);
            if ui.button("Download data backup").clicked() {
                self.send(SessionCommand::ExportBackup);
            }
            if let Some(ref path) = self.backup_path {
                ui.label(format!("Backup saved to {}", path.display()));
            }
            if let Some(ref err) = self.backup_error {
                ui.label(
                    egui::RichText::new(format!("Backup failed: {err}"))
                        .color(egui::Color32::from_rgb(255, 136, 68)),
                );
            }
        }
    }
}

// ---------------------------------------------------------------------------
// eframe::App impl
// ---------------------------------------------------------------------------

impl eframe::App for RaterApp {
    /// Called every frame by eframe.  Polls the event channel, then renders
    /// the active screen.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_events();

        // --- Schedule repaints while time-driven state is on screen -------
        match self.screen {
            Screen::Break => {
                // Countdown updates once a second; poll at 4 fps.
                ctx.request_repaint_after(Duration::from_millis(250));
            }
            Screen::Rating if self.playing => {
                ctx.request_repaint_after(Duration::from_millis(250));
            }
            Screen::Completion if self.submission == SubmissionStatus::InFlight => {
                ctx.request_repaint_after(Duration::from_millis(250));
            }
            _ => {}
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            match self.screen {
                Screen::Welcome => self.draw_welcome(ui),
                Screen::Rating => self.draw_rating(ui),
                Screen::Break => self.draw_break(ui),
                Screen::Completion => self.draw_completion(ui),
            }

            if let Some(ref err) = self.error_message {
                ui.add_space(12.0);
                ui.separator();
                ui.label(
                    egui::RichText::new(err.as_str())
                        .color(egui::Color32::from_rgb(255, 68, 68)),
                );
            }
        });
    }

    /// Warn when the window closes mid-session (the collected ratings only
    /// reach the endpoint from the completion screen).
    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        if matches!(self.screen, Screen::Rating | Screen::Break) {
            log::warn!(
                "window closed mid-session at {:?} — collected ratings were not submitted",
                self.position
            );
        } else {
            log::info!("Shadowing Rater closing");
        }
    }
}
