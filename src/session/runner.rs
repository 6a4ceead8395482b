//! Session runner — drives the experiment flow from UI commands.
//!
//! [`SessionRunner`] owns the [`SessionState`] and responds to
//! [`SessionCommand`]s received over a `tokio::sync::mpsc` channel, emitting
//! [`SessionEvent`]s the UI renders.
//!
//! # Flow
//!
//! ```text
//! SessionCommand::Start(participant)
//!   └─▶ Welcome → Running, emit PairLoaded (1,1)
//!
//! SessionCommand::NextPair
//!   ├─ no pending rating → emit RatingRequired (no state change)
//!   ├─ mid-block         → emit PairLoaded (next pair)
//!   ├─ end of block      → start countdown, emit BreakStarted
//!   └─ final pair        → emit Completed, submit once, emit SubmissionFinished
//!
//! countdown tick (only while Resting)
//!   └─ 0 left → resume, emit PairLoaded;  otherwise emit BreakTick
//!
//! SessionCommand::SkipBreak
//!   └─▶ clear countdown, resume, emit PairLoaded
//! ```
//!
//! The countdown is owned by this single task and dropped the moment a skip
//! resumes the session, so the timeout and the skip can never both fire the
//! Resting → Running edge.  Blocking work (clip playback, the backup file
//! write) is pushed onto `tokio::task::spawn_blocking` so the async runtime
//! never stalls.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, Interval};

use crate::audio::ClipPlayer;
use crate::config::AppConfig;
use crate::submit::{BackupWriter, Submitter};

use super::manifest::{Manifest, Position};
use super::participant::Participant;
use super::report::ExperimentReport;
use super::state::{Advance, Rating, SessionState, StateError};

// ---------------------------------------------------------------------------
// SessionCommand
// ---------------------------------------------------------------------------

/// Commands sent from the UI to the session runner.
#[derive(Debug, Clone)]
pub enum SessionCommand {
    /// Begin the session with an already-validated participant.
    Start(Participant),
    /// Select (or re-select) the rating for the current pair.
    SelectRating(Rating),
    /// Record the pending rating and move to the next pair / break / end.
    NextPair,
    /// Replay the original clip.
    PlayOriginal,
    /// Replay the shadowing clip.
    PlayShadowing,
    /// Play original then shadowing, with the configured gap between them.
    PlaySequential,
    /// Play both clips at once, mixed.
    PlaySimultaneous,
    /// End the rest break early.
    SkipBreak,
    /// Write the local backup export (Complete phase only).
    ExportBackup,
}

// ---------------------------------------------------------------------------
// SessionEvent
// ---------------------------------------------------------------------------

/// Events delivered from the runner to the UI.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A pair is ready for rating at `position`.
    PairLoaded {
        position: Position,
        audio_id: String,
        /// Completed-pairs fraction for the progress bar, in `[0, 1)`.
        progress: f64,
    },
    /// The pending rating changed.
    RatingSelected(Rating),
    /// Advance was requested with no rating selected — prompt the user.
    RatingRequired,
    /// A rest break began; the countdown starts at `secs_left`.
    BreakStarted {
        completed_block: u32,
        secs_left: u32,
    },
    /// One second of the rest break elapsed.
    BreakTick { secs_left: u32 },
    /// All pairs rated; the session is over.
    Completed { total_duration_mins: i64 },
    /// The fire-once submission finished (successfully or not).
    SubmissionFinished { ok: bool, message: String },
    /// Sequential / simultaneous / replay playback ended (even on failure —
    /// a missing clip is a logged warning, not a session error).
    PlaybackFinished,
    /// The backup export was written.
    BackupSaved { path: PathBuf },
    /// The backup export failed.
    BackupFailed { message: String },
    /// Internal error that should never occur through normal UI flow.
    Error { message: String },
}

// ---------------------------------------------------------------------------
// PlaybackJob
// ---------------------------------------------------------------------------

/// What to play on the blocking thread pool.
enum PlaybackJob {
    Single(PathBuf),
    Sequential {
        first: PathBuf,
        second: PathBuf,
        gap: Duration,
    },
    Mixed(PathBuf, PathBuf),
}

// ---------------------------------------------------------------------------
// SessionRunner
// ---------------------------------------------------------------------------

/// Drives the complete experiment session.
///
/// Create with [`SessionRunner::new`], then call [`run`](Self::run) inside a
/// tokio task.
pub struct SessionRunner {
    state: SessionState,
    config: AppConfig,
    player: Arc<dyn ClipPlayer>,
    submitter: Arc<dyn Submitter>,
    backup: BackupWriter,
    event_tx: mpsc::Sender<SessionEvent>,
    /// Assembled once on completion; reused by every backup export.
    report: Option<ExperimentReport>,
    /// Seconds remaining in the current rest break.
    break_secs_left: u32,
}

/// What woke the runner loop: a command, or a countdown tick.
enum Input {
    Command(Option<SessionCommand>),
    Tick,
}

impl SessionRunner {
    /// Create a new runner over a freshly generated manifest.
    ///
    /// # Arguments
    ///
    /// * `config`    — application configuration (session shape, audio, form).
    /// * `player`    — clip player (e.g. `CpalPlayer`).
    /// * `submitter` — submission backend (e.g. `FormSubmitter`).
    /// * `backup`    — backup writer targeting the export directory.
    /// * `event_tx`  — sender half of the UI event channel.
    pub fn new(
        config: AppConfig,
        player: Arc<dyn ClipPlayer>,
        submitter: Arc<dyn Submitter>,
        backup: BackupWriter,
        event_tx: mpsc::Sender<SessionEvent>,
    ) -> Self {
        let manifest = Manifest::generate(&config.session, &config.audio);
        Self {
            state: SessionState::new(manifest),
            config,
            player,
            submitter,
            backup,
            event_tx,
            report: None,
            break_secs_left: 0,
        }
    }

    // -----------------------------------------------------------------------
    // Main async loop
    // -----------------------------------------------------------------------

    /// Run the runner until `command_rx` is closed.
    ///
    /// This is an `async fn` and should be spawned as a tokio task from
    /// `main()`.  It never returns while the channel is open.
    pub async fn run(mut self, mut command_rx: mpsc::Receiver<SessionCommand>) {
        // The countdown lives only while Resting; `None` means no break is
        // in progress and the loop blocks solely on commands.
        let mut break_timer: Option<Interval> = None;

        loop {
            let input = match break_timer.as_mut() {
                Some(timer) => tokio::select! {
                    cmd = command_rx.recv() => Input::Command(cmd),
                    _ = timer.tick() => Input::Tick,
                },
                None => Input::Command(command_rx.recv().await),
            };

            match input {
                Input::Command(None) => break,
                Input::Command(Some(cmd)) => self.handle_command(cmd, &mut break_timer).await,
                Input::Tick => self.handle_tick(&mut break_timer).await,
            }
        }

        log::info!("session runner: command channel closed, shutting down");
    }

    // -----------------------------------------------------------------------
    // Command handling
    // -----------------------------------------------------------------------

    async fn handle_command(&mut self, cmd: SessionCommand, break_timer: &mut Option<Interval>) {
        match cmd {
            SessionCommand::Start(participant) => {
                let id = participant.id.clone();
                match self.state.start(participant) {
                    Ok(()) => {
                        log::info!("session started for participant {id}");
                        self.load_current_pair().await;
                    }
                    Err(e) => self.send_error(e).await,
                }
            }

            SessionCommand::SelectRating(rating) => match self.state.select_rating(rating) {
                Ok(()) => {
                    log::debug!("rating {} pending at {}", rating.value(), self.state.position());
                    self.send(SessionEvent::RatingSelected(rating)).await;
                }
                Err(e) => log::warn!("rating ignored: {e}"),
            },

            SessionCommand::NextPair => match self.state.advance(Utc::now()) {
                Ok(Advance::Continue) => self.load_current_pair().await,
                Ok(Advance::Break { completed_block }) => {
                    self.begin_break(completed_block, break_timer).await;
                }
                Ok(Advance::Complete) => self.complete().await,
                Err(StateError::RatingRequired) => {
                    self.send(SessionEvent::RatingRequired).await;
                }
                Err(e) => log::warn!("advance ignored: {e}"),
            },

            SessionCommand::SkipBreak => match self.state.resume() {
                Ok(()) => {
                    // Dropping the interval cancels any pending expiry, so
                    // the skip is the only transition that fires.
                    *break_timer = None;
                    log::debug!("rest break skipped");
                    self.load_current_pair().await;
                }
                Err(e) => log::warn!("skip ignored: {e}"),
            },

            SessionCommand::PlayOriginal => {
                if let Some(path) = self.clip_paths().map(|(original, _)| original) {
                    self.play(PlaybackJob::Single(path)).await;
                }
            }

            SessionCommand::PlayShadowing => {
                if let Some(path) = self.clip_paths().map(|(_, shadowing)| shadowing) {
                    self.play(PlaybackJob::Single(path)).await;
                }
            }

            SessionCommand::PlaySequential => {
                if let Some((first, second)) = self.clip_paths() {
                    let gap = Duration::from_millis(self.config.audio.clip_gap_ms);
                    self.play(PlaybackJob::Sequential { first, second, gap }).await;
                }
            }

            SessionCommand::PlaySimultaneous => {
                if let Some((a, b)) = self.clip_paths() {
                    self.play(PlaybackJob::Mixed(a, b)).await;
                }
            }

            SessionCommand::ExportBackup => self.export_backup().await,
        }
    }

    // -----------------------------------------------------------------------
    // Countdown
    // -----------------------------------------------------------------------

    async fn begin_break(&mut self, completed_block: u32, break_timer: &mut Option<Interval>) {
        let secs = self.config.session.break_secs;
        log::info!("block {completed_block} complete, {secs}s rest break");

        if secs == 0 {
            // Zero-length break: resume straight away, no countdown.
            if self.state.resume().is_ok() {
                self.load_current_pair().await;
            }
            return;
        }

        self.break_secs_left = secs;
        let period = Duration::from_secs(1);
        *break_timer = Some(interval_at(Instant::now() + period, period));
        self.send(SessionEvent::BreakStarted {
            completed_block,
            secs_left: secs,
        })
        .await;
    }

    async fn handle_tick(&mut self, break_timer: &mut Option<Interval>) {
        self.break_secs_left = self.break_secs_left.saturating_sub(1);

        if self.break_secs_left > 0 {
            self.send(SessionEvent::BreakTick {
                secs_left: self.break_secs_left,
            })
            .await;
            return;
        }

        *break_timer = None;
        match self.state.resume() {
            Ok(()) => {
                log::debug!("rest break expired");
                self.load_current_pair().await;
            }
            // Unreachable while the timer is owned by this loop; the guard
            // mirrors the state machine's own protection.
            Err(e) => log::warn!("countdown expiry ignored: {e}"),
        }
    }

    // -----------------------------------------------------------------------
    // Completion / submission / export
    // -----------------------------------------------------------------------

    /// Terminal transition: assemble the report, submit it exactly once, and
    /// surface the outcome.  Submission failure never propagates — the
    /// backup export remains available either way.
    async fn complete(&mut self) {
        let completed_at = Utc::now();

        let participant = match self.state.participant() {
            Some(p) => p.clone(),
            None => {
                // Unreachable: Complete is only reachable through start().
                self.send(SessionEvent::Error {
                    message: "session completed without a participant record".into(),
                })
                .await;
                return;
            }
        };

        let report = ExperimentReport::assemble(
            participant,
            self.state.ratings().to_vec(),
            self.config.session.clone(),
            completed_at,
        );

        log::info!(
            "session complete: {} ratings in {} min",
            report.ratings.len(),
            report.total_duration_mins
        );
        self.send(SessionEvent::Completed {
            total_duration_mins: report.total_duration_mins,
        })
        .await;

        let outcome = self.submitter.submit(&report).await;
        self.report = Some(report);

        match outcome {
            Ok(()) => {
                self.send(SessionEvent::SubmissionFinished {
                    ok: true,
                    message: "Data uploaded successfully.".into(),
                })
                .await;
            }
            Err(e) => {
                log::error!("submission failed: {e}");
                self.send(SessionEvent::SubmissionFinished {
                    ok: false,
                    message: format!("Upload failed ({e}) — please download the backup."),
                })
                .await;
            }
        }
    }

    async fn export_backup(&mut self) {
        let Some(report) = self.report.clone() else {
            self.send(SessionEvent::Error {
                message: "backup is only available after the session completes".into(),
            })
            .await;
            return;
        };

        let writer = self.backup.clone();
        let result = tokio::task::spawn_blocking(move || writer.write(&report)).await;

        match result {
            Ok(Ok(path)) => {
                log::info!("backup written to {}", path.display());
                self.send(SessionEvent::BackupSaved { path }).await;
            }
            Ok(Err(e)) => {
                log::error!("backup export failed: {e}");
                self.send(SessionEvent::BackupFailed {
                    message: e.to_string(),
                })
                .await;
            }
            Err(e) => {
                log::error!("backup task panicked: {e}");
                self.send(SessionEvent::BackupFailed {
                    message: e.to_string(),
                })
                .await;
            }
        }
    }

    // -----------------------------------------------------------------------
    // Playback
    // -----------------------------------------------------------------------

    /// Paths of the current pair, or `None` outside the manifest (logged).
    fn clip_paths(&self) -> Option<(PathBuf, PathBuf)> {
        match self.state.current_pair() {
            Ok(pair) => Some((pair.original.clone(), pair.shadowing.clone())),
            Err(e) => {
                log::warn!("no current pair to play: {e}");
                None
            }
        }
    }

    /// Run `job` on the blocking pool and wait for it to finish.
    ///
    /// Playback failure (missing or undecodable clip) is logged and
    /// otherwise ignored; the experiment continues without the clip having
    /// played.
    async fn play(&mut self, job: PlaybackJob) {
        let player = Arc::clone(&self.player);

        let result = tokio::task::spawn_blocking(move || match job {
            PlaybackJob::Single(path) => player.play(&path),
            PlaybackJob::Sequential { first, second, gap } => {
                player.play(&first)?;
                std::thread::sleep(gap);
                player.play(&second)
            }
            PlaybackJob::Mixed(a, b) => player.play_mixed(&a, &b),
        })
        .await;

        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => log::warn!("playback failed: {e}"),
            Err(e) => log::warn!("playback task panicked: {e}"),
        }

        self.send(SessionEvent::PlaybackFinished).await;
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    async fn load_current_pair(&mut self) {
        match self.state.current_pair() {
            Ok(pair) => {
                let event = SessionEvent::PairLoaded {
                    position: self.state.position(),
                    audio_id: pair.id.clone(),
                    progress: self.state.progress(),
                };
                log::debug!("pair {} loaded", pair.id);
                self.send(event).await;
            }
            Err(e) => self.send_error(e).await,
        }
    }

    async fn send(&self, event: SessionEvent) {
        // Ignore send errors; the UI may have shut down first.
        let _ = self.event_tx.send(event).await;
    }

    async fn send_error(&self, e: StateError) {
        log::error!("session error: {e}");
        self.send(SessionEvent::Error {
            message: e.to_string(),
        })
        .await;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::MockPlayer;
    use crate::config::{AppConfig, SessionConfig};
    use crate::session::participant::{Gender, ParticipantForm};
    use crate::submit::MockSubmitter;
    use tempfile::tempdir;

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn small_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.session = SessionConfig {
            total_blocks: 2,
            pairs_per_block: 2,
            break_secs: 60,
        };
        config.audio.clip_gap_ms = 0;
        config
    }

    fn participant() -> Participant {
        ParticipantForm {
            participant_id: "P123".into(),
            age: "22".into(),
            gender: Some(Gender::Male),
            native_language: "Mandarin".into(),
            consent: true,
        }
        .validate(Utc::now())
        .expect("valid form")
    }

    struct Harness {
        cmd_tx: mpsc::Sender<SessionCommand>,
        cmd_rx: Option<mpsc::Receiver<SessionCommand>>,
        event_rx: mpsc::Receiver<SessionEvent>,
        runner: Option<SessionRunner>,
        submitter: Arc<MockSubmitter>,
        player: Arc<MockPlayer>,
        backup_dir: tempfile::TempDir,
    }

    fn harness_with(config: AppConfig, submitter: MockSubmitter, player: MockPlayer) -> Harness {
        let (cmd_tx, cmd_rx) = mpsc::channel(64);
        let (event_tx, event_rx) = mpsc::channel(64);
        let backup_dir = tempdir().expect("temp dir");

        let submitter = Arc::new(submitter);
        let player = Arc::new(player);

        let runner = SessionRunner::new(
            config,
            Arc::clone(&player) as Arc<dyn ClipPlayer>,
            Arc::clone(&submitter) as Arc<dyn Submitter>,
            BackupWriter::new(backup_dir.path()),
            event_tx,
        );

        Harness {
            cmd_tx,
            cmd_rx: Some(cmd_rx),
            event_rx,
            runner: Some(runner),
            submitter,
            player,
            backup_dir,
        }
    }

    fn harness() -> Harness {
        harness_with(small_config(), MockSubmitter::ok(), MockPlayer::ok())
    }

    impl Harness {
        /// Send every command, close the channel, run the loop to exit, and
        /// return all emitted events.
        async fn run_script(&mut self, commands: Vec<SessionCommand>) -> Vec<SessionEvent> {
            for cmd in commands {
                self.cmd_tx.send(cmd).await.expect("send command");
            }
            let cmd_rx = self.cmd_rx.take().expect("script already ran");
            let runner = self.runner.take().expect("script already ran");

            // Swap in a dummy sender so the real channel closes and run()
            // terminates once the script is drained.
            drop(std::mem::replace(
                &mut self.cmd_tx,
                mpsc::channel::<SessionCommand>(1).0,
            ));

            runner.run(cmd_rx).await;

            let mut events = Vec::new();
            while let Ok(event) = self.event_rx.try_recv() {
                events.push(event);
            }
            events
        }
    }

    fn rating(v: u8) -> Rating {
        Rating::new(v).expect("valid rating")
    }

    /// Commands that rate and advance through a full 2×2 session, skipping
    /// the single break.
    fn full_walk() -> Vec<SessionCommand> {
        vec![
            SessionCommand::Start(participant()),
            SessionCommand::SelectRating(rating(1)),
            SessionCommand::NextPair,
            SessionCommand::SelectRating(rating(2)),
            SessionCommand::NextPair, // end of block 1 → break
            SessionCommand::SkipBreak,
            SessionCommand::SelectRating(rating(3)),
            SessionCommand::NextPair,
            SessionCommand::SelectRating(rating(4)),
            SessionCommand::NextPair, // final pair → complete
        ]
    }

    fn pair_loads(events: &[SessionEvent]) -> Vec<(u32, u32)> {
        events
            .iter()
            .filter_map(|e| match e {
                SessionEvent::PairLoaded { position, .. } => Some((position.block, position.pair)),
                _ => None,
            })
            .collect()
    }

    // -----------------------------------------------------------------------
    // Tests
    // -----------------------------------------------------------------------

    /// `Start` should load the first pair at (1,1) with zero progress.
    #[tokio::test]
    async fn start_loads_first_pair() {
        let mut h = harness();
        let events = h
            .run_script(vec![SessionCommand::Start(participant())])
            .await;

        assert_eq!(
            events,
            vec![SessionEvent::PairLoaded {
                position: Position { block: 1, pair: 1 },
                audio_id: "B1P1".into(),
                progress: 0.0,
            }]
        );
    }

    /// Advancing with no rating selected must prompt, not move.
    #[tokio::test]
    async fn advance_without_rating_prompts() {
        let mut h = harness();
        let events = h
            .run_script(vec![
                SessionCommand::Start(participant()),
                SessionCommand::NextPair,
            ])
            .await;

        assert!(events.contains(&SessionEvent::RatingRequired));
        assert_eq!(pair_loads(&events), vec![(1, 1)]); // still on the first pair
    }

    /// Rating then advancing moves to the next pair in the block.
    #[tokio::test]
    async fn rate_and_advance_moves_to_next_pair() {
        let mut h = harness();
        let events = h
            .run_script(vec![
                SessionCommand::Start(participant()),
                SessionCommand::SelectRating(rating(4)),
                SessionCommand::NextPair,
            ])
            .await;

        assert!(events.contains(&SessionEvent::RatingSelected(rating(4))));
        assert_eq!(pair_loads(&events), vec![(1, 1), (1, 2)]);
    }

    /// Finishing a non-final block starts the rest break.
    #[tokio::test]
    async fn end_of_block_starts_break() {
        let mut h = harness();
        let events = h
            .run_script(vec![
                SessionCommand::Start(participant()),
                SessionCommand::SelectRating(rating(1)),
                SessionCommand::NextPair,
                SessionCommand::SelectRating(rating(2)),
                SessionCommand::NextPair,
            ])
            .await;

        assert!(events.contains(&SessionEvent::BreakStarted {
            completed_block: 1,
            secs_left: 60,
        }));
        // No pair loaded for block 2 yet — the break is still running.
        assert_eq!(pair_loads(&events), vec![(1, 1), (1, 2)]);
    }

    /// Skipping the break resumes at the next block's first pair, exactly once.
    #[tokio::test]
    async fn skip_break_resumes_at_next_block() {
        let mut h = harness();
        let events = h
            .run_script(vec![
                SessionCommand::Start(participant()),
                SessionCommand::SelectRating(rating(1)),
                SessionCommand::NextPair,
                SessionCommand::SelectRating(rating(2)),
                SessionCommand::NextPair,
                SessionCommand::SkipBreak,
            ])
            .await;

        assert_eq!(pair_loads(&events), vec![(1, 1), (1, 2), (2, 1)]);
    }

    /// The worked 2×2 walkthrough: four ratings, one submission, completed.
    #[tokio::test]
    async fn full_walkthrough_completes_and_submits_once() {
        let mut h = harness();
        let events = h.run_script(full_walk()).await;

        assert!(events
            .iter()
            .any(|e| matches!(e, SessionEvent::Completed { .. })));
        assert!(events.contains(&SessionEvent::SubmissionFinished {
            ok: true,
            message: "Data uploaded successfully.".into(),
        }));

        let submitted = h.submitter.submitted();
        assert_eq!(submitted.len(), 1, "submission must fire exactly once");

        let report: serde_json::Value = serde_json::from_str(&submitted[0]).unwrap();
        assert_eq!(report["ratings"].as_array().unwrap().len(), 4);
        assert_eq!(report["participant"]["id"], "P123");
    }

    /// Submission failure surfaces as a status event and a later backup
    /// export writes exactly the dataset that would have been submitted.
    #[tokio::test]
    async fn failed_submission_still_allows_identical_backup() {
        let mut h = harness_with(small_config(), MockSubmitter::failing(), MockPlayer::ok());

        let mut commands = full_walk();
        commands.push(SessionCommand::ExportBackup);
        let events = h.run_script(commands).await;

        assert!(events.iter().any(|e| matches!(
            e,
            SessionEvent::SubmissionFinished { ok: false, .. }
        )));

        let saved = events
            .iter()
            .find_map(|e| match e {
                SessionEvent::BackupSaved { path } => Some(path.clone()),
                _ => None,
            })
            .expect("backup must be offered after a failed submission");

        assert!(saved.starts_with(h.backup_dir.path()));
        let backup = std::fs::read_to_string(&saved).expect("backup readable");
        let submitted = h.submitter.submitted();
        assert_eq!(
            backup, submitted[0],
            "backup must contain the exact dataset handed to the submitter"
        );
    }

    /// Export before completion is an error, not a crash.
    #[tokio::test]
    async fn backup_before_completion_is_an_error() {
        let mut h = harness();
        let events = h
            .run_script(vec![
                SessionCommand::Start(participant()),
                SessionCommand::ExportBackup,
            ])
            .await;

        assert!(events
            .iter()
            .any(|e| matches!(e, SessionEvent::Error { .. })));
    }

    /// Sequential playback plays original then shadowing, in order.
    #[tokio::test]
    async fn sequential_playback_plays_both_clips_in_order() {
        let mut h = harness();
        let events = h
            .run_script(vec![
                SessionCommand::Start(participant()),
                SessionCommand::PlaySequential,
            ])
            .await;

        assert!(events.contains(&SessionEvent::PlaybackFinished));
        let played = h.player.played();
        assert_eq!(played.len(), 2);
        assert!(played[0].ends_with("block1/original_1.flac"));
        assert!(played[1].ends_with("block1/shadowing_1.flac"));
    }

    /// Replay buttons play the single requested clip of the current pair.
    #[tokio::test]
    async fn replay_plays_the_requested_clip() {
        let mut h = harness();
        h.run_script(vec![
            SessionCommand::Start(participant()),
            SessionCommand::PlayShadowing,
        ])
        .await;

        let played = h.player.played();
        assert_eq!(played.len(), 1);
        assert!(played[0].ends_with("block1/shadowing_1.flac"));
    }

    /// Missing clips are logged warnings; the session continues and can
    /// still be rated and advanced.
    #[tokio::test]
    async fn playback_failure_is_non_fatal() {
        let mut h = harness_with(small_config(), MockSubmitter::ok(), MockPlayer::failing());
        let events = h
            .run_script(vec![
                SessionCommand::Start(participant()),
                SessionCommand::PlaySequential,
                SessionCommand::SelectRating(rating(3)),
                SessionCommand::NextPair,
            ])
            .await;

        assert!(events.contains(&SessionEvent::PlaybackFinished));
        assert!(!events
            .iter()
            .any(|e| matches!(e, SessionEvent::Error { .. })));
        assert_eq!(pair_loads(&events), vec![(1, 1), (1, 2)]);
    }

    /// The countdown resumes the session by itself when it reaches zero.
    #[tokio::test(start_paused = true)]
    async fn break_countdown_auto_resumes() {
        let mut config = small_config();
        config.session.break_secs = 3;
        let mut h = harness_with(config, MockSubmitter::ok(), MockPlayer::ok());

        let cmd_rx = h.cmd_rx.take().unwrap();
        let runner = h.runner.take().unwrap();
        let handle = tokio::spawn(runner.run(cmd_rx));

        for cmd in [
            SessionCommand::Start(participant()),
            SessionCommand::SelectRating(rating(1)),
            SessionCommand::NextPair,
            SessionCommand::SelectRating(rating(2)),
            SessionCommand::NextPair, // → break, 3 s countdown
        ] {
            h.cmd_tx.send(cmd).await.unwrap();
        }

        // Paused clock: tokio advances time automatically while idle, so the
        // countdown ticks without any real waiting.
        let mut ticks = Vec::new();
        loop {
            match h.event_rx.recv().await.expect("runner alive") {
                SessionEvent::BreakTick { secs_left } => ticks.push(secs_left),
                SessionEvent::PairLoaded { position, .. } if position.block == 2 => break,
                _ => {}
            }
        }

        assert_eq!(ticks, vec![2, 1]);

        drop(h.cmd_tx);
        handle.await.expect("runner task");
    }

    /// A zero-length break resumes immediately without a countdown.
    #[tokio::test]
    async fn zero_break_resumes_immediately() {
        let mut config = small_config();
        config.session.break_secs = 0;
        let mut h = harness_with(config, MockSubmitter::ok(), MockPlayer::ok());

        let events = h
            .run_script(vec![
                SessionCommand::Start(participant()),
                SessionCommand::SelectRating(rating(1)),
                SessionCommand::NextPair,
                SessionCommand::SelectRating(rating(2)),
                SessionCommand::NextPair,
            ])
            .await;

        assert!(!events
            .iter()
            .any(|e| matches!(e, SessionEvent::BreakStarted { .. })));
        assert_eq!(pair_loads(&events), vec![(1, 1), (1, 2), (2, 1)]);
    }

    /// Progress reported with each pair load is non-decreasing.
    #[tokio::test]
    async fn progress_is_monotone_across_loads() {
        let mut h = harness();
        let events = h.run_script(full_walk()).await;

        let progress: Vec<f64> = events
            .iter()
            .filter_map(|e| match e {
                SessionEvent::PairLoaded { progress, .. } => Some(*progress),
                _ => None,
            })
            .collect();

        for w in progress.windows(2) {
            assert!(w[1] >= w[0], "progress regressed: {w:?}");
        }
        assert!(progress.iter().all(|p| *p < 1.0));
    }
}
