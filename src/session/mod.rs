//! Session core for Shadowing Rater.
//!
//! This module wires the full intake → rate → rest → submit flow and
//! exposes the event stream the UI renders.
//!
//! # Architecture
//!
//! ```text
//! SessionCommand (mpsc)
//!        │
//!        ▼
//! SessionRunner::run()  ← async tokio task
//!        │
//!        ├─ Start         → validate already done, Position (1,1)
//!        ├─ SelectRating  → overwrite pending value (idempotent)
//!        ├─ NextPair      → record rating, advance / break / complete
//!        ├─ SkipBreak     → cancel countdown, resume
//!        ├─ Play*         → spawn_blocking(ClipPlayer)
//!        └─ ExportBackup  → spawn_blocking(BackupWriter)
//!
//! SessionEvent (mpsc) ───▶ read by the egui update loop each frame
//! ```
//!
//! The state machine itself ([`SessionState`]) is pure — no clocks, no I/O —
//! so every transition rule is unit-tested without a runtime.  The runner
//! owns the only mutable instance and serialises all mutation on one task.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tokio::sync::mpsc;
//! use shadowing_rater::audio::{ClipPlayer, CpalPlayer};
//! use shadowing_rater::config::AppConfig;
//! use shadowing_rater::session::{SessionCommand, SessionEvent, SessionRunner};
//! use shadowing_rater::submit::{BackupWriter, FormSubmitter, Submitter};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::default();
//!     let player: Arc<dyn ClipPlayer> = Arc::new(CpalPlayer::new(None));
//!     let submitter: Arc<dyn Submitter> = Arc::new(FormSubmitter::from_config(&config.form));
//!     let backup = BackupWriter::new(config.export.resolved_dir());
//!
//!     let (command_tx, command_rx) = mpsc::channel::<SessionCommand>(16);
//!     let (event_tx, _event_rx) = mpsc::channel::<SessionEvent>(32);
//!
//!     let runner = SessionRunner::new(config, player, submitter, backup, event_tx);
//!     tokio::spawn(runner.run(command_rx));
//!
//!     // command_tx is handed to the UI.
//!     drop(command_tx);
//! }
//! ```

pub mod manifest;
pub mod participant;
pub mod report;
pub mod runner;
pub mod state;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use manifest::{AudioPair, Manifest, Position};
pub use participant::{Gender, Participant, ParticipantForm, ValidationError};
pub use report::ExperimentReport;
pub use runner::{SessionCommand, SessionEvent, SessionRunner};
pub use state::{Advance, Rating, RatingEntry, SessionPhase, SessionState, StateError};
