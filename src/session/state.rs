//! Session state machine and collected-data store.
//!
//! [`SessionState`] is the single source of truth for progress and collected
//! ratings.  It is a pure state machine: no clocks, no I/O, no channels —
//! the runner feeds it commands and timestamps, which keeps every transition
//! unit-testable.
//!
//! The phase transitions are:
//!
//! ```text
//! Welcome ──validated start──▶ Running
//! Running ──advance, mid-block─────────▶ Running   (next pair)
//! Running ──advance, end of block──────▶ Resting   (position already moved)
//! Running ──advance, final pair────────▶ Complete  (terminal)
//! Resting ──countdown expiry / skip────▶ Running
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::manifest::{AudioPair, Manifest, Position};
use super::participant::Participant;

// ---------------------------------------------------------------------------
// Rating
// ---------------------------------------------------------------------------

/// A 1–5 similarity rating.
///
/// Constructible only for the five discrete values, so a [`RatingEntry`] can
/// never hold an out-of-scale score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rating(u8);

impl Rating {
    /// All five ratings, in scale order.
    pub const ALL: [Rating; 5] = [Rating(1), Rating(2), Rating(3), Rating(4), Rating(5)];

    /// Build a rating from its numeric value; `None` outside `1..=5`.
    pub fn new(value: u8) -> Option<Self> {
        (1..=5).contains(&value).then_some(Rating(value))
    }

    /// Numeric value, `1..=5`.
    pub fn value(self) -> u8 {
        self.0
    }

    /// Scale label shown next to the selected score.
    pub fn label(self) -> &'static str {
        match self.0 {
            1 => "Not at all similar",
            2 => "Not similar",
            3 => "Neutral",
            4 => "Similar",
            _ => "Extremely similar",
        }
    }
}

// ---------------------------------------------------------------------------
// RatingEntry
// ---------------------------------------------------------------------------

/// One collected rating, appended exactly once per completed pair in
/// traversal order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingEntry {
    /// Block number of the rated pair.
    pub block: u32,
    /// Pair number within the block.
    pub pair: u32,
    /// Manifest id of the pair (`B<b>P<p>`).
    pub audio_id: String,
    /// Path of the original clip.
    pub original_audio: std::path::PathBuf,
    /// Path of the shadowing clip.
    pub shadowing_audio: std::path::PathBuf,
    /// The similarity rating.
    pub rating: Rating,
    /// When the rating was recorded.
    pub recorded_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// SessionPhase
// ---------------------------------------------------------------------------

/// Screen-level phase of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SessionPhase {
    /// Intake form is showing; nothing committed yet.
    #[default]
    Welcome,
    /// A pair is on screen awaiting a rating.
    Running,
    /// Rest break between blocks; countdown is live.
    Resting,
    /// All pairs rated.  Terminal.
    Complete,
}

impl SessionPhase {
    /// A short human-readable label suitable for logging.
    pub fn label(&self) -> &'static str {
        match self {
            SessionPhase::Welcome => "Welcome",
            SessionPhase::Running => "Running",
            SessionPhase::Resting => "Resting",
            SessionPhase::Complete => "Complete",
        }
    }
}

// ---------------------------------------------------------------------------
// Advance
// ---------------------------------------------------------------------------

/// Outcome of recording a rating and moving past the current pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Next pair in the same block; stay in `Running`.
    Continue,
    /// Block finished; position moved to the next block's first pair and
    /// the session entered `Resting`.
    Break {
        /// The block that was just completed.
        completed_block: u32,
    },
    /// Final pair rated; session is `Complete`.
    Complete,
}

// ---------------------------------------------------------------------------
// StateError
// ---------------------------------------------------------------------------

/// Transition-rule violations.
///
/// These indicate a caller bug (e.g. advancing from the Welcome screen), not
/// participant input problems — those are [`super::ValidationError`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    /// The cursor points outside the manifest.  Unreachable through the
    /// public transition API; kept as a guard on direct lookups.
    #[error("position {0} lies outside the manifest")]
    OutOfRange(Position),

    /// `advance` was called with no rating selected.
    #[error("a rating must be selected before advancing")]
    RatingRequired,

    /// `start` was called after the session already started.
    #[error("session already started")]
    AlreadyStarted,

    /// A Running-only operation was called in phase `{0:?}`.
    #[error("session is not running (phase: {})", .0.label())]
    NotRunning(SessionPhase),

    /// `resume` was called outside a rest break.
    #[error("session is not resting (phase: {})", .0.label())]
    NotResting(SessionPhase),
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// Single source of truth for session progress and collected data.
///
/// Owned by the runner and passed by reference; there is no ambient/global
/// instance, so tests construct sessions in isolation.
#[derive(Debug, Clone)]
pub struct SessionState {
    manifest: Manifest,
    phase: SessionPhase,
    position: Position,
    participant: Option<Participant>,
    pending: Option<Rating>,
    ratings: Vec<RatingEntry>,
}

impl SessionState {
    /// Create a fresh session over `manifest`, at the Welcome screen.
    pub fn new(manifest: Manifest) -> Self {
        Self {
            manifest,
            phase: SessionPhase::Welcome,
            position: Position::start(),
            participant: None,
            pending: None,
            ratings: Vec::new(),
        }
    }

    // ── Accessors ────────────────────────────────────────────────────────

    /// Current phase.
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Current (block, pair) cursor.
    pub fn position(&self) -> Position {
        self.position
    }

    /// The manifest this session traverses.
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// The validated participant, once the session has started.
    pub fn participant(&self) -> Option<&Participant> {
        self.participant.as_ref()
    }

    /// Rating selected for the current pair but not yet recorded.
    pub fn pending_rating(&self) -> Option<Rating> {
        self.pending
    }

    /// All recorded ratings, in traversal order.
    pub fn ratings(&self) -> &[RatingEntry] {
        &self.ratings
    }

    /// The pair at the current position.
    pub fn current_pair(&self) -> Result<&AudioPair, StateError> {
        self.manifest
            .pair_at(self.position)
            .ok_or(StateError::OutOfRange(self.position))
    }

    /// Completed-pairs / total-pairs, in `[0, 1]`.  Reaches 1 only once the
    /// final pair has been rated.
    pub fn progress(&self) -> f64 {
        self.ratings.len() as f64 / self.manifest.total_pairs() as f64
    }

    /// `true` iff the cursor is on the last (block, pair) of the manifest.
    pub fn is_final_pair(&self) -> bool {
        self.manifest.is_last(self.position)
    }

    // ── Transitions ──────────────────────────────────────────────────────

    /// Welcome → Running with a validated participant.
    pub fn start(&mut self, participant: Participant) -> Result<(), StateError> {
        if self.phase != SessionPhase::Welcome {
            return Err(StateError::AlreadyStarted);
        }
        self.participant = Some(participant);
        self.phase = SessionPhase::Running;
        Ok(())
    }

    /// Select (or re-select) the rating for the current pair.
    ///
    /// Idempotent: a second selection overwrites the pending value and never
    /// appends a record.
    pub fn select_rating(&mut self, rating: Rating) -> Result<(), StateError> {
        if self.phase != SessionPhase::Running {
            return Err(StateError::NotRunning(self.phase));
        }
        self.pending = Some(rating);
        Ok(())
    }

    /// Record the pending rating and move past the current pair.
    ///
    /// Exactly one [`RatingEntry`] is appended per call.  The returned
    /// [`Advance`] tells the caller whether the session stayed in `Running`,
    /// entered a rest break, or completed.
    pub fn advance(&mut self, now: DateTime<Utc>) -> Result<Advance, StateError> {
        if self.phase != SessionPhase::Running {
            return Err(StateError::NotRunning(self.phase));
        }
        let rating = self.pending.ok_or(StateError::RatingRequired)?;
        let pair = self.current_pair()?.clone();

        self.ratings.push(RatingEntry {
            block: self.position.block,
            pair: self.position.pair,
            audio_id: pair.id,
            original_audio: pair.original,
            shadowing_audio: pair.shadowing,
            rating,
            recorded_at: now,
        });
        self.pending = None;

        let outcome = if self.is_final_pair() {
            self.phase = SessionPhase::Complete;
            Advance::Complete
        } else if self.position.pair < self.manifest.pairs_per_block() {
            self.position.pair += 1;
            Advance::Continue
        } else {
            let completed_block = self.position.block;
            self.position.block += 1;
            self.position.pair = 1;
            self.phase = SessionPhase::Resting;
            Advance::Break { completed_block }
        };

        // Ratings recorded always match pairs already passed.
        debug_assert!(
            self.phase == SessionPhase::Complete
                || self.ratings.len() as u32
                    == self.position.completed_pairs(self.manifest.pairs_per_block())
        );

        Ok(outcome)
    }

    /// Resting → Running, at the position `advance` already moved to.
    ///
    /// Fired by exactly one of {countdown expiry, manual skip}; calling it
    /// outside a rest break is an error, which is what makes the transition
    /// safe against a timer/skip double-fire.
    pub fn resume(&mut self) -> Result<(), StateError> {
        if self.phase != SessionPhase::Resting {
            return Err(StateError::NotResting(self.phase));
        }
        self.phase = SessionPhase::Running;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
