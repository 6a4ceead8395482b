//! The end-of-session dataset.
//!
//! [`ExperimentReport`] is assembled exactly once when the session
//! completes.  Both the form submitter and the backup writer consume the
//! same report value, so a backup export after a failed submission contains
//! exactly the data that would have been submitted.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::SessionConfig;

use super::participant::Participant;
use super::state::RatingEntry;

// ---------------------------------------------------------------------------
// ExperimentReport
// ---------------------------------------------------------------------------

/// Everything collected in one session, plus the configuration snapshot an
/// analyst needs to interpret it.
#[derive(Debug, Clone, Serialize)]
pub struct ExperimentReport {
    /// Validated participant record, including the session start stamp.
    pub participant: Participant,
    /// All ratings, in traversal order.
    pub ratings: Vec<RatingEntry>,
    /// The session shape the data was collected under.
    pub session: SessionConfig,
    /// When the final pair was rated.
    pub completed_at: DateTime<Utc>,
    /// Total session duration in minutes, rounded to the nearest minute.
    pub total_duration_mins: i64,
}

impl ExperimentReport {
    /// Assemble the report from the completed session's parts.
    pub fn assemble(
        participant: Participant,
        ratings: Vec<RatingEntry>,
        session: SessionConfig,
        completed_at: DateTime<Utc>,
    ) -> Self {
        let secs = (completed_at - participant.started_at).num_seconds();
        let total_duration_mins = ((secs as f64) / 60.0).round() as i64;
        Self {
            participant,
            ratings,
            session,
            completed_at,
            total_duration_mins,
        }
    }

    /// Serialise the report as pretty-printed JSON — the exact document the
    /// backup export writes.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
