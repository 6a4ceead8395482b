//! Core `Submitter` trait and `FormSubmitter` implementation.
//!
//! `FormSubmitter` posts form-encoded rows to any form-collection endpoint
//! that accepts flat field-name → value pairs — a Google Form
//! `/formResponse` URL in the deployed experiment.  All connection details
//! (endpoint, field names, timeout) come from [`FormConfig`]; nothing is
//! hardcoded.

use async_trait::async_trait;
use thiserror::Error;

use crate::config::{FormConfig, FormFields};
use crate::session::{ExperimentReport, Participant, RatingEntry};

// ---------------------------------------------------------------------------
// SubmitError
// ---------------------------------------------------------------------------

/// Errors that can occur during data submission.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// HTTP transport or connection error.
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// A request did not complete within the configured timeout.
    #[error("submission timed out")]
    Timeout,

    /// The endpoint answered with a non-success status.
    #[error("endpoint rejected rating row {row}: HTTP {status}")]
    Rejected { row: usize, status: u16 },
}

impl From<reqwest::Error> for SubmitError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SubmitError::Timeout
        } else {
            SubmitError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// Submitter trait
// ---------------------------------------------------------------------------

/// Async trait for end-of-session data submission.
///
/// Implementors must be `Send + Sync` so they can be shared across threads
/// (e.g. wrapped in `Arc<dyn Submitter>`).
///
/// # Contract
///
/// The submission is best-effort and fire-once: implementations must not
/// retry, and a failure must leave no partial bookkeeping behind — the
/// caller's only recovery path is the local backup export.
#[async_trait]
pub trait Submitter: Send + Sync {
    async fn submit(&self, report: &ExperimentReport) -> Result<(), SubmitError>;
}

// ---------------------------------------------------------------------------
// Row encoding
// ---------------------------------------------------------------------------

/// Build the flat field-name → value pairs for one rating row.
///
/// Every row repeats the participant fields so each form response is
/// self-contained, exactly as the form's columns are laid out.
pub fn encode_rating_row(
    fields: &FormFields,
    participant: &Participant,
    entry: &RatingEntry,
) -> Vec<(String, String)> {
    vec![
        (fields.participant_id.clone(), participant.id.clone()),
        (fields.age.clone(), participant.age.to_string()),
        (fields.gender.clone(), participant.gender.label().to_string()),
        (
            fields.native_language.clone(),
            participant.native_language.clone(),
        ),
        (fields.block.clone(), entry.block.to_string()),
        (fields.pair.clone(), entry.pair.to_string()),
        (
            fields.original_audio.clone(),
            entry.original_audio.display().to_string(),
        ),
        (
            fields.shadowing_audio.clone(),
            entry.shadowing_audio.display().to_string(),
        ),
        (fields.rating.clone(), entry.rating.value().to_string()),
        (fields.timestamp.clone(), entry.recorded_at.to_rfc3339()),
    ]
}

// ---------------------------------------------------------------------------
// FormSubmitter
// ---------------------------------------------------------------------------

/// Posts one URL-encoded row per rating to the configured endpoint.
///
/// Rows are sent sequentially; the first failure aborts the submission and
/// is reported as the overall outcome.  Nothing is ever retried.
pub struct FormSubmitter {
    client: reqwest::Client,
    config: FormConfig,
}

impl FormSubmitter {
    /// Build a `FormSubmitter` from application config.
    ///
    /// The HTTP client is pre-configured with the per-request timeout from
    /// `config.timeout_secs`.  A default (no-timeout) client is used as a
    /// last-resort fallback if the builder fails (should never happen in
    /// practice).
    pub fn from_config(config: &FormConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            config: config.clone(),
        }
    }
}

#[async_trait]
impl Submitter for FormSubmitter {
    async fn submit(&self, report: &ExperimentReport) -> Result<(), SubmitError> {
        for (i, entry) in report.ratings.iter().enumerate() {
            let row = encode_rating_row(&self.config.fields, &report.participant, entry);

            let response = self
                .client
                .post(&self.config.url)
                .form(&row)
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                return Err(SubmitError::Rejected {
                    row: i + 1,
                    status: status.as_u16(),
                });
            }

            log::debug!(
                "submitted rating {}/{} ({})",
                i + 1,
                report.ratings.len(),
                entry.audio_id
            );
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MockSubmitter (test only)
// ---------------------------------------------------------------------------

/// Test double that records the submitted dataset instead of touching the
/// network.
#[cfg(test)]
pub struct MockSubmitter {
    succeed: bool,
    submitted: std::sync::Mutex<Vec<String>>,
}

#[cfg(test)]
impl MockSubmitter {
    /// A submitter whose every call succeeds.
    pub fn ok() -> Self {
        Self {
            succeed: true,
            submitted: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// A submitter whose every call fails with a transport error.
    pub fn failing() -> Self {
        Self {
            succeed: false,
            submitted: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// JSON snapshots of every report passed to `submit`, in call order.
    pub fn submitted(&self) -> Vec<String> {
        self.submitted.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl Submitter for MockSubmitter {
    async fn submit(&self, report: &ExperimentReport) -> Result<(), SubmitError> {
        self.submitted
            .lock()
            .unwrap()
            .push(report.to_json().expect("report serialises"));
        if self.succeed {
            Ok(())
        } else {
            Err(SubmitError::Request("connection refused".into()))
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Gender, Rating};
    use chrono::{TimeZone, Utc};
    use std::path::PathBuf;

    fn participant() -> Participant {
        Participant {
            id: "P010".into(),
            age: 31,
            gender: Gender::Other,
            native_language: "Korean".into(),
            started_at: Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap(),
        }
    }

    fn entry() -> RatingEntry {
        RatingEntry {
            block: 2,
            pair: 3,
            audio_id: "B2P3".into(),
            original_audio: PathBuf::from("audio/block2/original_3.flac"),
            shadowing_audio: PathBuf::from("audio/block2/shadowing_3.flac"),
            rating: Rating::new(5).unwrap(),
            recorded_at: Utc.with_ymd_and_hms(2026, 3, 1, 9, 15, 30).unwrap(),
        }
    }

    #[test]
    fn row_uses_the_configured_field_names() {
        let fields = FormFields::default();
        let row = encode_rating_row(&fields, &participant(), &entry());

        let names: Vec<&str> = row.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "entry.123456789",
                "entry.987654321",
                "entry.111111111",
                "entry.222222222",
                "entry.333333333",
                "entry.444444444",
                "entry.555555555",
                "entry.666666666",
                "entry.777777777",
                "entry.888888888",
            ]
        );
    }

    #[test]
    fn row_carries_the_rating_values() {
        let fields = FormFields::default();
        let row = encode_rating_row(&fields, &participant(), &entry());
        let value = |name: &str| {
            row.iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.clone())
                .unwrap()
        };

        assert_eq!(value(&fields.participant_id), "P010");
        assert_eq!(value(&fields.age), "31");
        assert_eq!(value(&fields.gender), "Other");
        assert_eq!(value(&fields.native_language), "Korean");
        assert_eq!(value(&fields.block), "2");
        assert_eq!(value(&fields.pair), "3");
        assert_eq!(value(&fields.original_audio), "audio/block2/original_3.flac");
        assert_eq!(
            value(&fields.shadowing_audio),
            "audio/block2/shadowing_3.flac"
        );
        assert_eq!(value(&fields.rating), "5");
        assert_eq!(value(&fields.timestamp), "2026-03-01T09:15:30+00:00");
    }

    #[test]
    fn from_config_builds_without_panic() {
        let _submitter = FormSubmitter::from_config(&FormConfig::default());
    }

    /// Verify that `FormSubmitter` is object-safe (usable as `dyn Submitter`).
    #[test]
    fn submitter_is_object_safe() {
        let submitter: Box<dyn Submitter> =
            Box::new(FormSubmitter::from_config(&FormConfig::default()));
        drop(submitter);
    }

    #[tokio::test]
    async fn mock_records_the_report() {
        use crate::config::SessionConfig;

        let report = ExperimentReport::assemble(
            participant(),
            vec![entry()],
            SessionConfig::default(),
            Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap(),
        );

        let mock = MockSubmitter::ok();
        mock.submit(&report).await.expect("mock submit");
        let submitted = mock.submitted();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0], report.to_json().unwrap());
    }

    #[tokio::test]
    async fn failing_mock_still_records_the_report() {
        use crate::config::SessionConfig;

        let report = ExperimentReport::assemble(
            participant(),
            vec![entry()],
            SessionConfig::default(),
            Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap(),
        );

        let mock = MockSubmitter::failing();
        assert!(mock.submit(&report).await.is_err());
        assert_eq!(mock.submitted().len(), 1);
    }
}
