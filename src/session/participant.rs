//! Participant intake: raw form fields → validated [`Participant`].
//!
//! Validation is all-or-nothing.  The Welcome → Running transition only
//! happens once every required field is present, the age parses, and the
//! consent box is ticked; until then no participant state is committed
//! anywhere.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Gender
// ---------------------------------------------------------------------------

/// Gender options offered on the intake form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    /// All selectable options, in form order.
    pub const ALL: [Gender; 3] = [Gender::Male, Gender::Female, Gender::Other];

    /// Display label for the intake form.
    pub fn label(&self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::Other => "Other",
        }
    }
}

// ---------------------------------------------------------------------------
// ValidationError
// ---------------------------------------------------------------------------

/// Per-field validation failures reported back to the intake form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("please enter a participant ID")]
    MissingParticipantId,

    #[error("please enter an age")]
    MissingAge,

    #[error("age must be a whole number: {0:?}")]
    InvalidAge(String),

    #[error("please select a gender")]
    MissingGender,

    #[error("please enter a native language")]
    MissingNativeLanguage,

    #[error("please tick the consent box to participate")]
    ConsentRequired,
}

// ---------------------------------------------------------------------------
// Participant
// ---------------------------------------------------------------------------

/// Validated participant record.
///
/// Set exactly once, before the first pair is shown; immutable thereafter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// Operator-assigned participant identifier.
    pub id: String,
    /// Age in years.
    pub age: u32,
    /// Selected gender option.
    pub gender: Gender,
    /// Self-reported native language.
    pub native_language: String,
    /// When the session started (stamped on the validated start transition).
    pub started_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// ParticipantForm
// ---------------------------------------------------------------------------

/// Raw, unvalidated intake-form state as typed by the participant.
#[derive(Debug, Clone, Default)]
pub struct ParticipantForm {
    /// Participant ID field.
    pub participant_id: String,
    /// Age field (free text until validated).
    pub age: String,
    /// Gender selection, `None` until one is picked.
    pub gender: Option<Gender>,
    /// Native language field.
    pub native_language: String,
    /// Consent checkbox.
    pub consent: bool,
}

impl ParticipantForm {
    /// Validate every field and build a [`Participant`] stamped with
    /// `started_at`.
    ///
    /// Fields are checked in form order and the first failure is returned;
    /// nothing is committed on failure.
    pub fn validate(&self, started_at: DateTime<Utc>) -> Result<Participant, ValidationError> {
        let id = self.participant_id.trim();
        if id.is_empty() {
            return Err(ValidationError::MissingParticipantId);
        }

        let age_raw = self.age.trim();
        if age_raw.is_empty() {
            return Err(ValidationError::MissingAge);
        }
        let age: u32 = age_raw
            .parse()
            .map_err(|_| ValidationError::InvalidAge(age_raw.to_string()))?;

        let gender = self.gender.ok_or(ValidationError::MissingGender)?;

        let native_language = self.native_language.trim();
        if native_language.is_empty() {
            return Err(ValidationError::MissingNativeLanguage);
        }

        if !self.consent {
            return Err(ValidationError::ConsentRequired);
        }

        Ok(Participant {
            id: id.to_string(),
            age,
            gender,
            native_language: native_language.to_string(),
            started_at,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn filled_form() -> ParticipantForm {
        ParticipantForm {
            participant_id: "P042".into(),
            age: "27".into(),
            gender: Some(Gender::Female),
            native_language: "Mandarin".into(),
            consent: true,
        }
    }

    #[test]
    fn valid_form_builds_participant() {
        let now = Utc::now();
        let p = filled_form().validate(now).expect("valid form");
        assert_eq!(p.id, "P042");
        assert_eq!(p.age, 27);
        assert_eq!(p.gender, Gender::Female);
        assert_eq!(p.native_language, "Mandarin");
        assert_eq!(p.started_at, now);
    }

    #[test]
    fn fields_are_trimmed() {
        let mut form = filled_form();
        form.participant_id = "  P042  ".into();
        form.age = " 27 ".into();
        form.native_language = " Mandarin ".into();
        let p = form.validate(Utc::now()).expect("valid form");
        assert_eq!(p.id, "P042");
        assert_eq!(p.age, 27);
        assert_eq!(p.native_language, "Mandarin");
    }

    #[test]
    fn missing_id_is_rejected() {
        let mut form = filled_form();
        form.participant_id = "   ".into();
        assert_eq!(
            form.validate(Utc::now()),
            Err(ValidationError::MissingParticipantId)
        );
    }

    #[test]
    fn missing_age_is_rejected() {
        let mut form = filled_form();
        form.age = "".into();
        assert_eq!(form.validate(Utc::now()), Err(ValidationError::MissingAge));
    }

    #[test]
    fn non_numeric_age_is_rejected() {
        let mut form = filled_form();
        form.age = "twenty-seven".into();
        assert_eq!(
            form.validate(Utc::now()),
            Err(ValidationError::InvalidAge("twenty-seven".into()))
        );
    }

    #[test]
    fn missing_gender_is_rejected() {
        let mut form = filled_form();
        form.gender = None;
        assert_eq!(
            form.validate(Utc::now()),
            Err(ValidationError::MissingGender)
        );
    }

    #[test]
    fn missing_native_language_is_rejected() {
        let mut form = filled_form();
        form.native_language = "".into();
        assert_eq!(
            form.validate(Utc::now()),
            Err(ValidationError::MissingNativeLanguage)
        );
    }

    #[test]
    fn consent_is_required() {
        let mut form = filled_form();
        form.consent = false;
        assert_eq!(
            form.validate(Utc::now()),
            Err(ValidationError::ConsentRequired)
        );
    }

    #[test]
    fn gender_labels() {
        assert_eq!(Gender::Male.label(), "Male");
        assert_eq!(Gender::Female.label(), "Female");
        assert_eq!(Gender::Other.label(), "Other");
        assert_eq!(Gender::ALL.len(), 3);
    }
}
