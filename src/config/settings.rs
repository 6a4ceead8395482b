//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across threads.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Shape of the experiment session: how many blocks, how many pairs per
/// block, and how long the rest break between blocks lasts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Number of blocks in the session.
    pub total_blocks: u32,
    /// Number of audio pairs rated within each block.
    pub pairs_per_block: u32,
    /// Rest-break countdown between blocks, in seconds.
    pub break_secs: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            total_blocks: 10,
            pairs_per_block: 5,
            break_secs: 60,
        }
    }
}

impl SessionConfig {
    /// Total number of pairs across the whole session.
    pub fn total_pairs(&self) -> u32 {
        self.total_blocks * self.pairs_per_block
    }
}

// ---------------------------------------------------------------------------
// FormFields
// ---------------------------------------------------------------------------

/// Field-name mapping for the external form endpoint.
///
/// Each value is the form's wire field name (for a Google Form, the
/// `entry.<digits>` name captured from a test submission).  The names are
/// deployment-specific configuration, not protocol constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormFields {
    /// Participant identifier.
    pub participant_id: String,
    /// Participant age.
    pub age: String,
    /// Participant gender.
    pub gender: String,
    /// Participant native language.
    pub native_language: String,
    /// Block number of the rated pair.
    pub block: String,
    /// Pair number within the block.
    pub pair: String,
    /// Path of the original clip.
    pub original_audio: String,
    /// Path of the shadowing clip.
    pub shadowing_audio: String,
    /// The 1–5 similarity rating.
    pub rating: String,
    /// ISO 8601 timestamp of the rating.
    pub timestamp: String,
}

impl Default for FormFields {
    fn default() -> Self {
        Self {
            participant_id: "entry.123456789".into(),
            age: "entry.987654321".into(),
            gender: "entry.111111111".into(),
            native_language: "entry.222222222".into(),
            block: "entry.333333333".into(),
            pair: "entry.444444444".into(),
            original_audio: "entry.555555555".into(),
            shadowing_audio: "entry.666666666".into(),
            rating: "entry.777777777".into(),
            timestamp: "entry.888888888".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// FormConfig
// ---------------------------------------------------------------------------

/// Settings for the end-of-session data submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormConfig {
    /// Form-response endpoint URL.
    ///
    /// For a Google Form this is the `/formResponse` URL derived from the
    /// form's embed link.
    pub url: String,
    /// Maximum seconds to wait for each POST before giving up.
    pub timeout_secs: u64,
    /// Wire field names for every submitted value.
    pub fields: FormFields,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            url: "https://docs.google.com/forms/d/e/YOUR_FORM_ID/formResponse".into(),
            timeout_secs: 30,
            fields: FormFields::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// AudioConfig
// ---------------------------------------------------------------------------

/// Settings for locating and playing the session's audio clips.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Root directory of the clip tree
    /// (`<assets_dir>/block<N>/{original|shadowing}_<M>.<ext>`).
    pub assets_dir: PathBuf,
    /// File extension of the clips (e.g. `"flac"`).
    pub clip_ext: String,
    /// Silence inserted between the two clips during sequential playback,
    /// in milliseconds.
    pub clip_gap_ms: u64,
    /// Audio output device name — `None` means the system default.
    pub output_device: Option<String>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            assets_dir: PathBuf::from("audio"),
            clip_ext: "flac".into(),
            clip_gap_ms: 500,
            output_device: None,
        }
    }
}

// ---------------------------------------------------------------------------
// UiConfig
// ---------------------------------------------------------------------------

/// Window appearance and behaviour settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    /// Last saved window position `(x, y)` in screen pixels.  `None` means
    /// let the OS / window manager pick a position on first launch.
    pub window_position: Option<(f32, f32)>,
    /// Start with the window maximised (recommended for participants).
    pub start_maximized: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            window_position: None,
            start_maximized: true,
        }
    }
}

// ---------------------------------------------------------------------------
// ExportConfig
// ---------------------------------------------------------------------------

/// Settings for the local backup export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Directory backup files are written to.  `None` means the platform
    /// data directory (see [`AppPaths`]).
    pub dir: Option<PathBuf>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self { dir: None }
    }
}

impl ExportConfig {
    /// The directory backups are written to, resolving `None` to the
    /// platform default.
    pub fn resolved_dir(&self) -> PathBuf {
        self.dir
            .clone()
            .unwrap_or_else(|| AppPaths::new().exports_dir)
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use shadowing_rater::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
///
/// // Modify and save
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Session shape: blocks, pairs per block, break duration.
    pub session: SessionConfig,
    /// Form submission endpoint and field mapping.
    pub form: FormConfig,
    /// Clip location and playback settings.
    pub audio: AudioConfig,
    /// Window settings.
    pub ui: UiConfig,
    /// Backup export settings.
    pub export: ExportConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet
    /// (first-run scenario) so callers never need to special-case a missing
    /// file.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
