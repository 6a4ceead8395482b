//! Cross-platform application paths using the `dirs` crate.
//!
//! Layout:
//!
//! Config dir (settings):
//!   Windows: %APPDATA%\shadowing-rater\
//!   macOS:   ~/Library/Application Support/shadowing-rater/
//!   Linux:   ~/.config/shadowing-rater/
//!
//! Data dir (backup exports):
//!   Windows: %LOCALAPPDATA%\shadowing-rater\
//!   macOS:   ~/Library/Application Support/shadowing-rater/
//!   Linux:   ~/.local/share/shadowing-rater/

use std::path::PathBuf;

/// Holds all resolved application directory/file paths.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Directory for `settings.toml`.
    pub config_dir: PathBuf,
    /// Full path to `settings.toml`.
    pub settings_file: PathBuf,
    /// Directory where backup exports are written by default.
    pub exports_dir: PathBuf,
}

impl AppPaths {
    const APP_NAME: &'static str = "shadowing-rater";

    /// Resolves all paths using the `dirs` crate.
    ///
    /// Falls back to the current directory if the platform cannot provide a
    /// standard path (should be extremely rare in practice).
    pub fn new() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let settings_file = config_dir.join("settings.toml");
        let exports_dir = data_dir.join("exports");

        Self {
            config_dir,
            settings_file,
            exports_dir,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}
