use directories::ProjectDirs;
use std::path::PathBuf;

const DB_FILE: &str = "ecoquest.db";
const CONFIG_FILE: &str = "config.json";

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    /// Key-value database for history, achievements and local submissions.
    ///
    /// Prefers `$HOME/.local/state/ecoquest`, falling back to the platform
    /// data directory when `HOME` is unset.
    pub fn db_path() -> Option<PathBuf> {
        match std::env::var_os("HOME") {
            Some(home) => Some(
                PathBuf::from(home)
                    .join(".local")
                    .join("state")
                    .join("ecoquest")
                    .join(DB_FILE),
            ),
            None => Self::project_dirs().map(|dirs| dirs.data_local_dir().join(DB_FILE)),
        }
    }

    pub fn config_path() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE))
    }

    fn project_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from("", "", "ecoquest")
    }
}
