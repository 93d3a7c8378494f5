//! Store layout names and built-in defaults.

/// Environment variable overriding the store location.
pub const HOME_ENV: &str = "BAKELITE_HOME";

/// Default store directory under the user's home.
pub const DEFAULT_HOME_DIR: &str = ".bakelite";

/// Pinned default base. The full (non-slim) tag matters: slim variants drop
/// the `audioop` stdlib extension module the default runtime relies on.
pub const DEFAULT_BASE_REFERENCE: &str = "python:3.11";

/// Default in-image working directory.
pub const DEFAULT_WORKDIR: &str = "/app";

/// Default dependency manifest filename, resolved inside the workdir.
pub const DEFAULT_MANIFEST: &str = "requirements.txt";

pub mod filenames {
    pub const DB_FILE: &str = "bakelite.db";
    pub const LOCK_FILE: &str = "bakelite.lock";
}

pub mod dirnames {
    pub const SNAPSHOTS: &str = "snapshots";
    pub const BASES: &str = "bases";
    pub const CONTAINERS: &str = "containers";
    pub const TMP: &str = "tmp";
    pub const LOGS: &str = "logs";
}

/// Default package-manager self-upgrade command.
pub fn default_upgrade_command() -> Vec<String> {
    ["python", "-m", "pip", "install", "--upgrade", "pip"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Default install command for a given manifest filename.
pub fn default_install_command(manifest: &str) -> Vec<String> {
    ["python", "-m", "pip", "install", "-r", manifest]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Default entry command.
pub fn default_entry_command() -> Vec<String> {
    ["python", "main.py"].iter().map(|s| s.to_string()).collect()
}
