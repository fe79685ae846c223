//! Configuration loading and root folder resolution

use crate::{Error, Result};
use std::path::PathBuf;

/// Database file name inside the root folder
pub const DATABASE_FILE: &str = "recap.db";

/// Root folder resolution priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config file
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_root_folder(cli_arg: Option<&str>, env_var_name: &str) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return PathBuf::from(path);
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        return PathBuf::from(path);
    }

    // Priority 3: TOML config file
    if let Ok(config_path) = locate_config_file() {
        if let Ok(toml_content) = std::fs::read_to_string(&config_path) {
            if let Ok(config) = toml::from_str::<toml::Value>(&toml_content) {
                if let Some(root_folder) = config.get("root_folder").and_then(|v| v.as_str()) {
                    return PathBuf::from(root_folder);
                }
            }
        }
    }

    // Priority 4: OS-dependent compiled default
    default_root_folder()
}

/// Ensure the root folder exists and return the database path inside it
pub fn prepare_root_folder(root: &PathBuf) -> Result<PathBuf> {
    std::fs::create_dir_all(root)?;
    Ok(root.join(DATABASE_FILE))
}

/// Get default configuration file path for the platform
fn locate_config_file() -> Result<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("recap").join("config.toml"));

    if let Some(path) = user_config {
        if path.exists() {
            return Ok(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/recap/config.toml");
        if system_config.exists() {
            return Ok(system_config);
        }
    }

    Err(Error::Config("No config file found".to_string()))
}

/// Get OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/recap (or /var/lib/recap for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("recap"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/recap"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("recap"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/recap"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("recap"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\recap"))
    } else {
        PathBuf::from("./recap_data")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_cli_argument_wins() {
        let root = resolve_root_folder(Some("/tmp/recap-cli"), "RECAP_TEST_UNSET_VAR");
        assert_eq!(root, PathBuf::from("/tmp/recap-cli"));
    }

    #[test]
    #[serial]
    fn test_env_variable_used_when_no_cli_arg() {
        std::env::set_var("RECAP_TEST_ROOT", "/tmp/recap-env");
        let root = resolve_root_folder(None, "RECAP_TEST_ROOT");
        std::env::remove_var("RECAP_TEST_ROOT");
        assert_eq!(root, PathBuf::from("/tmp/recap-env"));
    }

    #[test]
    #[serial]
    fn test_cli_argument_beats_env_variable() {
        std::env::set_var("RECAP_TEST_ROOT", "/tmp/recap-env");
        let root = resolve_root_folder(Some("/tmp/recap-cli"), "RECAP_TEST_ROOT");
        std::env::remove_var("RECAP_TEST_ROOT");
        assert_eq!(root, PathBuf::from("/tmp/recap-cli"));
    }

    #[test]
    fn test_fallback_is_non_empty() {
        let root = resolve_root_folder(None, "RECAP_TEST_UNSET_VAR");
        assert!(!root.as_os_str().is_empty());
    }
}
