// urlnav platform paths
// Config and data directories per OS, selected with `cfg(target_os)`.
//
// - Linux:   $XDG_CONFIG_HOME/urlnav (~/.config/urlnav), $XDG_DATA_HOME/urlnav (~/.local/share/urlnav)
// - macOS:   ~/Library/Application Support/urlnav for both
// - Windows: %APPDATA%/urlnav for both

use std::env;
use std::path::PathBuf;

const APP_DIR: &str = "urlnav";

fn home_dir() -> PathBuf {
    let home = env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .unwrap_or_else(|_| String::from("/tmp"));
    PathBuf::from(home)
}

/// Returns the directory holding `settings.json`.
pub fn get_config_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        app_data_dir()
    }
    #[cfg(target_os = "macos")]
    {
        home_dir()
            .join("Library")
            .join("Application Support")
            .join(APP_DIR)
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        match env::var("XDG_CONFIG_HOME") {
            Ok(xdg) if !xdg.is_empty() => PathBuf::from(xdg).join(APP_DIR),
            _ => home_dir().join(".config").join(APP_DIR),
        }
    }
}

/// Returns the directory holding the bookmark library and its backups.
pub fn get_data_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        app_data_dir()
    }
    #[cfg(target_os = "macos")]
    {
        get_config_dir()
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        match env::var("XDG_DATA_HOME") {
            Ok(xdg) if !xdg.is_empty() => PathBuf::from(xdg).join(APP_DIR),
            _ => home_dir().join(".local").join("share").join(APP_DIR),
        }
    }
}

#[cfg(target_os = "windows")]
fn app_data_dir() -> PathBuf {
    match env::var("APPDATA") {
        Ok(dir) => PathBuf::from(dir).join(APP_DIR),
        Err(_) => home_dir().join("AppData").join("Roaming").join(APP_DIR),
    }
}

/// Default location of the library document.
pub fn default_library_path() -> PathBuf {
    get_data_dir().join("bookmarks.json")
}

/// Default directory for backup sets.
pub fn default_backup_dir() -> PathBuf {
    get_data_dir().join("backups")
}

/// Default location of the random pick history.
pub fn default_pick_history_path() -> PathBuf {
    get_data_dir().join("pick_history.json")
}
