// engine_core/src/storage/engine_config.rs
use std::error::Error;
use std::path::{Path, PathBuf};
use std::fs;
use ron::from_str;
use ron::ser::{PrettyConfig, to_string_pretty};
use serde::{Deserialize, Serialize};
use directories_next::ProjectDirs;
use crate::constants::{ASSETS_FOLDER, CONFIG_RON};
use crate::*;

/// Host settings read once at startup and handed to whoever needs them.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// flexi_logger spec string, e.g. `"info"` or `"engine_core=debug"`.
    pub log_level: String,
    /// Write rotating log files instead of logging to stderr only.
    pub log_to_file: bool,
    /// Overrides the log folder. Defaults to `<app_dir>/logs`.
    pub log_dir: Option<PathBuf>,
    /// Root folder that asset paths are relative to.
    pub assets_root: PathBuf,
    /// Scene loaded by the host on startup.
    pub startup_scene: Option<PathBuf>,
    /// Number of frames the headless host runs before exiting.
    pub max_ticks: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_to_file: false,
            log_dir: None,
            assets_root: PathBuf::from(ASSETS_FOLDER),
            startup_scene: None,
            max_ticks: 600,
        }
    }
}

impl EngineConfig {
    /// Folder the rotating log files go into.
    pub fn log_dir(&self) -> PathBuf {
        self.log_dir
            .clone()
            .unwrap_or_else(|| app_dir().join("logs"))
    }
}

/// Returns the app_dir for the program.
pub fn app_dir() -> PathBuf {
    if let Some(project_dir) = ProjectDirs::from("com", "scene-engine", "engine") {
        project_dir.config_dir().to_path_buf()
    }
    else {
        onscreen_error!("Could not resolve app directory, using the working directory.");
        PathBuf::from(".")
    }
}

/// Default location of the config file.
pub fn config_path() -> PathBuf {
    app_dir().join(CONFIG_RON)
}

/// Loads the config from its default location.
pub fn load_config() -> EngineConfig {
    load_config_from(&config_path())
}

/// Loads the config at `path`, falling back to defaults when the file is
/// missing or unreadable.
pub fn load_config_from(path: &Path) -> EngineConfig {
    match fs::read_to_string(path) {
        Ok(txt) => match from_str(&txt) {
            Ok(config) => config,
            Err(e) => {
                onscreen_error!("Error parsing config '{}': {e}.", path.display());
                EngineConfig::default()
            }
        },
        Err(e) => {
            onscreen_error!("Error loading config: {e}.");
            EngineConfig::default()
        } 
    }
}

/// Saves the config .ron file to its default location.
pub fn save_config(config: &EngineConfig) -> Result<(), Box<dyn Error>> {
    save_config_to(config, &config_path())
}

/// Saves the config .ron file to `path`.
pub fn save_config_to(config: &EngineConfig, path: &Path) -> Result<(), Box<dyn Error>> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let ron = to_string_pretty(config, PrettyConfig::default())?;
    fs::write(path, ron)?;                    
    Ok(())
}
