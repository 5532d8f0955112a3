use crate::model::Settings;
use crate::streaming::StreamingCredentials;
use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "cecilio";
const SETTINGS_FILE: &str = "settings.json";
const STREAMING_FILE: &str = "streaming.json";
pub const LOG_FILE: &str = "cecilio.log";
pub const CONFIG_DIR_ENV: &str = "CECILIO_CONFIG_DIR";

pub fn config_root() -> Result<PathBuf> {
    if let Ok(override_dir) = env::var(CONFIG_DIR_ENV)
        && !override_dir.trim().is_empty()
    {
        return Ok(PathBuf::from(override_dir));
    }

    let home = env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .context("neither HOME nor USERPROFILE is set")?;
    Ok(PathBuf::from(home).join(".config").join(APP_DIR))
}

pub fn ensure_config_dir() -> Result<PathBuf> {
    let root = config_root()?;
    fs::create_dir_all(&root).with_context(|| format!("failed to create {}", root.display()))?;
    Ok(root)
}

pub fn load_settings() -> Result<Settings> {
    load_settings_from(&config_root()?)
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    save_settings_to(&ensure_config_dir()?, settings)
}

pub fn load_streaming_credentials() -> Result<StreamingCredentials> {
    load_streaming_credentials_from(&config_root()?)
}

pub fn load_settings_from(root: &Path) -> Result<Settings> {
    read_json_or_default(&root.join(SETTINGS_FILE))
}

pub fn save_settings_to(root: &Path, settings: &Settings) -> Result<()> {
    fs::create_dir_all(root).with_context(|| format!("failed to create {}", root.display()))?;
    write_json(&root.join(SETTINGS_FILE), settings)
}

pub fn load_streaming_credentials_from(root: &Path) -> Result<StreamingCredentials> {
    read_json_or_default(&root.join(STREAMING_FILE))
}

fn read_json_or_default<T: DeserializeOwned + Default>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Ok(T::default());
    }

    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let value = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(value)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}
