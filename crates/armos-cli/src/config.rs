//! Configuration file – reads/writes `~/.armos/config.toml`.
//!
//! The path can be redirected with `ARMOS_CONFIG`.  After parsing, `ARMOS_*`
//! environment overrides are applied and the result is validated.

use std::fs;
use std::path::{Path, PathBuf};

use armos_runtime::EngineConfig;
use armos_types::ArmError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write config at {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(#[from] ArmError),
}

/// Return the config path: `ARMOS_CONFIG` if set, else `~/.armos/config.toml`.
pub fn config_path() -> PathBuf {
    if let Ok(p) = std::env::var("ARMOS_CONFIG") {
        return PathBuf::from(p);
    }
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".armos").join("config.toml")
}

/// Load the config from disk.  Returns `None` if the file does not exist.
pub fn load() -> Result<Option<EngineConfig>, ConfigError> {
    load_from(&config_path())
}

pub(crate) fn load_from(path: &Path) -> Result<Option<EngineConfig>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut cfg: EngineConfig = toml::from_str(&raw)?;
    apply_env_overrides(&mut cfg);
    cfg.validate()?;
    Ok(Some(cfg))
}

/// Apply `ARMOS_*` environment variable overrides to `cfg`.  Values that do
/// not parse are ignored.
///
/// | Variable | Config field |
/// |---|---|
/// | `ARMOS_CURRENT_THRESHOLD_MA` | `current_threshold_ma` |
/// | `ARMOS_PUBLISH_RATE_HZ` | `publish_rate_hz` |
/// | `ARMOS_MONITOR_RATE_HZ` | `monitor_rate_hz` |
pub fn apply_env_overrides(cfg: &mut EngineConfig) {
    if let Ok(v) = std::env::var("ARMOS_CURRENT_THRESHOLD_MA")
        && let Ok(ma) = v.trim().parse::<i32>()
    {
        cfg.current_threshold_ma = ma;
    }
    if let Ok(v) = std::env::var("ARMOS_PUBLISH_RATE_HZ")
        && let Ok(hz) = v.trim().parse::<f64>()
    {
        cfg.publish_rate_hz = hz;
    }
    if let Ok(v) = std::env::var("ARMOS_MONITOR_RATE_HZ")
        && let Ok(hz) = v.trim().parse::<f64>()
    {
        cfg.monitor_rate_hz = hz;
    }
}

/// Save the config, creating the parent directory if necessary.
pub fn save(cfg: &EngineConfig) -> Result<(), ConfigError> {
    save_to(cfg, &config_path())
}

pub(crate) fn save_to(cfg: &EngineConfig, path: &Path) -> Result<(), ConfigError> {
    let write_err = |source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(write_err)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700)).map_err(write_err)?;
        }
    }
    let raw = toml::to_string_pretty(cfg)?;
    #[cfg(unix)]
    {
        use std::io::Write;
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| f.write_all(raw.as_bytes()))
            .map_err(write_err)?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw).map_err(write_err)?;
    Ok(())
}
