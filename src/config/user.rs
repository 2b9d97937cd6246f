//! User configuration loading for toolwright.
//!
//! User config location: $XDG_CONFIG_HOME/toolwright/toolwright.toml
//! Fallback: the platform config directory (`dirs::config_dir`).

use std::path::PathBuf;
use thiserror::Error;

use super::CONFIG_FILE_NAME;
use super::settings::ToolwrightSettings;

/// Errors raised while reading the user configuration file.
#[derive(Debug, Error)]
pub enum UserConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

pub type UserConfigResult<T> = Result<T, UserConfigError>;

/// Returns the path to the user configuration file.
///
/// Returns None if no configuration directory can be determined.
pub fn user_config_path() -> Option<PathBuf> {
    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME")
        && !xdg_config.is_empty()
    {
        return Some(
            PathBuf::from(xdg_config)
                .join("toolwright")
                .join(CONFIG_FILE_NAME),
        );
    }

    dirs::config_dir().map(|dir| dir.join("toolwright").join(CONFIG_FILE_NAME))
}

/// Load the user configuration file. A missing file is not an error.
pub fn load_user_config() -> UserConfigResult<Option<ToolwrightSettings>> {
    let Some(path) = user_config_path() else {
        return Ok(None);
    };
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path).map_err(|source| UserConfigError::Read {
        path: path.clone(),
        source,
    })?;
    toml::from_str(&contents)
        .map(Some)
        .map_err(|source| UserConfigError::Parse { path, source })
}
