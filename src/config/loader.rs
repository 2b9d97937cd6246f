use serde_json::Value;
use std::fs;
use std::path::Path;

use super::defaults::default_settings;
use super::settings::{Settings, ToolwrightSettings};
use super::{CONFIG_FILE_NAME, load_user_config, merge_all};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SettingsEventKind {
    Info,
    Warning,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SettingsEvent {
    pub kind: SettingsEventKind,
    pub message: String,
}

impl SettingsEvent {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            kind: SettingsEventKind::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            kind: SettingsEventKind::Warning,
            message: message.into(),
        }
    }

    /// Forward the event to the `log` facade.
    pub fn log(&self) {
        match self.kind {
            SettingsEventKind::Info => {
                log::info!(target: "toolwright::config", "{}", self.message)
            }
            SettingsEventKind::Warning => {
                log::warn!(target: "toolwright::config", "{}", self.message)
            }
        }
    }
}

#[derive(Debug)]
pub struct SettingsLoadOutcome {
    pub settings: Settings,
    pub events: Vec<SettingsEvent>,
}

/// Load settings from every layer. Never fails: unreadable layers are
/// skipped and reported as warnings.
pub fn load_settings(root_path: Option<&Path>, override_settings: Option<Value>) -> SettingsLoadOutcome {
    let mut events = Vec::new();

    // Layer 1: built-in defaults (lowest precedence)
    let defaults = Some(default_settings());

    // Layer 2: user config from XDG_CONFIG_HOME
    let user_config = load_user_config_with_events(&mut events);

    // Layer 3: project config from root_path/toolwright.toml
    let project_settings = load_toml_settings(root_path, &mut events);

    // Layer 4: override settings from the host
    let override_settings =
        override_settings.and_then(|value| parse_override_settings(value, &mut events));

    let merged = merge_all(&[defaults, user_config, project_settings, override_settings]);
    let settings = merged.map(Settings::from).unwrap_or_default();

    SettingsLoadOutcome { settings, events }
}

fn load_user_config_with_events(events: &mut Vec<SettingsEvent>) -> Option<ToolwrightSettings> {
    match load_user_config() {
        Ok(Some(settings)) => {
            events.push(SettingsEvent::info("Loaded user config"));
            Some(settings)
        }
        Ok(None) => None,
        Err(err) => {
            events.push(SettingsEvent::warning(format!(
                "Failed to load user config: {}",
                err
            )));
            None
        }
    }
}

fn load_toml_settings(
    root_path: Option<&Path>,
    events: &mut Vec<SettingsEvent>,
) -> Option<ToolwrightSettings> {
    let root = root_path?;
    let config_path = root.join(CONFIG_FILE_NAME);
    if !config_path.exists() {
        return None;
    }

    events.push(SettingsEvent::info(format!(
        "Found config file: {}",
        config_path.display()
    )));

    match fs::read_to_string(&config_path) {
        Ok(contents) => match toml::from_str::<ToolwrightSettings>(&contents) {
            Ok(settings) => {
                events.push(SettingsEvent::info(format!(
                    "Successfully loaded {}",
                    CONFIG_FILE_NAME
                )));
                Some(settings)
            }
            Err(err) => {
                events.push(SettingsEvent::warning(format!(
                    "Failed to parse {}: {}",
                    CONFIG_FILE_NAME, err
                )));
                None
            }
        },
        Err(err) => {
            events.push(SettingsEvent::warning(format!(
                "Failed to read {}: {}",
                CONFIG_FILE_NAME, err
            )));
            None
        }
    }
}

fn parse_override_settings(value: Value, events: &mut Vec<SettingsEvent>) -> Option<ToolwrightSettings> {
    if value.is_null() {
        return None;
    }
    match serde_json::from_value::<ToolwrightSettings>(value) {
        Ok(settings) => {
            events.push(SettingsEvent::info("Applied host settings"));
            Some(settings)
        }
        Err(err) => {
            events.push(SettingsEvent::warning(format!(
                "Failed to parse host settings: {}",
                err
            )));
            None
        }
    }
}
