//! Live settings storage.
//!
//! `SettingsManager` holds the settings currently in effect and reports what
//! changed when new settings are applied, so callers can react to changes of
//! individual values (for example a different formatter tool).

use arc_swap::ArcSwap;
use std::sync::Arc;

use super::settings::Settings;

/// What changed between two settings snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsChange {
    /// The new formatter tool, when it differs from the previous one.
    pub format_tool: Option<String>,
    pub format_on_save: Option<bool>,
    pub run_tests_on_save: Option<bool>,
    pub highlight_mode_changed: bool,
}

/// Centralized holder for the settings in effect.
///
/// Uses `ArcSwap` so readers never block writers.
pub struct SettingsManager {
    settings: ArcSwap<Settings>,
}

impl std::fmt::Debug for SettingsManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsManager")
            .field("settings", &self.settings.load())
            .finish()
    }
}

impl Default for SettingsManager {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

impl SettingsManager {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings: ArcSwap::new(Arc::new(settings)),
        }
    }

    /// Load the current settings.
    pub fn load(&self) -> Arc<Settings> {
        self.settings.load_full()
    }

    /// Replace the settings and report what changed.
    pub fn apply(&self, settings: Settings) -> SettingsChange {
        let current = Arc::new(settings);
        let previous = self.settings.swap(Arc::clone(&current));

        SettingsChange {
            format_tool: (previous.format.tool != current.format.tool)
                .then(|| current.format.tool.clone()),
            format_on_save: (previous.format.format_on_save != current.format.format_on_save)
                .then_some(current.format.format_on_save),
            run_tests_on_save: (previous.test.run_tests_on_save
                != current.test.run_tests_on_save)
                .then_some(current.test.run_tests_on_save),
            highlight_mode_changed: previous.test.coverage_highlight_mode
                != current.test.coverage_highlight_mode,
        }
    }
}
