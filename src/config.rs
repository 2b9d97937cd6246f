pub mod defaults;
pub mod loader;
pub mod manager;
pub mod settings;
pub mod user;

pub use loader::{SettingsEvent, SettingsEventKind, SettingsLoadOutcome, load_settings};
pub use manager::{SettingsChange, SettingsManager};
pub use settings::{
    CoverageHighlightMode, FormatConfig, FormatSettings, Settings, TestConfig, TestSettings,
    ToolwrightSettings,
};
pub use user::{UserConfigError, UserConfigResult, load_user_config, user_config_path};

/// File name of both the user and the project configuration file.
pub const CONFIG_FILE_NAME: &str = "toolwright.toml";

/// Merge layered settings, later entries taking precedence over earlier ones.
pub fn merge_all(configs: &[Option<ToolwrightSettings>]) -> Option<ToolwrightSettings> {
    configs.iter().cloned().reduce(merge_settings).flatten()
}

/// Merge two ToolwrightSettings, preferring values from `primary` over `fallback`
pub fn merge_settings(
    fallback: Option<ToolwrightSettings>,
    primary: Option<ToolwrightSettings>,
) -> Option<ToolwrightSettings> {
    match (fallback, primary) {
        (None, None) => None,
        (Some(settings), None) => Some(settings),
        (None, Some(settings)) => Some(settings),
        (Some(fallback), Some(primary)) => Some(ToolwrightSettings {
            format: merge_format(fallback.format, primary.format),
            test: merge_test(fallback.test, primary.test),
        }),
    }
}

fn merge_format(fallback: Option<FormatConfig>, primary: Option<FormatConfig>) -> Option<FormatConfig> {
    match (fallback, primary) {
        (Some(fallback), Some(primary)) => Some(FormatConfig {
            tool: primary.tool.or(fallback.tool),
            format_on_save: primary.format_on_save.or(fallback.format_on_save),
        }),
        (fallback, primary) => primary.or(fallback),
    }
}

fn merge_test(fallback: Option<TestConfig>, primary: Option<TestConfig>) -> Option<TestConfig> {
    match (fallback, primary) {
        (Some(fallback), Some(primary)) => Some(TestConfig {
            run_tests_on_save: primary.run_tests_on_save.or(fallback.run_tests_on_save),
            short_flag: primary.short_flag.or(fallback.short_flag),
            verbose_flag: primary.verbose_flag.or(fallback.verbose_flag),
            coverage_highlight_mode: primary
                .coverage_highlight_mode
                .or(fallback.coverage_highlight_mode),
        }),
        (fallback, primary) => primary.or(fallback),
    }
}
