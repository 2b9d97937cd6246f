//! Default configuration values for toolwright.
//!
//! The lowest-precedence layer of the settings stack.

use super::settings::{CoverageHighlightMode, FormatConfig, TestConfig, ToolwrightSettings};
use crate::tools::GOIMPORTS;

/// Returns the built-in settings layer.
pub fn default_settings() -> ToolwrightSettings {
    ToolwrightSettings {
        format: Some(FormatConfig {
            tool: Some(GOIMPORTS.to_string()),
            format_on_save: Some(true),
        }),
        test: Some(TestConfig {
            run_tests_on_save: Some(true),
            short_flag: Some(false),
            verbose_flag: Some(false),
            coverage_highlight_mode: Some(CoverageHighlightMode::CoveredAndUncovered),
        }),
    }
}
