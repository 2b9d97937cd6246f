use serde::{Deserialize, Serialize};

use crate::tools::GOIMPORTS;

/// Which coverage ranges are highlighted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CoverageHighlightMode {
    Disabled,
    Covered,
    Uncovered,
    #[default]
    CoveredAndUncovered,
}

impl CoverageHighlightMode {
    pub fn shows_covered(self) -> bool {
        matches!(self, Self::Covered | Self::CoveredAndUncovered)
    }

    pub fn shows_uncovered(self) -> bool {
        matches!(self, Self::Uncovered | Self::CoveredAndUncovered)
    }
}

impl std::str::FromStr for CoverageHighlightMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "disabled" => Ok(Self::Disabled),
            "covered" => Ok(Self::Covered),
            "uncovered" => Ok(Self::Uncovered),
            "covered-and-uncovered" => Ok(Self::CoveredAndUncovered),
            other => Err(format!("unknown coverage highlight mode '{}'", other)),
        }
    }
}

/// `[format]` table as written in configuration files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatConfig {
    pub tool: Option<String>,
    pub format_on_save: Option<bool>,
}

/// `[test]` table as written in configuration files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestConfig {
    pub run_tests_on_save: Option<bool>,
    pub short_flag: Option<bool>,
    pub verbose_flag: Option<bool>,
    pub coverage_highlight_mode: Option<CoverageHighlightMode>,
}

/// One configuration layer. Every field is optional so layers merge per field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolwrightSettings {
    pub format: Option<FormatConfig>,
    pub test: Option<TestConfig>,
}

/// Resolved formatting settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatSettings {
    pub tool: String,
    pub format_on_save: bool,
}

/// Resolved test settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestSettings {
    pub run_tests_on_save: bool,
    pub short_flag: bool,
    pub verbose_flag: bool,
    pub coverage_highlight_mode: CoverageHighlightMode,
}

/// Fully resolved settings used at runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub format: FormatSettings,
    pub test: TestSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self::from(ToolwrightSettings::default())
    }
}

impl From<ToolwrightSettings> for Settings {
    fn from(raw: ToolwrightSettings) -> Self {
        let format = raw.format.unwrap_or_default();
        let test = raw.test.unwrap_or_default();
        Self {
            format: FormatSettings {
                tool: format
                    .tool
                    .filter(|t| !t.trim().is_empty())
                    .unwrap_or_else(|| GOIMPORTS.to_string()),
                format_on_save: format.format_on_save.unwrap_or(true),
            },
            test: TestSettings {
                run_tests_on_save: test.run_tests_on_save.unwrap_or(true),
                short_flag: test.short_flag.unwrap_or(false),
                verbose_flag: test.verbose_flag.unwrap_or(false),
                coverage_highlight_mode: test.coverage_highlight_mode.unwrap_or_default(),
            },
        }
    }
}
