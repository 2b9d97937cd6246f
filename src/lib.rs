pub mod config;
pub mod coverage;
pub mod error;
pub mod format;
pub mod guard;
pub mod host;
pub mod orchestrator;
pub mod system;
pub mod testing;
pub mod tools;

pub use config::{CoverageHighlightMode, Settings, SettingsManager};
pub use coverage::{CoverageOverlay, CoverageRange};
pub use error::{ToolError, ToolResult};
pub use format::{FormatInvoker, FormatOutcome};
pub use orchestrator::{Collaborators, HandleOutcome, HostCommand, HostEvent, Toolwright};
pub use testing::{RunOutcome, RunPhase, TestRunner};
pub use tools::{EnsureOutcome, RebuildOutcome, ToolResolutionCache};
