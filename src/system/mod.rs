//! Production implementations of the host and system interfaces.
//!
//! The locator, executor and installer talk to the real filesystem and
//! processes. The document, workspace and output types back the CLI, which
//! has no editor around it.

pub mod document;
pub mod executor;
pub mod installer;
pub mod locator;
pub mod output;
pub mod workspace;

pub use document::FileDocument;
pub use executor::SystemExecutor;
pub use installer::GoInstaller;
pub use locator::PathLocator;
pub use output::ConsoleOutput;
pub use workspace::StaticWorkspace;

const LOG_TARGET: &str = "toolwright::system";
