use std::sync::Mutex;

use crate::error::LockResultExt;
use crate::host::{OutputSurface, TestReport, TestState};

/// Prints test progress to stderr and keeps the last report.
#[derive(Debug, Default)]
pub struct ConsoleOutput {
    last: Mutex<Option<TestReport>>,
}

impl ConsoleOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_report(&self) -> Option<TestReport> {
        self.last.lock().recover_poison("ConsoleOutput::last_report").clone()
    }
}

impl OutputSurface for ConsoleOutput {
    fn update(&self, report: TestReport) {
        match report.state {
            TestState::Pending => eprintln!("{}", report.output),
            TestState::Success => eprintln!("{}\nPASS", report.output),
            TestState::Fail => eprintln!("{}\nFAIL (exit code {})", report.output, report.exit_code),
        }
        *self.last.lock().recover_poison("ConsoleOutput::update") = Some(report);
    }
}
