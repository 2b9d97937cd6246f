//! Canned inputs shared across tests.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use toolwright::host::{ExecOutput, ToolLocator};
use toolwright::orchestrator::Collaborators;

use super::fakes::{CountingExecutor, FakeInstaller, FakeLocator, FakeWorkspace, RecordingOutput};

/// Two blocks of `a.go`: lines 1-3 executed, lines 5-6 not.
pub const A_GO_REPORT: &str = "mode: set\na.go:1.1,3.1 2 5\na.go:5.1,6.1 1 0\n";

pub const A_GO_SOURCE: &str = "package a\n\nfunc A() int {\n\treturn 1\n}\n\nfunc B() {}\n";

/// Successful process output with the given stdout.
pub fn stdout(text: &str) -> ExecOutput {
    ExecOutput {
        exit_code: 0,
        stdout: text.to_string(),
        stderr: String::new(),
    }
}

/// Locator that knows every tool toolwright manages, under `/fake/bin`.
pub fn full_locator() -> Arc<FakeLocator> {
    let locator = FakeLocator::new();
    for tool in ["gofmt", "goimports", "goreturns", "go", "cover"] {
        locator.set(tool, PathBuf::from("/fake/bin").join(tool));
    }
    Arc::new(locator)
}

/// Every collaborator as a fake, kept around for assertions.
pub struct Harness {
    pub locator: Arc<FakeLocator>,
    pub executor: Arc<CountingExecutor>,
    pub installer: Arc<FakeInstaller>,
    pub workspace: Arc<FakeWorkspace>,
    pub output: Arc<RecordingOutput>,
}

impl Harness {
    pub fn new(locator: Arc<FakeLocator>, roots: &[&str]) -> Self {
        Self {
            installer: Arc::new(FakeInstaller::succeeding(Arc::clone(&locator))),
            locator,
            executor: Arc::new(CountingExecutor::new(stdout(""))),
            workspace: Arc::new(FakeWorkspace::new(roots)),
            output: Arc::new(RecordingOutput::default()),
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            locator: Arc::clone(&self.locator) as Arc<dyn ToolLocator>,
            executor: self.executor.clone(),
            installer: Some(self.installer.clone()),
            workspace: self.workspace.clone(),
            output: self.output.clone(),
        }
    }
}

/// Environment the fake locator reports for project roots.
pub fn project_env() -> HashMap<String, String> {
    HashMap::from([("GOPATH".to_string(), "/gopath".to_string())])
}
