//! Tool lookup on the local filesystem.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::sync::OnceCell;

use crate::host::{LocatorOptions, ToolLocator};
use crate::tools::GO;

use super::LOG_TARGET;

/// Finds tools in the project's `bin` directory, the Go workspace and `PATH`.
///
/// Search order:
/// 1. `<directory>/bin`
/// 2. `bin` of every `GOPATH` entry
/// 3. `$GOROOT/bin`
/// 4. `$GOTOOLDIR` (where `cover` lives)
/// 5. every `PATH` entry
///
/// Without `GOTOOLDIR` in the environment, the tool directory is asked from
/// the toolchain (`go env GOTOOLDIR`) once and searched last.
#[derive(Debug, Default)]
pub struct PathLocator {
    toolchain_tool_dir: OnceCell<Option<PathBuf>>,
}

impl PathLocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Directories searched for `options`, in order.
    pub fn search_dirs(options: &LocatorOptions) -> Vec<PathBuf> {
        let var = |key: &str| -> Option<OsString> {
            match &options.env {
                Some(env) => env.get(key).map(OsString::from),
                None => std::env::var_os(key),
            }
        };

        let mut dirs = Vec::new();
        if let Some(directory) = &options.directory {
            dirs.push(directory.join("bin"));
        }
        if let Some(gopath) = var("GOPATH") {
            dirs.extend(std::env::split_paths(&gopath).map(|entry| entry.join("bin")));
        }
        if let Some(goroot) = var("GOROOT") {
            dirs.push(PathBuf::from(goroot).join("bin"));
        }
        if let Some(tooldir) = var("GOTOOLDIR") {
            dirs.push(PathBuf::from(tooldir));
        }
        if let Some(path) = var("PATH") {
            dirs.extend(std::env::split_paths(&path));
        }
        dirs.retain(|dir| !dir.as_os_str().is_empty());
        dirs
    }

    /// Tool directory reported by the `go` binary found in `dirs`.
    async fn toolchain_tool_dir(&self, dirs: &[PathBuf], options: &LocatorOptions) -> Option<&Path> {
        self.toolchain_tool_dir
            .get_or_init(|| async {
                let go = find_in(dirs, GO).await?;
                query_tool_dir(&go, options).await
            })
            .await
            .as_deref()
    }
}

fn has_env(options: &LocatorOptions, key: &str) -> bool {
    match &options.env {
        Some(env) => env.contains_key(key),
        None => std::env::var_os(key).is_some(),
    }
}

async fn find_in(dirs: &[PathBuf], name: &str) -> Option<PathBuf> {
    for dir in dirs {
        let candidate = dir.join(executable_name(name));
        if is_executable(&candidate).await {
            return Some(candidate);
        }
    }
    None
}

async fn query_tool_dir(go: &Path, options: &LocatorOptions) -> Option<PathBuf> {
    let mut cmd = tokio::process::Command::new(go);
    cmd.args(["env", "GOTOOLDIR"])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true);
    if let Some(env) = &options.env {
        cmd.env_clear().envs(env);
    }

    let output = match cmd.output().await {
        Ok(output) => output,
        Err(err) => {
            log::debug!(target: LOG_TARGET, "{} env GOTOOLDIR failed: {}", go.display(), err);
            return None;
        }
    };
    let dir = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if !output.status.success() || dir.is_empty() {
        log::debug!(
            target: LOG_TARGET,
            "{} reported no tool directory (exit {:?})",
            go.display(),
            output.status.code()
        );
        return None;
    }
    log::debug!(target: LOG_TARGET, "Toolchain tool directory: {}", dir);
    Some(PathBuf::from(dir))
}

#[async_trait]
impl ToolLocator for PathLocator {
    async fn find_tool(&self, name: &str, options: &LocatorOptions) -> Option<PathBuf> {
        let dirs = Self::search_dirs(options);
        let mut found = find_in(&dirs, name).await;
        if found.is_none()
            && !has_env(options, "GOTOOLDIR")
            && let Some(tool_dir) = self.toolchain_tool_dir(&dirs, options).await
        {
            found = find_in(&[tool_dir.to_path_buf()], name).await;
        }
        if let Some(path) = &found {
            log::trace!(target: LOG_TARGET, "Found {} at {}", name, path.display());
        }
        found
    }
}

fn executable_name(name: &str) -> String {
    if cfg!(windows) {
        format!("{}.exe", name)
    } else {
        name.to_string()
    }
}

async fn is_executable(path: &Path) -> bool {
    let Ok(metadata) = tokio::fs::metadata(path).await else {
        return false;
    };
    if !metadata.is_file() {
        return false;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        metadata.permissions().mode() & 0o111 != 0
    }
    #[cfg(not(unix))]
    {
        true
    }
}
