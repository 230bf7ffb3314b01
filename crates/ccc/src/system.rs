// Copyright (c) Contributors to the ccc project.
// SPDX-License-Identifier: Apache-2.0

//! Operating system and shell identity.
//!
//! The host identity is probed once, by the front-end, and written into the
//! settings tree. Everything downstream reads `/system` and `/shell` from the
//! tree instead of looking at the running process.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[cfg(test)]
#[path = "./system_test.rs"]
mod system_test;

/// Operating system family that generated commands target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum System {
    Linux,
    Windows,
    Darwin,
    Other(String),
}

impl System {
    /// The system this binary was compiled for.
    pub fn current() -> Self {
        std::env::consts::OS.into()
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Linux => "linux",
            Self::Windows => "windows",
            Self::Darwin => "darwin",
            Self::Other(name) => name,
        }
    }
}

impl From<&str> for System {
    fn from(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "linux" => Self::Linux,
            "windows" => Self::Windows,
            "darwin" | "macos" => Self::Darwin,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for System {
    fn from(name: String) -> Self {
        Self::from(name.as_str())
    }
}

impl From<System> for String {
    fn from(system: System) -> Self {
        system.name().to_string()
    }
}

impl FromStr for System {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(s.into())
    }
}

impl fmt::Display for System {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The dialect of a shell, derived from its executable name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellKind {
    Bash,
    Zsh,
    Sh,
    PowerShell,
    Cmd,
    Other(String),
}

/// A shell executable that scripts are written for and run with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Shell {
    path: PathBuf,
}

impl Shell {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Executable name without any extension (`bash` for `/usr/bin/bash`).
    pub fn name(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn kind(&self) -> ShellKind {
        let name = self.name();
        match name.to_lowercase().as_str() {
            "bash" => ShellKind::Bash,
            "zsh" => ShellKind::Zsh,
            "sh" | "dash" => ShellKind::Sh,
            "pwsh" | "powershell" => ShellKind::PowerShell,
            "cmd" => ShellKind::Cmd,
            _ => ShellKind::Other(name),
        }
    }

    /// Program and arguments that run `script` with this shell.
    pub fn command_for_script(&self, script: &Path) -> (PathBuf, Vec<PathBuf>) {
        (self.path.clone(), vec![script.to_path_buf()])
    }
}

impl fmt::Display for Shell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

/// System and shell of the host, resolved once per invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostIdentity {
    pub system: System,
    pub shell: Shell,
}

impl HostIdentity {
    /// Probe the running host.
    pub fn detect() -> crate::Result<Self> {
        let system = System::current();
        let shell = find_shell(&system, std::env::var_os("PATH").as_deref())?;
        Ok(Self { system, shell })
    }
}

/// Shell candidates for each system, in order of preference.
fn shell_candidates(system: &System) -> &'static [&'static str] {
    match system {
        System::Linux | System::Darwin => &["bash"],
        _ => &[],
    }
}

/// Find the preferred shell for `system` on the given search path.
///
/// Only the directories of `search_path` are searched. Without one, no
/// shell can be found.
pub fn find_shell(
    system: &System,
    search_path: Option<&std::ffi::OsStr>,
) -> crate::Result<Shell> {
    let Some(search_path) = search_path.filter(|p| !p.is_empty()) else {
        return Err(crate::Error::ShellNotFound(system.to_string()));
    };
    let cwd = std::env::current_dir()?;
    for candidate in shell_candidates(system) {
        match which::which_in(candidate, Some(search_path), &cwd) {
            Ok(found) => {
                let found = std::path::absolute(found)?;
                tracing::debug!(shell = %found.display(), "found shell");
                return Ok(Shell::new(found));
            }
            Err(err) => tracing::debug!(%candidate, %err, "shell candidate not found"),
        }
    }
    Err(crate::Error::ShellNotFound(system.to_string()))
}
