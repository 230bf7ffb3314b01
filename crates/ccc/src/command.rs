// Copyright (c) Contributors to the ccc project.
// SPDX-License-Identifier: Apache-2.0

//! Command line text for common shell operations.
//!
//! [`CmdGenerator`] is the only place that knows how a directory is created or
//! a file is sourced on a given system and shell. A missing rule is reported
//! as an error rather than guessed.

use std::borrow::Cow;
use std::path::{Component, Path, PathBuf};

use crate::system::{Shell, ShellKind, System};
use crate::{Error, Result};

#[cfg(test)]
#[path = "./command_test.rs"]
mod command_test;

/// Environment scripts that activate a dependency build environment.
pub const BUILD_ACTIVATE_SCRIPTS: &[(&str, System)] = &[
    ("activate.sh", System::Linux),
    ("conanbuild.sh", System::Linux),
    ("activate.ps1", System::Windows),
    ("conanbuild.ps1", System::Windows),
];

/// Environment scripts that undo [`BUILD_ACTIVATE_SCRIPTS`].
pub const BUILD_DEACTIVATE_SCRIPTS: &[(&str, System)] = &[
    ("deactivate.sh", System::Linux),
    ("deactivate_conanbuild.sh", System::Linux),
    ("deactivate.ps1", System::Windows),
    ("deactivate_conanbuild.ps1", System::Windows),
];

/// Environment scripts that activate the runtime environment of built binaries.
pub const RUN_ACTIVATE_SCRIPTS: &[(&str, System)] = &[
    ("activate_run.sh", System::Linux),
    ("conanrun.sh", System::Linux),
    ("activate_run.ps1", System::Windows),
    ("conanrun.ps1", System::Windows),
];

/// Environment scripts that undo [`RUN_ACTIVATE_SCRIPTS`].
pub const RUN_DEACTIVATE_SCRIPTS: &[(&str, System)] = &[
    ("deactivate_run.sh", System::Linux),
    ("deactivate_conanrun.sh", System::Linux),
    ("deactivate_run.ps1", System::Windows),
    ("deactivate_conanrun.ps1", System::Windows),
];

/// Quote `word` for a POSIX shell.
///
/// Words made only of safe characters are returned as they are; anything else
/// is wrapped in single quotes.
pub fn shell_quote(word: &str) -> Cow<'_, str> {
    if word.is_empty() {
        return Cow::Borrowed("''");
    }
    let safe = word
        .chars()
        .all(|c| c.is_alphanumeric() || "@%+=:,./_-".contains(c));
    if safe {
        Cow::Borrowed(word)
    } else {
        Cow::Owned(format!("'{}'", word.replace('\'', r#"'"'"'"#)))
    }
}

/// Quote every word and join them with spaces.
pub fn shell_join<I, S>(words: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    words
        .into_iter()
        .map(|w| shell_quote(w.as_ref()).into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Resolve `.` and `..` components without touching the filesystem.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(normalized.components().next_back(), Some(Component::Normal(_))) {
                    normalized.pop();
                } else if !normalized.has_root() {
                    normalized.push("..");
                }
            }
            other => normalized.push(other),
        }
    }
    normalized
}

/// Path of `path` relative to `base`, computed lexically.
///
/// Both paths should be absolute (or both relative to the same directory).
pub fn relative_path(path: &Path, base: &Path) -> PathBuf {
    let path = normalize_path(path);
    let base = normalize_path(base);
    let path_parts: Vec<Component> = path.components().collect();
    let base_parts: Vec<Component> = base.components().collect();

    let common = path_parts
        .iter()
        .zip(&base_parts)
        .take_while(|(a, b)| a == b)
        .count();

    let mut relative = PathBuf::new();
    for _ in common..base_parts.len() {
        relative.push("..");
    }
    for part in &path_parts[common..] {
        relative.push(part);
    }
    if relative.as_os_str().is_empty() {
        relative.push(".");
    }
    relative
}

/// Generates command text for one system and shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CmdGenerator {
    system: System,
    shell: Shell,
}

impl CmdGenerator {
    pub fn new(system: System, shell: Shell) -> Self {
        Self { system, shell }
    }

    pub fn system(&self) -> &System {
        &self.system
    }

    pub fn shell(&self) -> &Shell {
        &self.shell
    }

    fn unsupported_system(&self, command: &str) -> Error {
        Error::UnsupportedSystem {
            system: self.system.to_string(),
            command: command.to_string(),
        }
    }

    fn unsupported_shell(&self, command: &str) -> Error {
        Error::UnsupportedShell {
            shell: self.shell.name(),
            command: command.to_string(),
        }
    }

    pub fn cd(&self, dir: &Path) -> Result<String> {
        let dir = dir.to_string_lossy();
        Ok(shell_join(["cd", &*dir]))
    }

    pub fn mkdir(&self, dir: &Path, make_parents: bool) -> Result<String> {
        let dir = dir.to_string_lossy();
        match self.system {
            System::Linux if make_parents => Ok(shell_join(["mkdir", "-p", &*dir])),
            System::Linux => Ok(shell_join(["mkdir", &*dir])),
            _ => Err(self.unsupported_system("mkdir")),
        }
    }

    pub fn source(&self, file: &Path) -> Result<String> {
        let file = file.to_string_lossy();
        match self.system {
            System::Linux => Ok(shell_join(["source", &*file])),
            _ => Err(self.unsupported_system("source")),
        }
    }

    /// Source each candidate that exists in `script_dir` and targets this
    /// generator's system, naming files relative to `source_from_dir`.
    pub fn conditionally_source_environment_script<S: AsRef<str>>(
        &self,
        candidates: &[(S, System)],
        script_dir: &Path,
        source_from_dir: &Path,
    ) -> Result<Vec<String>> {
        let mut lines = Vec::new();
        for (file_name, system) in candidates {
            let script = script_dir.join(file_name.as_ref());
            if *system != self.system || !script.exists() {
                continue;
            }
            tracing::debug!(script = %script.display(), "sourcing environment script");
            lines.push(self.source(&relative_path(&script, source_from_dir))?);
        }
        Ok(lines)
    }

    pub fn activate_build_environment(
        &self,
        script_dir: &Path,
        source_from_dir: &Path,
    ) -> Result<Vec<String>> {
        self.conditionally_source_environment_script(
            BUILD_ACTIVATE_SCRIPTS,
            script_dir,
            source_from_dir,
        )
    }

    pub fn deactivate_build_environment(
        &self,
        script_dir: &Path,
        source_from_dir: &Path,
    ) -> Result<Vec<String>> {
        self.conditionally_source_environment_script(
            BUILD_DEACTIVATE_SCRIPTS,
            script_dir,
            source_from_dir,
        )
    }

    pub fn activate_run_environment(
        &self,
        script_dir: &Path,
        source_from_dir: &Path,
    ) -> Result<Vec<String>> {
        self.conditionally_source_environment_script(
            RUN_ACTIVATE_SCRIPTS,
            script_dir,
            source_from_dir,
        )
    }

    pub fn deactivate_run_environment(
        &self,
        script_dir: &Path,
        source_from_dir: &Path,
    ) -> Result<Vec<String>> {
        self.conditionally_source_environment_script(
            RUN_DEACTIVATE_SCRIPTS,
            script_dir,
            source_from_dir,
        )
    }

    /// The statement that makes the shell stop at the first failing command.
    pub fn enable_fail_fast(&self) -> Option<String> {
        match self.shell.kind() {
            ShellKind::Bash => Some("set -e".to_string()),
            _ => None,
        }
    }

    /// Run the executable `file` from `from_dir` with `args`.
    pub fn invoke<S: AsRef<str>>(
        &self,
        file: &Path,
        from_dir: &Path,
        args: &[S],
    ) -> Result<String> {
        let program = match self.shell.kind() {
            ShellKind::Bash => format!("./{}", relative_path(file, from_dir).display()),
            _ => return Err(self.unsupported_shell("invoke")),
        };
        let mut line = shell_quote(&program).into_owned();
        for arg in args {
            line.push(' ');
            line.push_str(&shell_quote(arg.as_ref()));
        }
        Ok(line)
    }
}
