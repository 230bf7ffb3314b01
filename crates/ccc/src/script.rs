// Copyright (c) Contributors to the ccc project.
// SPDX-License-Identifier: Apache-2.0

//! Shell scripts assembled from commands that are rendered late.
//!
//! A [`Script`] records lines as they are added, but anything that depends on
//! the target system or shell is kept as a [`Command::Deferred`] closure and
//! only evaluated by [`Script::render`]. The generator can therefore be
//! swapped after the script has been built up.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::command::{CmdGenerator, shell_join};
use crate::system::System;
use crate::{Error, Result};

#[cfg(test)]
#[path = "./script_test.rs"]
mod script_test;

/// A command line produced from the generator bound at render time.
pub type DeferredFn = Box<dyn Fn(&CmdGenerator) -> Result<Option<String>>>;

/// One entry of a [`Script`].
pub enum Command {
    /// Literal text, written as is.
    Line(String),
    /// Words that are shell quoted and joined when rendered.
    Args(Vec<String>),
    /// Evaluated when rendered; `None` leaves no line behind.
    Deferred(DeferredFn),
}

impl Command {
    pub fn deferred<F>(f: F) -> Self
    where
        F: Fn(&CmdGenerator) -> Result<Option<String>> + 'static,
    {
        Self::Deferred(Box::new(f))
    }

    fn render(&self, generator: &CmdGenerator) -> Result<Option<String>> {
        match self {
            Self::Line(line) => Ok(Some(line.clone())),
            Self::Args(args) => Ok(Some(shell_join(args))),
            Self::Deferred(f) => f(generator),
        }
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Line(line) => f.debug_tuple("Line").field(line).finish(),
            Self::Args(args) => f.debug_tuple("Args").field(args).finish(),
            Self::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

impl From<String> for Command {
    fn from(line: String) -> Self {
        Self::Line(line)
    }
}

impl From<&str> for Command {
    fn from(line: &str) -> Self {
        Self::Line(line.to_string())
    }
}

impl From<Vec<String>> for Command {
    fn from(args: Vec<String>) -> Self {
        Self::Args(args)
    }
}

/// Ordered commands plus the generator they are rendered with.
#[derive(Debug)]
pub struct Script {
    commands: Vec<Command>,
    generator: CmdGenerator,
}

impl Script {
    pub fn new(generator: CmdGenerator) -> Self {
        Self {
            commands: Vec::new(),
            generator,
        }
    }

    pub fn generator(&self) -> &CmdGenerator {
        &self.generator
    }

    /// Replace the generator used by the next render.
    pub fn set_generator(&mut self, generator: CmdGenerator) {
        self.generator = generator;
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Append a command. `None` is ignored.
    pub fn add_command<C: Into<Option<Command>>>(&mut self, command: C) -> &mut Self {
        if let Some(command) = command.into() {
            self.commands.push(command);
        }
        self
    }

    pub fn add_line<S: Into<String>>(&mut self, line: S) -> &mut Self {
        self.add_command(Command::Line(line.into()))
    }

    pub fn add_args<I, S>(&mut self, args: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.add_command(Command::Args(args.into_iter().map(Into::into).collect()))
    }

    pub fn add_deferred<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&CmdGenerator) -> Result<Option<String>> + 'static,
    {
        self.add_command(Command::deferred(f))
    }

    fn add_lines<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&CmdGenerator) -> Result<Vec<String>> + 'static,
    {
        self.add_deferred(move |generator| {
            let lines = f(generator)?;
            Ok((!lines.is_empty()).then(|| lines.join("\n")))
        })
    }

    pub fn cd<P: Into<PathBuf>>(&mut self, dir: P) -> &mut Self {
        let dir = dir.into();
        self.add_deferred(move |g| g.cd(&dir).map(Some))
    }

    pub fn mkdir<P: Into<PathBuf>>(&mut self, dir: P, make_parents: bool) -> &mut Self {
        let dir = dir.into();
        self.add_deferred(move |g| g.mkdir(&dir, make_parents).map(Some))
    }

    pub fn source<P: Into<PathBuf>>(&mut self, file: P) -> &mut Self {
        let file = file.into();
        self.add_deferred(move |g| g.source(&file).map(Some))
    }

    pub fn conditionally_source_environment_script<S: AsRef<str>>(
        &mut self,
        candidates: &[(S, System)],
        script_dir: &Path,
        source_from_dir: &Path,
    ) -> &mut Self {
        let candidates: Vec<(String, System)> = candidates
            .iter()
            .map(|(name, system)| (name.as_ref().to_string(), system.clone()))
            .collect();
        let script_dir = script_dir.to_path_buf();
        let source_from_dir = source_from_dir.to_path_buf();
        self.add_lines(move |g| {
            g.conditionally_source_environment_script(&candidates, &script_dir, &source_from_dir)
        })
    }

    pub fn activate_build_environment(
        &mut self,
        script_dir: &Path,
        source_from_dir: &Path,
    ) -> &mut Self {
        let script_dir = script_dir.to_path_buf();
        let source_from_dir = source_from_dir.to_path_buf();
        self.add_lines(move |g| g.activate_build_environment(&script_dir, &source_from_dir))
    }

    pub fn deactivate_build_environment(
        &mut self,
        script_dir: &Path,
        source_from_dir: &Path,
    ) -> &mut Self {
        let script_dir = script_dir.to_path_buf();
        let source_from_dir = source_from_dir.to_path_buf();
        self.add_lines(move |g| g.deactivate_build_environment(&script_dir, &source_from_dir))
    }

    pub fn activate_run_environment(
        &mut self,
        script_dir: &Path,
        source_from_dir: &Path,
    ) -> &mut Self {
        let script_dir = script_dir.to_path_buf();
        let source_from_dir = source_from_dir.to_path_buf();
        self.add_lines(move |g| g.activate_run_environment(&script_dir, &source_from_dir))
    }

    pub fn deactivate_run_environment(
        &mut self,
        script_dir: &Path,
        source_from_dir: &Path,
    ) -> &mut Self {
        let script_dir = script_dir.to_path_buf();
        let source_from_dir = source_from_dir.to_path_buf();
        self.add_lines(move |g| g.deactivate_run_environment(&script_dir, &source_from_dir))
    }

    pub fn enable_fail_fast(&mut self) -> &mut Self {
        self.add_deferred(|g| Ok(g.enable_fail_fast()))
    }

    pub fn invoke<S: AsRef<str>>(&mut self, file: &Path, from_dir: &Path, args: &[S]) -> &mut Self {
        let (file, from_dir) = (file.to_path_buf(), from_dir.to_path_buf());
        let args: Vec<String> = args.iter().map(|a| a.as_ref().to_string()).collect();
        self.add_deferred(move |g| g.invoke(&file, &from_dir, &args).map(Some))
    }

    /// Evaluate every command against the current generator.
    ///
    /// With `fail_fast`, the generator's fail-fast directive (if the shell has
    /// one) becomes the first line.
    pub fn render(&self, fail_fast: bool) -> Result<String> {
        let mut lines = Vec::with_capacity(self.commands.len() + 1);
        if fail_fast {
            lines.extend(self.generator.enable_fail_fast());
        }
        for command in &self.commands {
            lines.extend(command.render(&self.generator)?);
        }
        Ok(lines.join("\n"))
    }

    /// Render the script and write it to `filename`.
    ///
    /// Nothing is written if rendering fails.
    pub fn write<P: AsRef<Path>>(&self, filename: P, fail_fast: bool) -> Result<()> {
        let filename = filename.as_ref();
        let text = self.render(fail_fast)?;
        std::fs::write(filename, text).map_err(|error| Error::WriteFailed {
            path: filename.to_path_buf(),
            error,
        })?;
        tracing::info!(script = %filename.display(), "wrote script");
        Ok(())
    }
}
