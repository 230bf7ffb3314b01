// Copyright (c) Contributors to the ccc project.
// SPDX-License-Identifier: Apache-2.0

//! Implementation of the `ccc show` command.

use std::io::Write;
use std::path::PathBuf;

use clap::{Args, ValueEnum};
use colored::Colorize;
use miette::{IntoDiagnostic, Result};

use crate::ProjectFlags;

#[cfg(test)]
#[path = "./cmd_show_test.rs"]
mod cmd_show_test;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Table,
    Yaml,
    Json,
}

/// Display the resolved settings
#[derive(Debug, Args)]
pub struct CmdShow {
    /// Show only the config files that were applied
    #[clap(long)]
    files: bool,

    /// Output format
    #[clap(long, value_enum, default_value_t = Format::Table)]
    format: Format,
}

impl CmdShow {
    pub fn run(&mut self, project: &ProjectFlags) -> Result<i32> {
        let (settings, files) = project.resolve()?;
        let mut out = std::io::stdout().lock();
        self.render(&settings, &files, &mut out)?;
        Ok(0)
    }

    /// Write the settings and the files they came from in the chosen format.
    pub fn render(
        &self,
        settings: &ccc::Settings,
        files: &[PathBuf],
        out: &mut impl Write,
    ) -> Result<()> {
        match self.format {
            Format::Table => self.show_table(settings, files, out),
            Format::Yaml => self.show_yaml(settings, files, out),
            Format::Json => self.show_json(settings, files, out),
        }
    }

    fn show_table(
        &self,
        settings: &ccc::Settings,
        files: &[PathBuf],
        out: &mut impl Write,
    ) -> Result<()> {
        writeln!(out, "{}", "Config Files:".bold()).into_diagnostic()?;
        writeln!(out).into_diagnostic()?;
        if files.is_empty() {
            writeln!(out, "  {}", "(none)".dimmed()).into_diagnostic()?;
        }
        for (i, file) in files.iter().enumerate() {
            writeln!(out, "  {}. {}", i + 1, file.display().to_string().cyan())
                .into_diagnostic()?;
        }

        if self.files {
            return Ok(());
        }

        writeln!(out).into_diagnostic()?;
        writeln!(out, "{}", "Settings:".bold()).into_diagnostic()?;
        writeln!(out).into_diagnostic()?;
        for path in settings.leaf_paths() {
            let value = settings
                .get(&path)?
                .map(|node| node.to_yaml())
                .unwrap_or_default();
            let value = serde_yaml::to_string(&value).into_diagnostic()?;
            writeln!(
                out,
                "  {} = {}",
                path.to_string().cyan(),
                value.trim_end().green()
            )
            .into_diagnostic()?;
        }

        Ok(())
    }

    fn show_yaml(
        &self,
        settings: &ccc::Settings,
        files: &[PathBuf],
        out: &mut impl Write,
    ) -> Result<()> {
        writeln!(out, "# Config Files:").into_diagnostic()?;
        for file in files {
            writeln!(out, "# - {}", file.display()).into_diagnostic()?;
        }
        if self.files {
            return Ok(());
        }
        writeln!(out).into_diagnostic()?;

        let text = serde_yaml::to_string(&settings.to_yaml()).into_diagnostic()?;
        write!(out, "{text}").into_diagnostic()
    }

    fn show_json(
        &self,
        settings: &ccc::Settings,
        files: &[PathBuf],
        out: &mut impl Write,
    ) -> Result<()> {
        let files: Vec<String> = files.iter().map(|f| f.display().to_string()).collect();
        let mut output = serde_json::json!({
            "files": files,
        });
        if !self.files {
            output["settings"] = serde_json::to_value(settings.to_yaml()).into_diagnostic()?;
        }
        let text = serde_json::to_string_pretty(&output).into_diagnostic()?;
        writeln!(out, "{text}").into_diagnostic()
    }
}
