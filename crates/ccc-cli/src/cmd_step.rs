// Copyright (c) Contributors to the ccc project.
// SPDX-License-Identifier: Apache-2.0

//! Implementation of the single step commands (`ccc build`, `ccc test`, ...).

use std::path::PathBuf;

use clap::Args;
use colored::Colorize;
use miette::{IntoDiagnostic, Result};

use crate::ProjectFlags;

/// Write one step's script and run it
#[derive(Debug, Args)]
pub struct CmdStep {
    /// Print the generated script
    #[clap(long)]
    print: bool,
}

impl CmdStep {
    pub fn run(&mut self, step: ccc::Step, project: &ProjectFlags) -> Result<i32> {
        let (settings, _) = project.resolve()?;
        let code = step.execute(&settings, !project.no_run)?;

        if self.print {
            let scripts_dir: PathBuf = settings.require("/directories/scripts", step.section())?;
            let name: String = settings.require(step.script_name_key(), step.section())?;
            let path = scripts_dir.join(name);
            let text = std::fs::read_to_string(&path).into_diagnostic()?;
            println!("{}", format!("# {}", path.display()).dimmed());
            println!("{text}");
        }

        match code {
            Some(0) | None => Ok(0),
            Some(code) => {
                eprintln!("{} {step} exited with code {code}", "error:".red().bold());
                Ok(code)
            }
        }
    }
}
