// Copyright (c) Contributors to the ccc project.
// SPDX-License-Identifier: Apache-2.0

//! Implementation of the `ccc run` command.

use clap::Args;
use colored::Colorize;
use miette::Result;

use crate::ProjectFlags;

#[cfg(test)]
#[path = "./cmd_run_test.rs"]
mod cmd_run_test;

/// The steps `ccc run` goes through, in order.
pub const PIPELINE: [ccc::Step; 4] = [
    ccc::Step::InstallDeps,
    ccc::Step::ConfigureBuild,
    ccc::Step::RunBuild,
    ccc::Step::RunTests,
];

/// Parse a step name, accepting only steps that `ccc run` goes through.
fn parse_pipeline_step(name: &str) -> std::result::Result<ccc::Step, String> {
    let step: ccc::Step = name.parse()?;
    if PIPELINE.contains(&step) {
        return Ok(step);
    }
    let names: Vec<_> = PIPELINE.iter().map(ccc::Step::section).collect();
    Err(format!(
        "'{step}' is not part of the pipeline (expected one of: {})",
        names.join(", ")
    ))
}

/// Install dependencies, configure, build and test
#[derive(Debug, Args)]
pub struct CmdRun {
    /// Stop after this step (install_deps, configure_build, run_build, run_tests)
    #[clap(long, value_parser = parse_pipeline_step)]
    until: Option<ccc::Step>,
}

impl CmdRun {
    pub fn run(&mut self, project: &ProjectFlags) -> Result<i32> {
        let (settings, _) = project.resolve()?;
        self.run_pipeline(&settings, !project.no_run)
    }

    /// Execute the pipeline steps in order, stopping at the first nonzero exit
    /// code or after the `--until` step.
    pub fn run_pipeline(&self, settings: &ccc::Settings, run: bool) -> Result<i32> {
        for step in PIPELINE {
            println!("{} {}", "==>".green().bold(), step.to_string().bold());
            if let Some(code) = step.execute(settings, run)? {
                if code != 0 {
                    eprintln!("{} {step} exited with code {code}", "error:".red().bold());
                    return Ok(code);
                }
            }
            if self.until == Some(step) {
                tracing::debug!(%step, "stopping after requested step");
                break;
            }
        }

        Ok(0)
    }
}
