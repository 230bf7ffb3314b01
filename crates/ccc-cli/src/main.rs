// Copyright (c) Contributors to the ccc project.
// SPDX-License-Identifier: Apache-2.0

//! ccc - Conan/CMake C++ project build helper CLI

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::Result;

mod cmd_run;
mod cmd_show;
mod cmd_step;

use cmd_run::CmdRun;
use cmd_show::CmdShow;
use cmd_step::CmdStep;

#[cfg(test)]
#[path = "./main_test.rs"]
mod main_test;

#[derive(Parser)]
#[clap(
    name = "ccc",
    about = "Conan/CMake C++ project build helper",
    version,
    long_about = "Generate and run the conan and cmake scripts of a C++ project from layered ccc.yml files"
)]
struct Opt {
    #[clap(flatten)]
    logging: Logging,

    #[clap(flatten)]
    project: ProjectFlags,

    #[clap(subcommand)]
    cmd: Command,
}

#[derive(Parser)]
struct Logging {
    /// Increase verbosity (-v, -vv, -vvv)
    #[clap(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[clap(short, long, global = true)]
    quiet: bool,
}

#[derive(Parser, Clone, Debug, Default)]
pub struct ProjectFlags {
    /// Resolve settings as if started in DIR
    #[clap(short = 'C', long = "directory", global = true, default_value = ".")]
    pub directory: PathBuf,

    /// Override a setting ('/key/path : value', repeatable)
    #[clap(short = 'c', long = "config", global = true)]
    pub config: Vec<String>,

    /// Write the scripts without running them
    #[clap(long = "no-run", global = true)]
    pub no_run: bool,
}

impl ProjectFlags {
    /// Settings for this invocation and the config files they came from.
    pub fn resolve(&self) -> Result<(ccc::Settings, Vec<PathBuf>)> {
        let identity = ccc::HostIdentity::detect()?;
        tracing::debug!(system = %identity.system, shell = %identity.shell, "host identity");
        Ok(ccc::resolve(&self.directory, &identity, &self.config)?)
    }
}

#[derive(Subcommand)]
enum Command {
    /// Install dependencies with conan
    InstallDeps(CmdStep),

    /// Configure the build directory with cmake
    Configure(CmdStep),

    /// Compile the project
    Build(CmdStep),

    /// Run the test executables
    Test(CmdStep),

    /// Run the test executables under a debugger
    Debug(CmdStep),

    /// Install the build
    Install(CmdStep),

    /// Install dependencies, configure, build and test
    Run(CmdRun),

    /// Display the resolved settings
    Show(CmdShow),
}

impl Opt {
    fn run(self) -> Result<i32> {
        // Setup logging
        let log_level = match (self.logging.quiet, self.logging.verbose) {
            (true, _) => tracing::Level::ERROR,
            (false, 0) => tracing::Level::WARN,
            (false, 1) => tracing::Level::INFO,
            (false, 2) => tracing::Level::DEBUG,
            (false, _) => tracing::Level::TRACE,
        };

        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_writer(std::io::stderr)
            .init();

        // Dispatch to command
        let project = &self.project;
        match self.cmd {
            Command::InstallDeps(mut cmd) => cmd.run(ccc::Step::InstallDeps, project),
            Command::Configure(mut cmd) => cmd.run(ccc::Step::ConfigureBuild, project),
            Command::Build(mut cmd) => cmd.run(ccc::Step::RunBuild, project),
            Command::Test(mut cmd) => cmd.run(ccc::Step::RunTests, project),
            Command::Debug(mut cmd) => cmd.run(ccc::Step::DebugTests, project),
            Command::Install(mut cmd) => cmd.run(ccc::Step::Install, project),
            Command::Run(mut cmd) => cmd.run(project),
            Command::Show(mut cmd) => cmd.run(project),
        }
    }
}

fn main() -> Result<()> {
    let opt = Opt::parse();
    let code = opt.run()?;
    std::process::exit(code);
}
