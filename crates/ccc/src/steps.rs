// Copyright (c) Contributors to the ccc project.
// SPDX-License-Identifier: Apache-2.0

//! The build pipeline: one generated script per step.
//!
//! Every step reads what it needs from the settings tree, writes a script into
//! `/directories/scripts` and optionally runs it with `/shell`. All required
//! settings are checked before anything is written.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::str::FromStr;

use indexmap::IndexMap;

use crate::binaries::{self, BinaryPatterns};
use crate::command::{CmdGenerator, relative_path, shell_join};
use crate::script::Script;
use crate::settings::Settings;
use crate::system::{Shell, System};
use crate::{Error, Result};

#[cfg(test)]
#[path = "./steps_test.rs"]
mod steps_test;

/// A stage of the build pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    InstallDeps,
    ConfigureBuild,
    RunBuild,
    RunTests,
    DebugTests,
    Install,
}

impl Step {
    pub const ALL: [Step; 6] = [
        Step::InstallDeps,
        Step::ConfigureBuild,
        Step::RunBuild,
        Step::RunTests,
        Step::DebugTests,
        Step::Install,
    ];

    /// The settings table that configures this step.
    pub fn section(&self) -> &'static str {
        match self {
            Step::InstallDeps => "install_deps",
            Step::ConfigureBuild => "configure_build",
            Step::RunBuild => "run_build",
            Step::RunTests => "run_tests",
            Step::DebugTests => "debug_tests",
            Step::Install => "install",
        }
    }

    pub fn default_script_name(&self) -> &'static str {
        match self {
            Step::InstallDeps => "01-install_deps",
            Step::ConfigureBuild => "02-configure_build",
            Step::RunBuild => "03-run_build",
            Step::RunTests => "04-run_tests",
            Step::DebugTests => "05-debug_tests",
            Step::Install => "05-install",
        }
    }

    pub fn script_name_key(&self) -> String {
        format!("/{}/script_name", self.section())
    }

    /// Whether the build directory must already exist.
    fn needs_build_dir(&self) -> bool {
        !matches!(self, Step::InstallDeps | Step::ConfigureBuild)
    }

    /// Write this step's script, and run it when `run` is set.
    pub fn execute(&self, settings: &Settings, run: bool) -> Result<Option<i32>> {
        match self {
            Step::InstallDeps => install_deps(settings, run),
            Step::ConfigureBuild => configure_build(settings, run),
            Step::RunBuild => run_build(settings, run),
            Step::RunTests => run_tests(settings, run),
            Step::DebugTests => debug_tests(settings, run),
            Step::Install => install(settings, run),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.section())
    }
}

impl FromStr for Step {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Step::ALL
            .into_iter()
            .find(|step| step.section() == s)
            .ok_or_else(|| format!("unknown step '{s}'"))
    }
}

/// Changes the process working directory until dropped.
#[derive(Debug)]
pub struct WorkingDirectory {
    previous: PathBuf,
}

impl WorkingDirectory {
    pub fn enter(dir: &Path) -> Result<Self> {
        let previous = std::env::current_dir()?;
        std::env::set_current_dir(dir).map_err(|error| Error::EnterDirectory {
            path: dir.to_path_buf(),
            error,
        })?;
        tracing::debug!(dir = %dir.display(), "entered directory");
        Ok(Self { previous })
    }
}

impl Drop for WorkingDirectory {
    fn drop(&mut self) {
        if let Err(err) = std::env::set_current_dir(&self.previous) {
            tracing::warn!(
                %err,
                dir = %self.previous.display(),
                "failed to restore working directory"
            );
        }
    }
}

/// Substitute `{name}` placeholders in `arg`.
///
/// `{{` and `}}` stand for literal braces.
pub fn expand_placeholders(arg: &str, values: &[(&str, &str)]) -> Result<String> {
    let invalid = |reason: String| Error::InvalidArgumentTemplate {
        arg: arg.to_string(),
        reason,
    };

    let mut expanded = String::with_capacity(arg.len());
    let mut chars = arg.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                expanded.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                expanded.push('}');
            }
            '{' => {
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(c) => name.push(c),
                        None => return Err(invalid("unclosed '{'".to_string())),
                    }
                }
                let Some((_, value)) = values.iter().find(|(key, _)| *key == name) else {
                    return Err(invalid(format!("unknown placeholder '{{{name}}}'")));
                };
                expanded.push_str(value);
            }
            '}' => return Err(invalid("unmatched '}'".to_string())),
            c => expanded.push(c),
        }
    }
    Ok(expanded)
}

fn expand_all(args: &[String], values: &[(&str, &str)]) -> Result<Vec<String>> {
    args.iter()
        .map(|arg| expand_placeholders(arg, values))
        .collect()
}

/// Everything a step needs before it starts writing.
struct StepContext {
    step: Step,
    build_dir: PathBuf,
    scripts_dir: PathBuf,
    shell: Shell,
    generator: CmdGenerator,
    script_name: String,
    build_type: String,
}

impl StepContext {
    fn prepare(settings: &Settings, step: Step) -> Result<Self> {
        let section = step.section();
        let build_dir: PathBuf = settings.require("/directories/build", section)?;
        let build_dir = std::path::absolute(build_dir)?;
        if step.needs_build_dir() && !build_dir.is_dir() {
            return Err(Error::DirectoryNotFound(build_dir));
        }
        let scripts_dir: PathBuf = settings.require("/directories/scripts", section)?;
        let scripts_dir = std::path::absolute(scripts_dir)?;
        let system: System = settings.require("/system", section)?;
        let shell: Shell = settings.require("/shell", section)?;
        let script_name: String =
            settings.get_or(step.script_name_key(), step.default_script_name().to_string())?;
        let build_type: String = settings.get_or("/build_type", "Debug".to_string())?;

        Ok(Self {
            step,
            build_dir,
            scripts_dir,
            generator: CmdGenerator::new(system, shell.clone()),
            shell,
            script_name,
            build_type,
        })
    }

    fn build_parent(&self) -> &Path {
        self.build_dir.parent().unwrap_or(&self.build_dir)
    }

    fn build_name(&self) -> PathBuf {
        relative_path(&self.build_dir, self.build_parent())
    }

    /// A script that starts inside the build directory, creating it first
    /// when `create` is set.
    fn enter_build_dir(&self, create: bool) -> Script {
        let mut script = Script::new(self.generator.clone());
        script.cd(self.build_parent());
        if create {
            script.mkdir(self.build_name(), true);
        }
        script.cd(self.build_name());
        script
    }

    fn build_dir_display(&self) -> String {
        self.build_dir.to_string_lossy().into_owned()
    }

    /// Write the script in the scripts directory and run it if asked.
    fn finish(&self, script: &Script, run: bool) -> Result<Option<i32>> {
        let _cwd = WorkingDirectory::enter(&self.scripts_dir)?;
        let script_path = PathBuf::from(&self.script_name);
        script.write(&script_path, true)?;
        if !run {
            return Ok(None);
        }
        run_script(&self.shell, &script_path, self.step).map(Some)
    }
}

/// The exit code of a finished script; signals map to `128 + signal`.
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}

fn run_script(shell: &Shell, script: &Path, step: Step) -> Result<i32> {
    let (program, args) = shell.command_for_script(script);
    tracing::info!(%step, shell = %program.display(), script = %script.display(), "running script");
    let status = std::process::Command::new(&program)
        .args(&args)
        .status()
        .map_err(|error| Error::Spawn { program, error })?;
    let code = exit_code(status);
    tracing::debug!(%step, code, "script finished");
    Ok(code)
}

/// Install dependencies with conan into the build directory.
pub fn install_deps(settings: &Settings, run: bool) -> Result<Option<i32>> {
    let ctx = StepContext::prepare(settings, Step::InstallDeps)?;
    let conanfile: PathBuf = settings.require("/files/conanfile", Step::InstallDeps.section())?;
    let conanfile = std::path::absolute(conanfile)?;
    let conan_dir = relative_path(conanfile.parent().unwrap_or(&conanfile), &ctx.build_dir);
    let conan_dir = conan_dir.to_string_lossy();
    let build_dir = ctx.build_dir_display();
    let values = [
        ("conan_dir", &*conan_dir),
        ("build_type", ctx.build_type.as_str()),
        ("build_dir", build_dir.as_str()),
    ];

    let args = match settings.get_opt::<_, Vec<String>>("/conan/args")? {
        Some(args) => expand_all(&args, &values)?,
        None => vec![
            "install".to_string(),
            conan_dir.to_string(),
            "-pr:b=default".to_string(),
            "-s".to_string(),
            format!("build_type={}", ctx.build_type),
        ],
    };
    let extra_args: Vec<String> = settings.get_or("/conan/extra_args", Vec::new())?;

    let mut command = vec![settings.get_or("/conan/cmd", "conan".to_string())?];
    command.extend(args);
    command.extend(expand_all(&extra_args, &values)?);

    let mut script = ctx.enter_build_dir(true);
    script.add_args(command);
    ctx.finish(&script, run)
}

/// Generate the build system with cmake.
pub fn configure_build(settings: &Settings, run: bool) -> Result<Option<i32>> {
    let ctx = StepContext::prepare(settings, Step::ConfigureBuild)?;
    let cmakefile: PathBuf =
        settings.require("/files/CMakeLists.txt", Step::ConfigureBuild.section())?;
    let cmakefile = std::path::absolute(cmakefile)?;
    let cmake_dir = relative_path(cmakefile.parent().unwrap_or(&cmakefile), &ctx.build_dir);
    let cmake_dir = cmake_dir.to_string_lossy();
    let build_dir = ctx.build_dir_display();
    let values = [
        ("cmake_dir", &*cmake_dir),
        ("build_type", ctx.build_type.as_str()),
        ("build_dir", build_dir.as_str()),
    ];

    let args = match settings.get_opt::<_, Vec<String>>("/cmake/args")? {
        Some(args) => expand_all(&args, &values)?,
        None => {
            let mut args = vec![cmake_dir.to_string()];
            if ctx.build_dir.join("conan_toolchain.cmake").exists() {
                args.push("-DCMAKE_TOOLCHAIN_FILE=conan_toolchain.cmake".to_string());
            }
            args.push(format!("-DCMAKE_BUILD_TYPE={}", ctx.build_type));
            args
        }
    };
    let extra_args: Vec<String> = settings.get_or("/cmake/extra_args", Vec::new())?;

    let mut command = vec![settings.get_or("/cmake/cmd", "cmake".to_string())?];
    command.extend(args);
    command.extend(expand_all(&extra_args, &values)?);

    let mut script = ctx.enter_build_dir(true);
    script.activate_build_environment(&ctx.build_dir, &ctx.build_dir);
    script.add_args(command);
    script.deactivate_build_environment(&ctx.build_dir, &ctx.build_dir);
    ctx.finish(&script, run)
}

/// A `cmake <default args>` command where user given args replace the
/// defaults, followed by extra args.
fn cmake_command(
    settings: &Settings,
    ctx: &StepContext,
    table: &str,
    default_args: Vec<String>,
) -> Result<Vec<String>> {
    let build_dir = ctx.build_dir_display();
    let values = [
        ("build_type", ctx.build_type.as_str()),
        ("build_dir", build_dir.as_str()),
    ];
    let args = match settings.get_opt::<_, Vec<String>>(format!("{table}/args"))? {
        Some(args) => expand_all(&args, &values)?,
        None => default_args,
    };
    let extra_args: Vec<String> = settings.get_or(format!("{table}/extra_args"), Vec::new())?;

    let mut command = vec![settings.get_or("/cmake/cmd", "cmake".to_string())?];
    command.extend(args);
    command.extend(expand_all(&extra_args, &values)?);
    Ok(command)
}

/// Compile the configured build directory.
pub fn run_build(settings: &Settings, run: bool) -> Result<Option<i32>> {
    let ctx = StepContext::prepare(settings, Step::RunBuild)?;
    let command = cmake_command(
        settings,
        &ctx,
        "/cmake/build",
        vec!["--build".to_string(), ".".to_string()],
    )?;

    let mut script = ctx.enter_build_dir(false);
    script.activate_build_environment(&ctx.build_dir, &ctx.build_dir);
    script.add_args(command);
    script.deactivate_build_environment(&ctx.build_dir, &ctx.build_dir);
    ctx.finish(&script, run)
}

/// Install the build with `cmake --install`.
pub fn install(settings: &Settings, run: bool) -> Result<Option<i32>> {
    let ctx = StepContext::prepare(settings, Step::Install)?;
    let mut default_args = vec!["--install".to_string(), ".".to_string()];
    if let Some(prefix) = settings.get_opt::<_, PathBuf>("/install/prefix")? {
        let prefix = std::path::absolute(prefix)?;
        default_args.push("--prefix".to_string());
        default_args.push(prefix.to_string_lossy().into_owned());
    }
    let command = cmake_command(settings, &ctx, "/cmake/install", default_args)?;

    let mut script = ctx.enter_build_dir(false);
    script.activate_build_environment(&ctx.build_dir, &ctx.build_dir);
    script.add_args(command);
    script.deactivate_build_environment(&ctx.build_dir, &ctx.build_dir);
    ctx.finish(&script, run)
}

/// Run every test executable found in the build directory.
pub fn run_tests(settings: &Settings, run: bool) -> Result<Option<i32>> {
    let ctx = StepContext::prepare(settings, Step::RunTests)?;
    let default_include = BinaryPatterns::default().include;
    let patterns = BinaryPatterns::new(
        settings.get_or::<_, Vec<String>>("/run_tests/include_patterns", default_include)?,
        settings.get_or::<_, Vec<String>>("/run_tests/exclude_patterns", Vec::new())?,
    );
    let args_table: IndexMap<String, Vec<String>> =
        settings.get_or("/run_tests/args", IndexMap::new())?;
    let build_dir = ctx.build_dir_display();
    let values = [
        ("build_type", ctx.build_type.as_str()),
        ("build_dir", build_dir.as_str()),
    ];

    let binaries = binaries::find_test_binaries(&ctx.build_dir, &patterns, None)?;
    let mut script = ctx.enter_build_dir(false);
    script.activate_run_environment(&ctx.build_dir, &ctx.build_dir);
    for exe in &binaries.included {
        tracing::info!(exe = %exe.display(), "found test executable");
        let args = expand_all(&binaries::arguments_for(exe, &args_table)?, &values)?;
        script.invoke(exe, &ctx.build_dir, &args);
    }
    script.deactivate_run_environment(&ctx.build_dir, &ctx.build_dir);
    ctx.finish(&script, run)
}

/// Start each test executable with debug symbols under the debugger.
pub fn debug_tests(settings: &Settings, run: bool) -> Result<Option<i32>> {
    let ctx = StepContext::prepare(settings, Step::DebugTests)?;
    let include: Vec<String> = match settings.get_opt("/debug_tests/include_patterns")? {
        Some(patterns) => patterns,
        None => settings.get_or("/run_tests/include_patterns", BinaryPatterns::default().include)?,
    };
    let exclude: Vec<String> = match settings.get_opt("/debug_tests/exclude_patterns")? {
        Some(patterns) => patterns,
        None => settings.get_or("/run_tests/exclude_patterns", Vec::new())?,
    };
    let patterns = BinaryPatterns::new(include, exclude);
    let args_table: IndexMap<String, Vec<String>> =
        settings.get_or("/run_tests/args", IndexMap::new())?;
    let mut debugger = vec![settings.get_or("/debug_tests/debugger/cmd", "gdb".to_string())?];
    debugger.extend(settings.get_or::<_, Vec<String>>(
        "/debug_tests/debugger/args",
        vec!["--args".to_string()],
    )?);
    let inspector: String = settings.get_or("/debug_tests/inspect/cmd", "file".to_string())?;
    let build_dir = ctx.build_dir_display();
    let values = [
        ("build_type", ctx.build_type.as_str()),
        ("build_dir", build_dir.as_str()),
    ];

    let binaries =
        binaries::find_test_binaries(&ctx.build_dir, &patterns, Some(inspector.as_str()))?;
    let mut script = ctx.enter_build_dir(false);
    script.activate_run_environment(&ctx.build_dir, &ctx.build_dir);
    for exe in &binaries.included {
        tracing::info!(exe = %exe.display(), "found debuggable test executable");
        let args = expand_all(&binaries::arguments_for(exe, &args_table)?, &values)?;
        let debugger = shell_join(&debugger);
        let exe = exe.clone();
        let from_dir = ctx.build_dir.clone();
        script.add_deferred(move |g| {
            let invocation = g.invoke(&exe, &from_dir, &args)?;
            Ok(Some(format!("{debugger} {invocation}")))
        });
    }
    script.deactivate_run_environment(&ctx.build_dir, &ctx.build_dir);
    ctx.finish(&script, run)
}
