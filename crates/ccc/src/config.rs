// Copyright (c) Contributors to the ccc project.
// SPDX-License-Identifier: Apache-2.0

//! Default values and the per-invocation settings lifecycle.
//!
//! Settings are built in layers, later layers winning:
//!
//! 1. `/directories/root`, from the nearest `.git` or `CMakeLists.txt`
//! 2. `/system` and `/shell`, from the host identity
//! 3. conventional defaults, either concrete or declared unset
//! 4. every `ccc.yml` from the filesystem root down to the start directory
//! 5. `key : value` overrides from the command line
//! 6. derived paths (build directory, scripts directory, project files) for
//!    whatever is still missing

use std::path::{Path, PathBuf};

use crate::binaries::DEFAULT_INCLUDE_PATTERNS;
use crate::discovery::{self, find_file_at_or_below, find_project_root};
use crate::settings::{LookupMode, Node, Settings};
use crate::steps::Step;
use crate::system::HostIdentity;
use crate::{CONFIG_BASENAME, Result};

#[cfg(test)]
#[path = "./config_test.rs"]
mod config_test;

/// Tables whose relative paths are anchored to the start directory.
const PATH_TABLES: &[&str] = &["directories", "files"];

/// Name of the build directory for a build type and system.
pub fn make_build_dir_name(build_type: &str, system: &str) -> String {
    format!("build-{system}-{build_type}").to_lowercase()
}

/// Write `/system` and `/shell` from `identity`; unless `overwrite`, only
/// where no value is present.
pub fn set_defaults(
    settings: &mut Settings,
    identity: &HostIdentity,
    overwrite: bool,
) -> Result<()> {
    if overwrite || !settings.contains("/system") {
        settings.set("/system", identity.system.name())?;
    }
    if overwrite || !settings.contains("/shell") {
        settings.set("/shell", identity.shell.path())?;
    }
    Ok(())
}

/// Declare every conventional key, leaving values that are already present.
pub fn declare_defaults(settings: &mut Settings) -> Result<()> {
    let no_args: Vec<String> = Vec::new();

    settings.declare("/build_type", "Debug")?;

    settings.declare("/conan/cmd", "conan")?;
    settings.declare("/conan/args", Node::unset(Some("computed by install_deps")))?;
    settings.declare("/conan/extra_args", no_args.clone())?;

    settings.declare("/cmake/cmd", "cmake")?;
    settings.declare("/cmake/args", Node::unset(Some("computed by configure_build")))?;
    settings.declare("/cmake/extra_args", no_args.clone())?;
    settings.declare("/cmake/build/args", Node::unset(Some("computed by run_build")))?;
    settings.declare("/cmake/build/extra_args", no_args.clone())?;
    settings.declare("/cmake/install/args", Node::unset(Some("computed by install")))?;
    settings.declare("/cmake/install/extra_args", no_args.clone())?;

    settings.declare("/install/prefix", Node::unset(Some("cmake's default prefix")))?;

    settings.declare("/run_tests/include_patterns", DEFAULT_INCLUDE_PATTERNS.to_vec())?;
    settings.declare("/run_tests/exclude_patterns", no_args)?;
    settings.declare("/run_tests/args", Node::table())?;

    settings.declare(
        "/debug_tests/include_patterns",
        Node::unset(Some("falls back to /run_tests/include_patterns")),
    )?;
    settings.declare(
        "/debug_tests/exclude_patterns",
        Node::unset(Some("falls back to /run_tests/exclude_patterns")),
    )?;
    settings.declare("/debug_tests/debugger/cmd", "gdb")?;
    settings.declare("/debug_tests/debugger/args", vec!["--args"])?;
    settings.declare("/debug_tests/inspect/cmd", "file")?;

    for step in Step::ALL {
        settings.declare(step.script_name_key(), step.default_script_name())?;
    }
    Ok(())
}

/// `/directories/build` from the root, build type and system.
pub fn set_default_build_dir(settings: &mut Settings) -> Result<()> {
    let root: PathBuf = settings.get_or("/directories/root", PathBuf::new())?;
    let build_type: String = settings.get_or("/build_type", "unknown".to_string())?;
    let system: String = settings.get_or("/system", "unknown".to_string())?;
    settings.set(
        "/directories/build",
        root.join(make_build_dir_name(&build_type, &system)),
    )
}

fn first_below(settings: &Settings, names: &[&str]) -> Result<Option<PathBuf>> {
    let root: PathBuf = settings.get_or("/directories/root", PathBuf::new())?;
    Ok(names
        .iter()
        .find_map(|name| find_file_at_or_below(&root, name).next()))
}

/// `/files/conanfile`: the first conanfile.py below the root, or else the
/// first conanfile.txt.
pub fn set_default_conanfile(settings: &mut Settings) -> Result<()> {
    if let Some(file) = first_below(settings, &["conanfile.py", "conanfile.txt"])? {
        settings.set("/files/conanfile", file)?;
    }
    Ok(())
}

/// `/files/CMakeLists.txt`: the first CMakeLists.txt below the root.
pub fn set_default_cmakefile(settings: &mut Settings) -> Result<()> {
    if let Some(file) = first_below(settings, &["CMakeLists.txt"])? {
        settings.set("/files/CMakeLists.txt", file)?;
    }
    Ok(())
}

/// Rewrite relative paths in the path tables as children of `base`.
fn anchor_relative_paths(settings: &mut Settings, base: &Path) -> Result<()> {
    let paths: Vec<_> = settings
        .leaf_paths()
        .filter(|path| {
            path.segments().len() == 2 && PATH_TABLES.contains(&path.segments()[0].as_str())
        })
        .collect();
    for path in paths {
        let Some(value) = settings.get_opt::<_, PathBuf>(&path)? else {
            continue;
        };
        if value.is_relative() {
            settings.set(&path, base.join(value))?;
        }
    }
    Ok(())
}

/// Build the settings for one invocation started in `start_dir`.
///
/// Returns the settings, switched to strict lookups, and the config files
/// that were applied.
pub fn resolve<S: AsRef<str>>(
    start_dir: &Path,
    identity: &HostIdentity,
    overrides: &[S],
) -> Result<(Settings, Vec<PathBuf>)> {
    let start_dir = discovery::resolve_start_path(start_dir);
    let mut settings = Settings::new();

    let root = find_project_root(&start_dir).unwrap_or_else(|| start_dir.clone());
    settings.set("/directories/root", &root)?;
    set_defaults(&mut settings, identity, true)?;
    declare_defaults(&mut settings)?;

    let files = discovery::load_config_files(&mut settings, &start_dir, CONFIG_BASENAME)?;

    for text in overrides {
        let (key, value) = discovery::parse_override(text.as_ref())?;
        tracing::debug!(%key, "applying override");
        settings.set(key, value)?;
    }

    anchor_relative_paths(&mut settings, &start_dir)?;
    if !settings.contains("/directories/build") {
        set_default_build_dir(&mut settings)?;
    }
    if !settings.contains("/directories/scripts") {
        let root: PathBuf = settings.get_or("/directories/root", root)?;
        settings.set("/directories/scripts", root)?;
    }
    if !settings.contains("/files/conanfile") {
        set_default_conanfile(&mut settings)?;
    }
    if !settings.contains("/files/CMakeLists.txt") {
        set_default_cmakefile(&mut settings)?;
    }

    settings.set_mode(LookupMode::Strict);
    Ok((settings, files))
}
