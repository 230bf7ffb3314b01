// Copyright (c) Contributors to the ccc project.
// SPDX-License-Identifier: Apache-2.0

//! Finding and classifying test executables in a build tree.

use std::path::{Path, PathBuf};
use std::process::Command;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::filter::{self, compile_patterns, name_matches_any};
use crate::{Error, Result};

#[cfg(test)]
#[path = "./binaries_test.rs"]
mod binaries_test;

/// Names that are treated as tests when nothing else is configured.
pub const DEFAULT_INCLUDE_PATTERNS: &[&str] = &["*test*", "*Test*"];

/// Text in the inspector's output that marks a binary with debug symbols.
const DEBUG_INFO_MARKER: &str = "with debug_info";

/// True for a regular file that can be run.
#[cfg(unix)]
pub fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

/// True for a regular file that can be run.
#[cfg(not(unix))]
pub fn is_executable(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("exe"))
}

/// True for an executable that `inspector` reports as carrying debug symbols.
pub fn is_debug_executable(path: &Path, inspector: &str) -> Result<bool> {
    if !is_executable(path) {
        return Ok(false);
    }
    let path = dunce::canonicalize(path)?;
    let output = Command::new(inspector)
        .arg(&path)
        .output()
        .map_err(|error| Error::Spawn {
            program: PathBuf::from(inspector),
            error,
        })?;
    let report = String::from_utf8_lossy(&output.stdout);
    Ok(report.contains(DEBUG_INFO_MARKER))
}

/// Include and exclude globs matched against executable names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinaryPatterns {
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl Default for BinaryPatterns {
    fn default() -> Self {
        Self {
            include: DEFAULT_INCLUDE_PATTERNS.iter().map(|p| p.to_string()).collect(),
            exclude: Vec::new(),
        }
    }
}

/// The result of [`BinaryPatterns::classify`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestBinaries {
    /// Matched an include pattern and no exclude pattern.
    pub included: Vec<PathBuf>,
    /// Matched an include pattern and an exclude pattern.
    pub excluded: Vec<PathBuf>,
    /// Matched no include pattern.
    pub unmatched: Vec<PathBuf>,
}

impl BinaryPatterns {
    pub fn new<I, E, S>(include: I, exclude: E) -> Self
    where
        I: IntoIterator<Item = S>,
        E: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            include: include.into_iter().map(Into::into).collect(),
            exclude: exclude.into_iter().map(Into::into).collect(),
        }
    }

    /// Sort `paths` by how their names match the patterns, keeping order.
    pub fn classify<I>(&self, paths: I) -> Result<TestBinaries>
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let included = filter::filename_matches(&self.include)?;
        let excluded = filter::filename_matches(&self.exclude)?;

        let mut binaries = TestBinaries::default();
        for path in paths {
            if !included.matches(&path) {
                binaries.unmatched.push(path);
            } else if excluded.matches(&path) {
                binaries.excluded.push(path);
            } else {
                binaries.included.push(path);
            }
        }
        Ok(binaries)
    }
}

/// Walk `dir` for executables and classify them by name.
///
/// With a `debug_inspector`, only executables that it reports as having debug
/// symbols are considered.
pub fn find_test_binaries(
    dir: &Path,
    patterns: &BinaryPatterns,
    debug_inspector: Option<&str>,
) -> Result<TestBinaries> {
    let executables = filter::is_file().and(filter::is_executable());

    let mut candidates = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!(%err, "skipping unreadable entry");
                continue;
            }
        };
        let path = entry.into_path();
        if !executables.matches(&path) {
            continue;
        }
        if let Some(inspector) = debug_inspector {
            if !is_debug_executable(&path, inspector)? {
                tracing::debug!(path = %path.display(), "no debug symbols");
                continue;
            }
        }
        candidates.push(path);
    }

    let binaries = patterns.classify(candidates)?;
    for path in &binaries.excluded {
        tracing::debug!(path = %path.display(), "excluded by pattern");
    }
    Ok(binaries)
}

/// The arguments configured for `exe`, from every pattern that matches its
/// name, in table order.
pub fn arguments_for(exe: &Path, table: &IndexMap<String, Vec<String>>) -> Result<Vec<String>> {
    let mut args = Vec::new();
    for (pattern, pattern_args) in table {
        let compiled = compile_patterns([pattern])?;
        if name_matches_any(exe, &compiled) {
            args.extend(pattern_args.iter().cloned());
        }
    }
    Ok(args)
}
