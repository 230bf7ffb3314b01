// Copyright (c) Contributors to the ccc project.
// SPDX-License-Identifier: Apache-2.0

//! Finding project files and loading the layered ccc.yml configuration.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use serde_yaml::Value;
use walkdir::{DirEntry, WalkDir};

#[cfg(test)]
#[path = "./discovery_test.rs"]
mod discovery_test;

use crate::settings::{Node, Settings, TreePath};
use crate::{Error, Result};

/// Files whose presence marks the root of a project, in order of preference.
pub const PROJECT_ROOT_SENTINELS: &[&str] = &[".git", "CMakeLists.txt"];

/// Resolve starting path, preferring $PWD to preserve symlinks.
pub fn resolve_start_path(start_path: &Path) -> PathBuf {
    if start_path.is_absolute() {
        start_path.to_owned()
    } else {
        match std::env::var("PWD").ok() {
            Some(pwd) => PathBuf::from(pwd).join(start_path),
            None => std::env::current_dir()
                .unwrap_or_default()
                .join(start_path),
        }
    }
}

/// Every existing `name` in `dir` and its ancestors, nearest first.
pub fn find_file_at_or_above(dir: &Path, name: &str) -> impl Iterator<Item = PathBuf> + use<> {
    let name = name.to_owned();
    std::iter::successors(Some(dir.to_path_buf()), |ancestor| {
        ancestor.parent().map(Path::to_path_buf)
    })
    .map(move |ancestor| ancestor.join(&name))
    .filter(|candidate| candidate.exists())
}

/// Files before directories, then by name.
fn files_first(a: &DirEntry, b: &DirEntry) -> Ordering {
    a.file_type()
        .is_dir()
        .cmp(&b.file_type().is_dir())
        .then_with(|| a.file_name().cmp(b.file_name()))
}

/// Every file named `name` below `dir`.
///
/// Within a directory its own match comes before those of its subdirectories,
/// so shallower files are yielded first along each branch.
pub fn find_file_at_or_below(dir: &Path, name: &str) -> impl Iterator<Item = PathBuf> + use<> {
    let name = name.to_owned();
    WalkDir::new(dir)
        .sort_by(files_first)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                tracing::warn!(%err, "skipping unreadable entry");
                None
            }
        })
        .filter(move |entry| entry.file_type().is_file() && entry.file_name() == name.as_str())
        .map(DirEntry::into_path)
}

/// The directory holding the nearest `.git`, or failing that the nearest
/// CMakeLists.txt.
pub fn find_project_root(dir: &Path) -> Option<PathBuf> {
    for sentinel in PROJECT_ROOT_SENTINELS {
        let found = find_file_at_or_above(dir, sentinel).next();
        if let Some(root) = found.as_deref().and_then(Path::parent) {
            tracing::debug!(root = %root.display(), sentinel, "found project root");
            return Some(root.to_path_buf());
        }
    }
    None
}

/// Parse one config file into a settings tree.
pub fn load_config_file(path: &Path) -> Result<Option<Settings>> {
    let text = std::fs::read_to_string(path).map_err(|error| Error::ReadFailed {
        path: path.to_path_buf(),
        error,
    })?;
    let invalid = |error| Error::InvalidYaml {
        path: path.to_path_buf(),
        error,
    };
    let value: Value = serde_yaml::from_str(&text).map_err(invalid)?;
    if value.is_null() {
        tracing::warn!(path = %path.display(), "skipping empty config file");
        return Ok(None);
    }
    Settings::from_yaml(value).map(Some).map_err(invalid)
}

/// Apply every `<basename>.yml` in `dir` and its ancestors to `settings`.
///
/// Files are applied from the filesystem root down, so the file closest to
/// `dir` wins. Returns the files that were applied, in that order.
pub fn load_config_files(
    settings: &mut Settings,
    dir: &Path,
    basename: &str,
) -> Result<Vec<PathBuf>> {
    let filename = format!("{basename}.yml");
    let mut files: Vec<PathBuf> = find_file_at_or_above(dir, &filename)
        .filter(|path| path.is_file())
        .collect();
    files.sort_by_key(|path| path.components().count());

    let mut applied = Vec::with_capacity(files.len());
    for file in files {
        let Some(layer) = load_config_file(&file)? else {
            continue;
        };
        tracing::debug!(file = %file.display(), "applying config file");
        settings.update(&layer);
        applied.push(file);
    }
    Ok(applied)
}

/// Parse a `key : value` override given on the command line.
///
/// The text is read as a one entry YAML mapping, so quoting and sequences
/// work as they do in a config file.
pub fn parse_override(text: &str) -> Result<(TreePath, Node)> {
    let invalid = || Error::InvalidOverride(text.to_string());
    let value: Value = serde_yaml::from_str(text).map_err(|_| invalid())?;
    let Value::Mapping(mapping) = value else {
        return Err(invalid());
    };
    if mapping.len() != 1 {
        return Err(invalid());
    }
    match mapping.into_iter().next() {
        Some((Value::String(key), value)) => Ok((TreePath::parse(&key), Node::from_yaml(value))),
        _ => Err(invalid()),
    }
}
