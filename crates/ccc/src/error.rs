// Copyright (c) Contributors to the ccc project.
// SPDX-License-Identifier: Apache-2.0

//! Error types for ccc operations.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Convenience Result type with ccc Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while resolving settings or generating scripts.
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// A setting that a step cannot do without was never given
    #[error("No value given for '{key}'. Cannot run the {step} step.")]
    #[diagnostic(
        code(ccc::missing_configuration),
        help("Set '{key}' in a ccc.yml file or pass it with --config '{key} : <value>'")
    )]
    MissingConfiguration { key: String, step: String },

    /// The build directory has to exist for this step
    #[error("The build directory {0:?} has not been created yet.")]
    #[diagnostic(
        code(ccc::directory_not_found),
        help("Run the install-deps and configure steps first")
    )]
    DirectoryNotFound(PathBuf),

    /// Strict lookup of an undeclared key
    #[error("Setting '{0}' is not declared")]
    #[diagnostic(code(ccc::missing_key))]
    MissingKey(String),

    /// A lookup or assignment tried to descend through a leaf value
    #[error("Cannot reach '{path}': '{segment}' is not a table")]
    #[diagnostic(code(ccc::not_a_table))]
    NotATable { path: String, segment: String },

    /// The command generator has no rule for this system
    #[error("System '{system}' is not supported for the '{command}' command yet.")]
    #[diagnostic(code(ccc::unsupported_system))]
    UnsupportedSystem { system: String, command: String },

    /// The command generator has no rule for this shell
    #[error("Shell '{shell}' is not supported for the '{command}' command yet.")]
    #[diagnostic(code(ccc::unsupported_shell))]
    UnsupportedShell { shell: String, command: String },

    /// No shell could be found for the host system
    #[error("Could not find a shell for system '{0}'.")]
    #[diagnostic(
        code(ccc::shell_not_found),
        help("Install bash or set '/shell' to the path of a supported shell")
    )]
    ShellNotFound(String),

    /// Invalid YAML in a config file
    #[error("Invalid config file {path:?}: {error}")]
    #[diagnostic(code(ccc::invalid_yaml), help("Check the YAML syntax of the file"))]
    InvalidYaml {
        path: PathBuf,
        #[source]
        error: serde_yaml::Error,
    },

    /// Failed to read file
    #[error("Failed to read file: {path:?}")]
    #[diagnostic(code(ccc::read_failed))]
    ReadFailed {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },

    /// Failed to write a generated script
    #[error("Failed to write file: {path:?}")]
    #[diagnostic(code(ccc::write_failed))]
    WriteFailed {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },

    /// A setting holds a value of the wrong shape
    #[error("Invalid value for '{key}': {error}")]
    #[diagnostic(code(ccc::invalid_value))]
    InvalidValue {
        key: String,
        #[source]
        error: serde_yaml::Error,
    },

    /// A glob pattern could not be compiled
    #[error("Invalid file name pattern '{pattern}'")]
    #[diagnostic(code(ccc::invalid_pattern))]
    InvalidPattern {
        pattern: String,
        #[source]
        error: glob::PatternError,
    },

    /// A user supplied argument has a broken placeholder
    #[error("Invalid argument '{arg}': {reason}")]
    #[diagnostic(
        code(ccc::invalid_argument_template),
        help("Placeholders are written as {{name}}; use {{{{ and }}}} for literal braces")
    )]
    InvalidArgumentTemplate { arg: String, reason: String },

    /// A command line override was not a `key : value` pair
    #[error("Invalid config override: {0}")]
    #[diagnostic(
        code(ccc::invalid_override),
        help("Overrides look like '/directories/build : /path/to/build'")
    )]
    InvalidOverride(String),

    /// A step could not change into its scripts directory
    #[error("Cannot enter directory {path:?}")]
    #[diagnostic(code(ccc::enter_directory))]
    EnterDirectory {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },

    /// An external program could not be started
    #[error("Failed to run {program:?}")]
    #[diagnostic(code(ccc::spawn_failed))]
    Spawn {
        program: PathBuf,
        #[source]
        error: std::io::Error,
    },

    /// IO error passthrough
    #[error(transparent)]
    #[diagnostic(code(ccc::io_error))]
    Io(#[from] std::io::Error),
}
