// Copyright (c) Contributors to the ccc project.
// SPDX-License-Identifier: Apache-2.0

//! ccc - Conan/CMake C++ project tooling
//!
//! This crate provides the core library for building C++ projects that use
//! conan for dependencies and cmake for the build, driven by layered
//! configuration files (`ccc.yml`).
//!
//! # Overview
//!
//! Settings are resolved once per invocation into a [`Settings`] tree: the
//! project root, the host system and shell, conventional defaults, every
//! `ccc.yml` from the filesystem root down to the working directory, and
//! finally command line overrides. Each pipeline [`Step`] then turns those
//! settings into a shell script and can run it.
//!
//! # Example
//!
//! ```yaml
//! # ccc.yml
//! build_type: Release
//!
//! conan:
//!   extra_args: ["--build=missing"]
//!
//! cmake:
//!   extra_args: ["-G", "Ninja"]
//!
//! run_tests:
//!   args:
//!     "*-tests": ["--order", "rand"]
//! ```

pub mod binaries;
pub mod command;
pub mod config;
pub mod discovery;
pub mod error;
pub mod filter;
pub mod script;
pub mod settings;
pub mod steps;
pub mod system;

pub use binaries::{BinaryPatterns, TestBinaries, find_test_binaries};
pub use command::CmdGenerator;
pub use config::resolve;
pub use discovery::{find_project_root, load_config_files, parse_override};
pub use error::{Error, Result};
pub use filter::Filter;
pub use script::{Command, Script};
pub use settings::{LookupMode, Node, Settings, TreePath};
pub use steps::Step;
pub use system::{HostIdentity, Shell, System};

/// Base name of the layered configuration files (`ccc.yml`).
pub const CONFIG_BASENAME: &str = "ccc";
