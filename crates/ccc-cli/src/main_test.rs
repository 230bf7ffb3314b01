// Copyright (c) Contributors to the ccc project.
// SPDX-License-Identifier: Apache-2.0

use clap::Parser;
use rstest::rstest;

use super::*;

#[rstest]
fn test_global_flags_after_subcommand() {
    let opt = Opt::try_parse_from([
        "ccc",
        "build",
        "-C",
        "project",
        "-c",
        "/build_type : Release",
        "--config",
        "/cmake/cmd : cmake3",
        "--no-run",
        "-vv",
    ])
    .unwrap();

    assert!(matches!(opt.cmd, Command::Build(_)));
    assert_eq!(opt.project.directory, PathBuf::from("project"));
    assert_eq!(
        opt.project.config,
        vec!["/build_type : Release", "/cmake/cmd : cmake3"]
    );
    assert!(opt.project.no_run);
    assert_eq!(opt.logging.verbose, 2);
}

#[rstest]
fn test_defaults() {
    let opt = Opt::try_parse_from(["ccc", "test"]).unwrap();
    assert!(matches!(opt.cmd, Command::Test(_)));
    assert_eq!(opt.project.directory, PathBuf::from("."));
    assert!(opt.project.config.is_empty());
    assert!(!opt.project.no_run);
    assert!(!opt.logging.quiet);
}

#[rstest]
#[case("install-deps")]
#[case("configure")]
#[case("build")]
#[case("test")]
#[case("debug")]
#[case("install")]
#[case("run")]
#[case("show")]
fn test_subcommands_parse(#[case] name: &str) {
    assert!(Opt::try_parse_from(["ccc", name]).is_ok());
}

#[rstest]
fn test_run_until_takes_a_step_name() {
    let opt = Opt::try_parse_from(["ccc", "run", "--until", "run_build"]).unwrap();
    assert!(matches!(opt.cmd, Command::Run(_)));
    assert!(Opt::try_parse_from(["ccc", "run", "--until", "deploy"]).is_err());
}

#[rstest]
fn test_subcommand_is_required() {
    assert!(Opt::try_parse_from(["ccc", "-v"]).is_err());
}
