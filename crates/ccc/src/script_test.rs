// Copyright (c) Contributors to the ccc project.
// SPDX-License-Identifier: Apache-2.0

use std::cell::RefCell;
use std::rc::Rc;

use rstest::rstest;
use tempfile::TempDir;

use super::*;
use crate::system::Shell;

fn bash_script() -> Script {
    Script::new(CmdGenerator::new(System::Linux, Shell::new("/bin/bash")))
}

#[rstest]
fn test_writing_shell_script() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("script.sh");

    let mut script = bash_script();
    script.add_args(["echo", "hello", "world"]);

    script.write(&path, false).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    assert_eq!(text.split('\n').collect::<Vec<_>>(), vec!["echo hello world"]);

    script.write(&path, true).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    assert_eq!(
        text.split('\n').collect::<Vec<_>>(),
        vec!["set -e", "echo hello world"]
    );
}

#[rstest]
fn test_fail_fast_is_skipped_for_shells_without_one() {
    let mut script = Script::new(CmdGenerator::new(System::Linux, Shell::new("zsh")));
    script.add_line("make");
    assert_eq!(script.render(true).unwrap(), "make");
}

#[rstest]
fn test_none_is_ignored() {
    let mut script = bash_script();
    script.add_command(None);
    script.add_command(Command::from("ls"));
    assert_eq!(script.len(), 1);
    assert_eq!(script.render(false).unwrap(), "ls");
}

#[rstest]
fn test_args_are_quoted() {
    let mut script = bash_script();
    script.add_args(["cmake", "-DNAME=a b"]);
    assert_eq!(script.render(false).unwrap(), "cmake '-DNAME=a b'");
}

#[rstest]
fn test_deferred_commands_run_in_order_at_render_time() {
    let calls = Rc::new(RefCell::new(Vec::new()));
    let mut script = bash_script();
    for i in 0..3 {
        let calls = Rc::clone(&calls);
        script.add_deferred(move |_| {
            calls.borrow_mut().push(i);
            Ok(Some(format!("echo {i}")))
        });
    }
    script.add_deferred(|_| Ok(None));

    assert!(calls.borrow().is_empty());
    assert_eq!(script.render(false).unwrap(), "echo 0\necho 1\necho 2");
    assert_eq!(*calls.borrow(), vec![0, 1, 2]);
}

#[rstest]
fn test_generator_can_change_before_render() {
    let mut script = Script::new(CmdGenerator::new(System::Windows, Shell::new("bash")));
    script.mkdir("build dir", true).cd("build dir");

    assert!(matches!(
        script.render(false),
        Err(Error::UnsupportedSystem { .. })
    ));

    script.set_generator(CmdGenerator::new(System::Linux, Shell::new("bash")));
    assert_eq!(
        script.render(true).unwrap(),
        "set -e\nmkdir -p 'build dir'\ncd 'build dir'"
    );
}

#[rstest]
fn test_environment_lines_are_one_per_script() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("activate.sh"), "").unwrap();
    std::fs::write(tmp.path().join("conanbuild.sh"), "").unwrap();

    let mut script = bash_script();
    script
        .activate_build_environment(tmp.path(), tmp.path())
        .add_line("cmake --build .")
        .deactivate_build_environment(tmp.path(), tmp.path());

    assert_eq!(
        script.render(false).unwrap(),
        "source activate.sh\nsource conanbuild.sh\ncmake --build ."
    );
}

#[rstest]
fn test_failed_render_leaves_file_untouched() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("script.sh");
    std::fs::write(&path, "previous").unwrap();

    let mut script = Script::new(CmdGenerator::new(System::Linux, Shell::new("fish")));
    script.add_line("echo first");
    script.invoke::<&str>(&tmp.path().join("main-tests"), tmp.path(), &[]);

    match script.write(&path, true) {
        Err(Error::UnsupportedShell { .. }) => {}
        other => panic!("Expected UnsupportedShell, got: {:?}", other),
    }
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "previous");
}
