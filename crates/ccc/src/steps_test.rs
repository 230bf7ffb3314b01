// Copyright (c) Contributors to the ccc project.
// SPDX-License-Identifier: Apache-2.0

use rstest::{fixture, rstest};
use serial_test::serial;
use tempfile::TempDir;

use super::*;
use crate::config::declare_defaults;
use crate::settings::LookupMode;

#[fixture]
fn project() -> TempDir {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("conanfile.py"), "").unwrap();
    std::fs::write(tmp.path().join("CMakeLists.txt"), "").unwrap();
    tmp
}

fn settings_for(root: &Path) -> Settings {
    let mut settings = Settings::new();
    settings.set("/directories/root", root).unwrap();
    settings.set("/directories/scripts", root).unwrap();
    settings.set("/directories/build", root.join("build-test")).unwrap();
    settings.set("/files/conanfile", root.join("conanfile.py")).unwrap();
    settings.set("/files/CMakeLists.txt", root.join("CMakeLists.txt")).unwrap();
    settings.set("/system", "linux").unwrap();
    settings.set("/shell", "bash").unwrap();
    declare_defaults(&mut settings).unwrap();
    settings.set_mode(LookupMode::Strict);
    settings
}

fn script_lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .expect("Script should have been written")
        .split('\n')
        .map(String::from)
        .collect()
}

fn make_build_dir(root: &Path) -> PathBuf {
    let build = root.join("build-test");
    std::fs::create_dir(&build).unwrap();
    build
}

#[cfg(unix)]
fn write_executable(path: &Path, content: &str) {
    use std::os::unix::fs::PermissionsExt;
    std::fs::write(path, content).unwrap();
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
}

#[rstest]
#[case("plain", "plain")]
#[case("{build_type}", "Debug")]
#[case("-DX={build_type}-x", "-DX=Debug-x")]
#[case("{{literal}}", "{literal}")]
#[case("{{{build_type}}}", "{Debug}")]
fn test_expand_placeholders(#[case] arg: &str, #[case] expected: &str) {
    let values = [("build_type", "Debug"), ("build_dir", "/b")];
    assert_eq!(expand_placeholders(arg, &values).unwrap(), expected);
}

#[rstest]
#[case("{unknown}")]
#[case("{build_type")]
#[case("oops}")]
fn test_invalid_placeholders(#[case] arg: &str) {
    let values = [("build_type", "Debug")];
    match expand_placeholders(arg, &values) {
        Err(Error::InvalidArgumentTemplate { arg: given, .. }) => assert_eq!(given, arg),
        other => panic!("Expected InvalidArgumentTemplate, got: {:?}", other),
    }
}

#[rstest]
fn test_step_names() {
    let names: Vec<_> = Step::ALL.iter().map(Step::default_script_name).collect();
    assert_eq!(
        names,
        vec![
            "01-install_deps",
            "02-configure_build",
            "03-run_build",
            "04-run_tests",
            "05-debug_tests",
            "05-install"
        ]
    );
    assert_eq!("run_tests".parse::<Step>().unwrap(), Step::RunTests);
    assert!("deploy".parse::<Step>().is_err());
    assert_eq!(Step::DebugTests.script_name_key(), "/debug_tests/script_name");
}

#[rstest]
#[serial]
fn test_install_deps_script(project: TempDir) {
    let root = project.path();
    let settings = settings_for(root);

    assert_eq!(install_deps(&settings, false).unwrap(), None);
    assert_eq!(
        script_lines(&root.join("01-install_deps")),
        vec![
            "set -e".to_string(),
            format!("cd {}", root.display()),
            "mkdir -p build-test".to_string(),
            "cd build-test".to_string(),
            "conan install .. -pr:b=default -s build_type=Debug".to_string(),
        ]
    );
}

#[rstest]
#[serial]
fn test_install_deps_extra_args(project: TempDir) {
    let root = project.path();
    let mut settings = settings_for(root);
    settings
        .set("/conan/extra_args", vec!["-j", "build-info-tree.json"])
        .unwrap();

    install_deps(&settings, false).unwrap();
    let lines = script_lines(&root.join("01-install_deps"));
    assert_eq!(
        lines.last().unwrap(),
        "conan install .. -pr:b=default -s build_type=Debug -j build-info-tree.json"
    );
}

#[rstest]
#[serial]
fn test_install_deps_user_args_take_placeholders(project: TempDir) {
    let root = project.path();
    let mut settings = settings_for(root);
    settings
        .set(
            "/conan/args",
            vec!["install", "{conan_dir}", "--output-folder={build_dir}"],
        )
        .unwrap();
    settings.set("/install_deps/script_name", "deps.sh").unwrap();

    install_deps(&settings, false).unwrap();
    let lines = script_lines(&root.join("deps.sh"));
    assert_eq!(
        lines.last().unwrap(),
        &format!(
            "conan install .. --output-folder={}",
            root.join("build-test").display()
        )
    );
}

#[rstest]
#[serial]
fn test_bad_placeholder_writes_nothing(project: TempDir) {
    let root = project.path();
    let mut settings = settings_for(root);
    settings.set("/conan/extra_args", vec!["{cmake_dir}"]).unwrap();

    assert!(matches!(
        install_deps(&settings, false),
        Err(Error::InvalidArgumentTemplate { .. })
    ));
    assert!(!root.join("01-install_deps").exists());
}

#[rstest]
#[serial]
fn test_missing_build_dir_setting(project: TempDir) {
    let root = project.path();
    let mut settings = settings_for(root);
    settings
        .unset("/directories/build", Some("not configured"))
        .unwrap();

    for step in Step::ALL {
        match step.execute(&settings, false) {
            Err(Error::MissingConfiguration { key, step: name }) => {
                assert_eq!(key, "/directories/build");
                assert_eq!(name, step.section());
            }
            other => panic!("Expected MissingConfiguration, got: {:?}", other),
        }
    }
}

#[rstest]
#[serial]
fn test_missing_conanfile_writes_nothing(project: TempDir) {
    let root = project.path();
    let mut settings = settings_for(root);
    settings.unset("/files/conanfile", Some("no conanfile found")).unwrap();

    match install_deps(&settings, false) {
        Err(Error::MissingConfiguration { key, .. }) => assert_eq!(key, "/files/conanfile"),
        other => panic!("Expected MissingConfiguration, got: {:?}", other),
    }
    assert!(!root.join("01-install_deps").exists());
}

#[rstest]
#[serial]
fn test_configure_without_environment(project: TempDir) {
    let root = project.path();
    let settings = settings_for(root);

    configure_build(&settings, false).unwrap();
    assert_eq!(
        script_lines(&root.join("02-configure_build")),
        vec![
            "set -e".to_string(),
            format!("cd {}", root.display()),
            "mkdir -p build-test".to_string(),
            "cd build-test".to_string(),
            "cmake .. -DCMAKE_BUILD_TYPE=Debug".to_string(),
        ]
    );
}

#[rstest]
#[serial]
fn test_configure_with_conan_environment(project: TempDir) {
    let root = project.path();
    let build = make_build_dir(root);
    for file in ["activate.sh", "deactivate.sh", "conan_toolchain.cmake"] {
        std::fs::write(build.join(file), "").unwrap();
    }
    let settings = settings_for(root);

    configure_build(&settings, false).unwrap();
    assert_eq!(
        script_lines(&root.join("02-configure_build")),
        vec![
            "set -e".to_string(),
            format!("cd {}", root.display()),
            "mkdir -p build-test".to_string(),
            "cd build-test".to_string(),
            "source activate.sh".to_string(),
            "cmake .. -DCMAKE_TOOLCHAIN_FILE=conan_toolchain.cmake -DCMAKE_BUILD_TYPE=Debug"
                .to_string(),
            "source deactivate.sh".to_string(),
        ]
    );
}

#[rstest]
#[serial]
fn test_run_build_needs_build_dir(project: TempDir) {
    let root = project.path();
    let settings = settings_for(root);

    for step in [Step::RunBuild, Step::RunTests, Step::DebugTests, Step::Install] {
        match step.execute(&settings, false) {
            Err(Error::DirectoryNotFound(dir)) => assert_eq!(dir, root.join("build-test")),
            other => panic!("Expected DirectoryNotFound, got: {:?}", other),
        }
    }
}

#[rstest]
#[serial]
fn test_run_build_script(project: TempDir) {
    let root = project.path();
    let build = make_build_dir(root);
    std::fs::write(build.join("conanbuild.sh"), "").unwrap();
    std::fs::write(build.join("deactivate_conanbuild.sh"), "").unwrap();
    let settings = settings_for(root);

    run_build(&settings, false).unwrap();
    assert_eq!(
        script_lines(&root.join("03-run_build")),
        vec![
            "set -e".to_string(),
            format!("cd {}", root.display()),
            "cd build-test".to_string(),
            "source conanbuild.sh".to_string(),
            "cmake --build .".to_string(),
            "source deactivate_conanbuild.sh".to_string(),
        ]
    );
}

#[rstest]
#[serial]
fn test_install_script(project: TempDir) {
    let root = project.path();
    make_build_dir(root);
    let mut settings = settings_for(root);

    install(&settings, false).unwrap();
    assert_eq!(
        script_lines(&root.join("05-install")).last().unwrap(),
        "cmake --install ."
    );

    settings.set("/install/prefix", "/opt/project").unwrap();
    settings
        .set("/cmake/install/extra_args", vec!["--config", "{build_type}"])
        .unwrap();
    install(&settings, false).unwrap();
    assert_eq!(
        script_lines(&root.join("05-install")).last().unwrap(),
        "cmake --install . --prefix /opt/project --config Debug"
    );
}

#[cfg(unix)]
#[rstest]
#[serial]
fn test_run_tests_script(project: TempDir) {
    let root = project.path();
    let build = make_build_dir(root);
    write_executable(&build.join("main-tests"), "#!/bin/sh\n");
    std::fs::write(build.join("notes-test.txt"), "").unwrap();
    let mut settings = settings_for(root);

    run_tests(&settings, false).unwrap();
    assert_eq!(
        script_lines(&root.join("04-run_tests")),
        vec![
            "set -e".to_string(),
            format!("cd {}", root.display()),
            "cd build-test".to_string(),
            "./main-tests".to_string(),
        ]
    );

    settings.set("/run_tests/args/*-tests", vec!["one", "two"]).unwrap();
    run_tests(&settings, false).unwrap();
    assert_eq!(
        script_lines(&root.join("04-run_tests")).last().unwrap(),
        "./main-tests one two"
    );
}

#[cfg(unix)]
#[rstest]
#[serial]
fn test_run_tests_sources_run_environment(project: TempDir) {
    let root = project.path();
    let build = make_build_dir(root);
    write_executable(&build.join("unit-tests"), "#!/bin/sh\n");
    std::fs::write(build.join("conanrun.sh"), "").unwrap();
    std::fs::write(build.join("deactivate_conanrun.sh"), "").unwrap();
    std::fs::write(build.join("activate.sh"), "").unwrap();
    let settings = settings_for(root);

    run_tests(&settings, false).unwrap();
    assert_eq!(
        script_lines(&root.join("04-run_tests"))[3..],
        [
            "source conanrun.sh".to_string(),
            "./unit-tests".to_string(),
            "source deactivate_conanrun.sh".to_string(),
        ]
    );
}

#[cfg(unix)]
#[rstest]
#[serial]
fn test_debug_tests_script(project: TempDir) {
    let root = project.path();
    let build = make_build_dir(root);
    write_executable(&build.join("unit-tests"), "#!/bin/sh\n");
    write_executable(&build.join("stripped-tests"), "#!/bin/sh\n");
    let inspector = root.join("inspect");
    write_executable(
        &inspector,
        "#!/bin/sh\ncase \"$1\" in\n  *unit-tests) echo \"$1: ELF, with debug_info\";;\n  *) echo \"$1: ELF, stripped\";;\nesac\n",
    );
    let mut settings = settings_for(root);
    settings.set("/debug_tests/inspect/cmd", &inspector).unwrap();
    settings.set("/run_tests/args/unit*", vec!["--gtest_filter=A.*"]).unwrap();

    debug_tests(&settings, false).unwrap();
    assert_eq!(
        script_lines(&root.join("05-debug_tests")).last().unwrap(),
        "gdb --args ./unit-tests '--gtest_filter=A.*'"
    );

    settings.set("/debug_tests/debugger/cmd", "lldb").unwrap();
    settings.set("/debug_tests/debugger/args", vec!["--"]).unwrap();
    settings.set("/debug_tests/include_patterns", vec!["stripped*"]).unwrap();
    debug_tests(&settings, false).unwrap();
    assert_eq!(
        script_lines(&root.join("05-debug_tests")),
        vec![
            "set -e".to_string(),
            format!("cd {}", root.display()),
            "cd build-test".to_string(),
        ]
    );
}

#[cfg(unix)]
#[rstest]
#[serial]
fn test_exit_code_is_passed_through(project: TempDir) {
    let root = project.path();
    make_build_dir(root);
    let mut settings = settings_for(root);
    settings.set("/shell", "/bin/sh").unwrap();
    settings.set("/cmake/cmd", "sh").unwrap();
    settings.set("/cmake/build/args", vec!["-c", "exit 3"]).unwrap();

    assert_eq!(run_build(&settings, true).unwrap(), Some(3));

    settings.set("/cmake/build/args", vec!["-c", "true"]).unwrap();
    assert_eq!(run_build(&settings, true).unwrap(), Some(0));
}

#[cfg(unix)]
#[rstest]
fn test_signals_map_above_128() {
    use std::os::unix::process::ExitStatusExt;

    assert_eq!(exit_code(ExitStatus::from_raw(3 << 8)), 3);
    assert_eq!(exit_code(ExitStatus::from_raw(9)), 137);
}

#[rstest]
#[serial]
fn test_working_directory_is_restored(project: TempDir) {
    let before = std::env::current_dir().unwrap();
    {
        let _cwd = WorkingDirectory::enter(project.path()).unwrap();
        assert_eq!(
            dunce::canonicalize(std::env::current_dir().unwrap()).unwrap(),
            dunce::canonicalize(project.path()).unwrap()
        );
    }
    assert_eq!(std::env::current_dir().unwrap(), before);

    let settings = settings_for(project.path());
    run_build(&settings, false).unwrap_err();
    install_deps(&settings, false).unwrap();
    assert_eq!(std::env::current_dir().unwrap(), before);
}
