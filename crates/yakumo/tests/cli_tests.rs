//! Integration tests for the yakumo CLI.
//!
//! Each test builds a small workspace in a temporary directory and runs the
//! compiled binary against it. Commands that shell out to a package manager
//! use a fake agent script that only records its invocations.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{Value, json};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write_manifest(dir: &Path, manifest: &Value) {
    fs::create_dir_all(dir).unwrap();
    fs::write(
        dir.join("package.json"),
        serde_json::to_string_pretty(manifest).unwrap() + "\n",
    )
    .unwrap();
}

fn read_manifest(dir: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(dir.join("package.json")).unwrap()).unwrap()
}

/// Root with two packages, `b` depending on `a`.
fn fixture() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    write_manifest(
        root,
        &json!({"name": "root", "private": true, "workspaces": ["packages/*"]}),
    );
    write_manifest(
        &root.join("packages/a"),
        &json!({"name": "a", "version": "1.0.0", "scripts": {"build": "tsc"}}),
    );
    write_manifest(
        &root.join("packages/b"),
        &json!({"name": "b", "version": "1.0.0", "dependencies": {"a": "^1.0.0"}}),
    );
    tmp
}

fn yakumo(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("yakumo").unwrap();
    cmd.current_dir(dir)
        .env_remove("npm_config_user_agent")
        .env_remove("npm_config_registry")
        .env_remove("YAKUMO_LOG")
        .env_remove("RUST_LOG")
        .env("NO_COLOR", "1");
    cmd
}

#[test]
fn test_no_command_prints_name() {
    let tmp = fixture();
    yakumo(tmp.path())
        .assert()
        .success()
        .stdout("yakumo\n");
}

#[test]
fn test_unknown_command_fails() {
    let tmp = fixture();
    let before = fs::read_to_string(tmp.path().join("packages/a/package.json")).unwrap();

    yakumo(tmp.path())
        .arg("nonexistent")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("unknown command: nonexistent"));

    let after = fs::read_to_string(tmp.path().join("packages/a/package.json")).unwrap();
    assert_eq!(before, after);
}

#[test]
fn test_list_prints_tree() {
    let tmp = fixture();
    yakumo(tmp.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("root"))
        .stdout(predicate::str::contains("a (packages/a)"))
        .stdout(predicate::str::contains("b (packages/b)"))
        .stdout(predicate::str::contains("2 packages, 1 workspaces"));
}

#[test]
fn test_list_rejects_unknown_flag() {
    let tmp = fixture();
    yakumo(tmp.path())
        .args(["list", "--nope"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid arguments for list"));
}

#[test]
fn test_version_patch_updates_dependents() {
    let tmp = fixture();
    yakumo(tmp.path())
        .args(["version", "-3", "a"])
        .assert()
        .success()
        .stdout(predicate::str::contains("- a: 1.0.0 => 1.0.1"))
        .stdout(predicate::str::contains("- b: dependency updated"));

    let a = read_manifest(&tmp.path().join("packages/a"));
    assert_eq!(a["version"], "1.0.1");
    let b = read_manifest(&tmp.path().join("packages/b"));
    assert_eq!(b["version"], "1.0.0");
    assert_eq!(b["dependencies"]["a"], "^1.0.1");
}

#[test]
fn test_version_conflicting_bumps() {
    let tmp = fixture();
    yakumo(tmp.path())
        .args(["version", "-1", "-2", "a"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("You can only specify one bump type."));

    assert_eq!(read_manifest(&tmp.path().join("packages/a"))["version"], "1.0.0");
}

#[test]
fn test_version_all_requires_confirmation() {
    let tmp = fixture();
    yakumo(tmp.path())
        .args(["version", "-3"])
        .write_stdin("n\n")
        .assert()
        .success();
    assert_eq!(read_manifest(&tmp.path().join("packages/a"))["version"], "1.0.0");

    yakumo(tmp.path())
        .args(["version", "-3", "-y"])
        .assert()
        .success();
    assert_eq!(read_manifest(&tmp.path().join("packages/a"))["version"], "1.0.1");
    assert_eq!(read_manifest(&tmp.path().join("packages/b"))["version"], "1.0.1");
}

#[test]
fn test_run_requires_script_name() {
    let tmp = fixture();
    yakumo(tmp.path())
        .arg("run")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Missing command"));
}

#[test]
fn test_publish_skips_private_packages() {
    let tmp = fixture();
    for name in ["a", "b"] {
        let dir = tmp.path().join("packages").join(name);
        let mut manifest = read_manifest(&dir);
        manifest["private"] = json!(true);
        write_manifest(&dir, &manifest);
    }

    yakumo(tmp.path())
        .arg("publish")
        .assert()
        .success()
        .stdout(predicate::str::contains("Published 0 packages."));
}

#[test]
fn test_pipeline_steps_receive_pipeline_targets() {
    let tmp = fixture();
    fs::write(
        tmp.path().join("yakumo.yml"),
        "pipeline:\n  release:\n    - version -3\n",
    )
    .unwrap();

    yakumo(tmp.path())
        .args(["release", "b", "-y"])
        .assert()
        .success()
        .stdout(predicate::str::contains("- b: 1.0.0 => 1.0.1"));

    assert_eq!(read_manifest(&tmp.path().join("packages/a"))["version"], "1.0.0");
    assert_eq!(read_manifest(&tmp.path().join("packages/b"))["version"], "1.0.1");
}

#[test]
fn test_invalid_config_is_reported() {
    let tmp = fixture();
    fs::write(tmp.path().join("yakumo.yml"), "pipeline: [not, a, map]\n").unwrap();
    yakumo(tmp.path()).arg("list").assert().code(1);
}

#[cfg(unix)]
mod agent {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    /// A fake executable on `PATH` that appends `<dir> <args>` to the log.
    struct FakeBin {
        dir: TempDir,
        log: std::path::PathBuf,
    }

    impl FakeBin {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let log = dir.path().join("calls.log");
            fs::write(&log, "").unwrap();
            Self { dir, log }
        }

        fn script(&self, name: &str, body: &str) {
            let path = self.dir.path().join(name);
            fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        }

        fn recorder(&self, name: &str) {
            self.script(name, "echo \"${PWD##*/} $*\" >> \"$YAKUMO_TEST_LOG\"");
        }

        fn command(&self, cwd: &Path) -> Command {
            let path = std::env::var("PATH").unwrap_or_default();
            let mut cmd = yakumo(cwd);
            cmd.env("PATH", format!("{}:{path}", self.dir.path().display()))
                .env("npm_config_user_agent", "fakepm/1.0.0 node/v20.0.0")
                .env("YAKUMO_TEST_LOG", &self.log);
            cmd
        }

        fn calls(&self) -> Vec<String> {
            fs::read_to_string(&self.log)
                .unwrap()
                .lines()
                .map(str::to_string)
                .collect()
        }
    }

    #[test]
    fn test_run_invokes_script_in_defining_workspaces() {
        let tmp = fixture();
        let bin = FakeBin::new();
        bin.recorder("fakepm");

        bin.command(tmp.path())
            .args(["run", "--", "build", "--watch"])
            .assert()
            .success();

        assert_eq!(bin.calls(), ["a run build --watch"]);
    }

    #[test]
    fn test_run_propagates_exit_code() {
        let tmp = fixture();
        let bin = FakeBin::new();
        bin.script("fakepm", "exit 7");

        bin.command(tmp.path())
            .args(["run", "--", "build"])
            .assert()
            .code(7);
    }

    #[test]
    fn test_before_script_runs_ahead_of_command() {
        let tmp = fixture();
        let dir = tmp.path().join("packages/a");
        let mut manifest = read_manifest(&dir);
        manifest["scripts"]["before:version"] = json!("echo preparing");
        write_manifest(&dir, &manifest);

        let bin = FakeBin::new();
        bin.recorder("fakepm");

        bin.command(tmp.path())
            .args(["version", "-3", "a"])
            .assert()
            .success();

        assert_eq!(bin.calls(), ["a run before:version"]);
        assert_eq!(read_manifest(&dir)["version"], "1.0.1");
    }

    #[test]
    fn test_failing_before_script_stops_the_command() {
        let tmp = fixture();
        let dir = tmp.path().join("packages/a");
        let mut manifest = read_manifest(&dir);
        manifest["scripts"]["before:version"] = json!("exit 4");
        write_manifest(&dir, &manifest);

        let bin = FakeBin::new();
        bin.script(
            "fakepm",
            "echo \"${PWD##*/} $*\" >> \"$YAKUMO_TEST_LOG\"\n[ \"$2\" = \"before:version\" ] && exit 4\nexit 0",
        );

        bin.command(tmp.path())
            .args(["version", "-3", "a"])
            .assert()
            .code(4)
            .stdout(predicate::str::contains("=>").not());

        assert_eq!(bin.calls(), ["a run before:version"]);
        assert_eq!(read_manifest(&dir)["version"], "1.0.0");
        let b = read_manifest(&tmp.path().join("packages/b"));
        assert_eq!(b["dependencies"]["a"], "^1.0.0");
    }

    #[test]
    fn test_prepare_lifts_nested_globs_and_installs() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        write_manifest(
            root,
            &json!({"name": "root", "private": true, "workspaces": ["packages/*", "external/*"]}),
        );
        write_manifest(&root.join("packages/a"), &json!({"name": "a", "version": "1.0.0"}));
        write_manifest(
            &root.join("external/kit"),
            &json!({"name": "kit", "private": true, "workspaces": ["plugins/*"]}),
        );

        let bin = FakeBin::new();
        bin.recorder("fakepm");

        bin.command(root)
            .arg("prepare")
            .assert()
            .success()
            .stdout(predicate::str::contains(
                "[I] workspace added: external/kit/plugins/*",
            ));

        let manifest = read_manifest(root);
        assert_eq!(
            manifest["workspaces"],
            json!(["external/*", "external/kit/plugins/*", "packages/*"])
        );
        let dir_name = root.file_name().unwrap().to_string_lossy().to_string();
        assert_eq!(bin.calls(), [format!("{dir_name} install")]);
    }

    #[test]
    fn test_pipeline_runs_steps_in_order() {
        let tmp = fixture();
        fs::write(
            tmp.path().join("yakumo.yml"),
            "pipeline:\n  ci:\n    - run -- build\n    - list\n",
        )
        .unwrap();

        let bin = FakeBin::new();
        bin.recorder("fakepm");

        bin.command(tmp.path())
            .arg("ci")
            .assert()
            .success()
            .stdout(predicate::str::contains("2 packages, 1 workspaces"));

        assert_eq!(bin.calls(), ["a run build"]);
    }

    #[test]
    fn test_pipeline_stops_at_failing_step() {
        let tmp = fixture();
        fs::write(
            tmp.path().join("yakumo.yml"),
            "pipeline:\n  ci:\n    - run -- build\n    - version -3 -y\n",
        )
        .unwrap();

        let bin = FakeBin::new();
        bin.script("fakepm", "exit 2");

        bin.command(tmp.path()).arg("ci").assert().code(2);
        assert_eq!(read_manifest(&tmp.path().join("packages/a"))["version"], "1.0.0");
    }

    #[test]
    fn test_test_command_forwards_node_exit_code() {
        let tmp = fixture();
        let bin = FakeBin::new();
        bin.script("node", "echo \"node $*\" >> \"$YAKUMO_TEST_LOG\"\nexit 3");

        bin.command(tmp.path()).arg("test").assert().code(3);

        assert_eq!(bin.calls(), ["node --test **/tests/*.spec.ts"]);
    }
}
