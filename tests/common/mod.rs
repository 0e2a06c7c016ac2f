//! Common test utilities and helpers
//!
//! This module provides shared utilities for integration tests.

#![allow(dead_code)]

use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;

/// Stand-in for mock: logs its arguments and drops fake RPMs into
/// `--resultdir`. `FAIL_MOCK=srpm` or `FAIL_MOCK=rpm` fails that mode.
pub const FAKE_MOCK: &str = r#"#!/bin/sh
echo "$@" >> "$(dirname "$0")/mock.log"
resultdir=""
mode=""
prev=""
spec=""
for arg in "$@"; do
  case "$prev" in
    --resultdir) resultdir="$arg" ;;
    --spec) spec="$arg" ;;
  esac
  case "$arg" in
    --buildsrpm) mode=srpm ;;
    --rebuild) mode=rpm ;;
  esac
  prev="$arg"
done
if [ -n "$FAIL_MOCK" ] && [ "$mode" = "$FAIL_MOCK" ]; then
  echo "mock failed" >&2
  exit 3
fi
case "$mode" in
  srpm)
    name="$(basename "$spec" .spec)"
    touch "$resultdir/$name-1.0-1.src.rpm" ;;
  rpm)
    for arg in "$@"; do
      case "$arg" in
        *.src.rpm) name="$(basename "$arg" -1.0-1.src.rpm)" ;;
      esac
    done
    touch "$resultdir/$name-1.0-1.ppc64le.rpm" ;;
esac
exit 0
"#;

/// Stand-in for createrepo
pub const FAKE_CREATEREPO: &str = "#!/bin/sh\nmkdir -p \"$1/repodata\"\n";

/// Distribution every test builds for
pub const DISTRO: &str = "centos:7:ppc64le";

/// Test project context
///
/// Creates a temporary directory holding a versions repository, a mock
/// environment, fake build tools, and a `hostbuild.toml` that keeps every
/// path inside the directory.
pub struct TestProject {
    /// Temporary directory for the test project
    pub dir: TempDir,
}

impl TestProject {
    /// Create a new test project in a temporary directory
    pub fn new() -> Self {
        let project = Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
        };
        project.install_tools();
        project.write_config("");
        project
    }

    /// Get the path to the test project directory
    pub fn path(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    /// Create a file in the test project
    pub fn create_file(&self, name: &str, content: &str) {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        std::fs::write(path, content).expect("Failed to write file");
    }

    /// Check if a file exists in the test project
    pub fn file_exists(&self, name: &str) -> bool {
        self.dir.path().join(name).exists()
    }

    /// Read a file from the test project
    pub fn read_file(&self, name: &str) -> String {
        std::fs::read_to_string(self.dir.path().join(name)).expect("Failed to read file")
    }

    /// Write `hostbuild.toml`, appending `build_section` under `[build]`
    pub fn write_config(&self, build_section: &str) {
        let root = self.path();
        let content = format!(
            r#"[build]
{build_section}

[paths]
work_dir = "work"
result_dir = "result"
lock_dir = "locks"
state_dir = "state"

[mock]
binary = "{mock}"
createrepo_binary = "{createrepo}"
"#,
            mock = root.join("bin/mock").display(),
            createrepo = root.join("bin/createrepo").display(),
        );
        self.create_file("hostbuild.toml", &content);
    }

    /// Write the mock environment for [`DISTRO`]
    pub fn write_environment(&self) {
        self.create_file(
            "config/mock/centos/7/centos-7-ppc64le.cfg",
            "config_opts['root'] = 'centos-7-ppc64le'\n",
        );
    }

    /// Add a package with a local source file to the versions repository
    pub fn add_package(&self, name: &str, dependencies: &[&str]) {
        let deps = dependencies
            .iter()
            .map(|d| format!("\"{d}\""))
            .collect::<Vec<_>>()
            .join(", ");
        self.create_file(
            &format!("versions/{name}/package.toml"),
            &format!(
                r#"[package]
name = "{name}"
version = "1.0"
dependencies = [{deps}]

[[sources]]
path = "files/{name}.patch"

[distros.centos]
versions = ["7"]
spec = "centos/7/{name}.spec"
"#
            ),
        );
        self.create_file(&format!("versions/{name}/files/{name}.patch"), name);
        self.create_file(
            &format!("versions/{name}/centos/7/{name}.spec"),
            &format!("Name: {name}\nVersion: 1.0\n"),
        );
    }

    /// Change a package's source so its fingerprint changes
    pub fn touch_source(&self, name: &str) {
        self.create_file(
            &format!("versions/{name}/files/{name}.patch"),
            &format!("{name} changed"),
        );
    }

    /// Arguments mock was invoked with, one line per call
    pub fn mock_calls(&self) -> Vec<String> {
        if !self.file_exists("bin/mock.log") {
            return Vec::new();
        }
        self.read_file("bin/mock.log")
            .lines()
            .map(ToString::to_string)
            .collect()
    }

    /// Run hostbuild in the project directory
    pub fn run(&self, args: &[&str]) -> Output {
        self.run_with_env(args, &[])
    }

    /// Run hostbuild with extra environment variables
    pub fn run_with_env(&self, args: &[&str], env: &[(&str, &str)]) -> Output {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_hostbuild"));
        cmd.current_dir(self.path());
        cmd.env_remove("HOSTBUILD_CONFIG");
        cmd.env_remove("RUST_LOG");
        cmd.args(args);
        for (key, value) in env {
            cmd.env(key, value);
        }
        cmd.output().expect("Failed to execute hostbuild")
    }

    fn install_tools(&self) {
        self.create_file("bin/mock", FAKE_MOCK);
        self.create_file("bin/createrepo", FAKE_CREATEREPO);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            for tool in ["bin/mock", "bin/createrepo"] {
                std::fs::set_permissions(
                    self.dir.path().join(tool),
                    std::fs::Permissions::from_mode(0o755),
                )
                .expect("Failed to make tool executable");
            }
        }
    }
}

impl Default for TestProject {
    fn default() -> Self {
        Self::new()
    }
}

/// Combined stdout and stderr of a run
pub fn combined(output: &Output) -> String {
    format!(
        "{}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    )
}
