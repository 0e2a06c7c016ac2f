//! Mock-based builder
//!
//! Builds RPMs inside a mock chroot described by
//! `<mock_config_dir>/<name>/<version>/<name>-<version>-<arch>.cfg`.
//!
//! Layout during a run:
//! - `<work_dir>/build/<timestamp>/<package>/{srpm,rpms}`: per-run scratch,
//!   removed by `clean`
//! - `<work_dir>/packages/<package>/`: last built RPMs, carried forward into
//!   later runs that skip the package
//! - `<result_dir>/<timestamp>/`: run results and repository metadata
//! - `<result_dir>/latest`: symlink to the newest run

use async_trait::async_trait;
use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::process::Command;

use crate::config::defaults;
use crate::core::builder::{Builder, BuilderContext, BuilderRegistry};
use crate::core::config::Config;
use crate::core::distro::{DistroFamily, Distribution};
use crate::core::package::Package;
use crate::error::{BuilderError, ConfigError};
use crate::infra::filesystem;
use crate::infra::sources::StagedSources;

/// Path of the environment definition for a distribution
pub fn environment_config_path(mock_config_dir: &Path, distro: &Distribution) -> PathBuf {
    mock_config_dir
        .join(&distro.name)
        .join(&distro.version)
        .join(format!(
            "{}-{}-{}.cfg",
            distro.name, distro.version, distro.architecture
        ))
}

/// Locate the environment definition, failing if it does not exist
pub fn resolve_environment(
    mock_config_dir: &Path,
    distro: &Distribution,
) -> Result<PathBuf, ConfigError> {
    let path = environment_config_path(mock_config_dir, distro);
    if path.is_file() {
        Ok(path)
    } else {
        Err(ConfigError::MissingEnvironment {
            distro: distro.to_string(),
            path,
        })
    }
}

/// Register the mock builder for every supported family
pub fn register(registry: &mut BuilderRegistry, config: &Config) {
    let settings = MockSettings::from_config(config);
    for family in DistroFamily::ALL {
        let settings = settings.clone();
        registry.register(family.name(), move |ctx| {
            let env_config = resolve_environment(&settings.config_dir, &ctx.distro)?;
            let builder: Box<dyn Builder> =
                Box::new(MockBuilder::new(ctx.clone(), env_config, settings.clone()));
            Ok(builder)
        });
    }
}

/// Tool locations and arguments for mock builds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockSettings {
    /// Environment definitions directory
    pub config_dir: PathBuf,
    /// Mock executable name or path
    pub mock: String,
    /// Repository metadata generator name or path
    pub createrepo: String,
    /// Extra arguments passed to every mock invocation
    pub extra_args: Vec<String>,
}

impl MockSettings {
    /// Settings from the `[mock]` and `[paths]` config sections
    pub fn from_config(config: &Config) -> Self {
        Self {
            config_dir: config.mock_config_dir(),
            mock: config.mock_binary().to_string(),
            createrepo: config.createrepo_binary().to_string(),
            extra_args: config.mock.extra_args.clone(),
        }
    }
}

/// Builder driving mock and createrepo
#[derive(Debug)]
pub struct MockBuilder {
    context: BuilderContext,
    env_config: PathBuf,
    settings: MockSettings,
    mock_path: Option<PathBuf>,
    createrepo_path: Option<PathBuf>,
    srpms: HashMap<String, PathBuf>,
}

impl MockBuilder {
    /// Create a builder for one run
    pub fn new(context: BuilderContext, env_config: PathBuf, settings: MockSettings) -> Self {
        Self {
            context,
            env_config,
            settings,
            mock_path: None,
            createrepo_path: None,
            srpms: HashMap::new(),
        }
    }

    /// Per-run scratch directory
    fn scratch_dir(&self) -> PathBuf {
        self.context
            .work_dir
            .join("build")
            .join(&self.context.timestamp)
    }

    /// Directory holding the package's most recently built RPMs
    pub fn packages_dir(&self, package: &str) -> PathBuf {
        self.context.work_dir.join("packages").join(package)
    }

    fn locate(tool: &str) -> Result<PathBuf, BuilderError> {
        which::which(tool).map_err(|_| BuilderError::ToolNotFound {
            tool: tool.to_string(),
        })
    }

    /// Run mock against the environment definition
    async fn mock(&self, args: Vec<OsString>) -> Result<(), BuilderError> {
        let program = match &self.mock_path {
            Some(path) => path.clone(),
            None => Self::locate(&self.settings.mock)?,
        };

        let mut full: Vec<OsString> = vec!["-r".into(), self.env_config.clone().into()];
        full.extend(self.settings.extra_args.iter().map(OsString::from));
        full.extend(args);
        run_command(&program, &full).await
    }
}

#[async_trait]
impl Builder for MockBuilder {
    async fn initialize(&mut self) -> Result<(), BuilderError> {
        self.mock_path = Some(Self::locate(&self.settings.mock)?);
        self.createrepo_path = Some(Self::locate(&self.settings.createrepo)?);

        filesystem::create_dir_all(&self.context.run_dir())?;
        filesystem::create_dir_all(&self.scratch_dir())?;

        tracing::info!("Initializing mock environment {}", self.env_config.display());
        self.mock(vec!["--init".into()]).await
    }

    async fn prepare_sources(
        &mut self,
        package: &Package,
        staged: &StagedSources,
    ) -> Result<(), BuilderError> {
        let srpm_dir = self.scratch_dir().join(&package.name).join("srpm");
        filesystem::recreate_dir(&srpm_dir)?;

        self.mock(vec![
            "--buildsrpm".into(),
            "--spec".into(),
            package.source.spec_file.clone().into(),
            "--sources".into(),
            staged.dir.clone().into(),
            "--resultdir".into(),
            srpm_dir.clone().into(),
        ])
        .await?;

        let srpm = filesystem::files_with_suffix(&srpm_dir, ".src.rpm")?
            .into_iter()
            .next()
            .ok_or_else(|| BuilderError::NoArtifacts {
                package: package.name.clone(),
                dir: srpm_dir.clone(),
            })?;

        tracing::debug!("{}: source RPM {}", package.name, srpm.display());
        self.srpms.insert(package.name.clone(), srpm);
        Ok(())
    }

    async fn build(&mut self, package: &Package) -> Result<(), BuilderError> {
        let srpm = self
            .srpms
            .get(&package.name)
            .cloned()
            .ok_or_else(|| BuilderError::NotPrepared {
                package: package.name.clone(),
            })?;

        let rpm_dir = self.scratch_dir().join(&package.name).join("rpms");
        filesystem::recreate_dir(&rpm_dir)?;

        tracing::info!("{}: Building {}", package.name, package.nvr());
        self.mock(vec![
            "--rebuild".into(),
            srpm.into(),
            "--resultdir".into(),
            rpm_dir.clone().into(),
        ])
        .await?;

        let rpms = filesystem::files_with_suffix(&rpm_dir, ".rpm")?;
        if rpms.is_empty() {
            return Err(BuilderError::NoArtifacts {
                package: package.name.clone(),
                dir: rpm_dir,
            });
        }

        let keep = self.packages_dir(&package.name);
        filesystem::recreate_dir(&keep)?;
        for rpm in &rpms {
            if let Some(name) = rpm.file_name() {
                filesystem::copy_file(rpm, &keep.join(name))?;
            }
        }
        Ok(())
    }

    async fn copy_results(&mut self, package: &Package) -> Result<(), BuilderError> {
        let source = self.packages_dir(&package.name);
        let rpms = filesystem::files_with_suffix(&source, ".rpm")?;
        if rpms.is_empty() {
            return Err(BuilderError::NoArtifacts {
                package: package.name.clone(),
                dir: source,
            });
        }

        let run_dir = self.context.run_dir();
        for rpm in &rpms {
            if let Some(name) = rpm.file_name() {
                filesystem::copy_file(rpm, &run_dir.join(name))?;
            }
        }
        tracing::debug!(
            "{}: copied {} RPMs to {}",
            package.name,
            rpms.len(),
            run_dir.display()
        );
        Ok(())
    }

    async fn create_repository(&mut self) -> Result<(), BuilderError> {
        let program = match &self.createrepo_path {
            Some(path) => path.clone(),
            None => Self::locate(&self.settings.createrepo)?,
        };
        let run_dir = self.context.run_dir();
        tracing::info!("Creating repository at {}", run_dir.display());
        run_command(&program, &[run_dir.into()]).await
    }

    async fn publish_latest(&mut self) -> Result<(), BuilderError> {
        let link = self.context.result_dir.join(defaults::LATEST_LINK);
        publish_link(&link, Path::new(&self.context.timestamp))?;
        tracing::info!("Published {} -> {}", link.display(), self.context.timestamp);
        Ok(())
    }

    async fn clean(&mut self) -> Result<(), BuilderError> {
        tracing::info!("Cleaning mock environment");
        let result = self.mock(vec!["--clean".into()]).await;
        filesystem::remove_dir_all(&self.scratch_dir())?;
        self.srpms.clear();
        result
    }
}

/// Run a command to completion, failing on a non-zero exit
async fn run_command(program: &Path, args: &[OsString]) -> Result<(), BuilderError> {
    let command_line = std::iter::once(program.as_os_str())
        .chain(args.iter().map(OsString::as_os_str))
        .map(|s| s.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ");
    tracing::debug!("Running {command_line}");

    let output = Command::new(program)
        .args(args)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| BuilderError::Spawn {
            command: command_line.clone(),
            error: e.to_string(),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stdout.is_empty() {
            tracing::debug!("stdout: {stdout}");
        }
        return Err(BuilderError::CommandFailed {
            command: command_line,
            status: output.status.to_string(),
            stderr: tail(&stderr, 20),
        });
    }
    Ok(())
}

/// Last `lines` lines of command output
fn tail(output: &str, lines: usize) -> String {
    let all: Vec<&str> = output.trim_end().lines().collect();
    all[all.len().saturating_sub(lines)..].join("\n")
}

/// Atomically point `link` at `target`
fn publish_link(link: &Path, target: &Path) -> Result<(), BuilderError> {
    let tmp = link.with_extension("tmp");
    let io_err = |e: std::io::Error| {
        BuilderError::Filesystem(crate::error::FilesystemError::WriteFile {
            path: link.to_path_buf(),
            error: e.to_string(),
        })
    };

    if tmp.symlink_metadata().is_ok() {
        std::fs::remove_file(&tmp).map_err(io_err)?;
    }
    symlink(target, &tmp).map_err(io_err)?;
    std::fs::rename(&tmp, link).map_err(io_err)
}

#[cfg(unix)]
fn symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::windows::fs::symlink_dir(target, link)
}
