//! Build run orchestration
//!
//! [`BuildManager::run`] prepares the package set, schedules it, and drives
//! each package through its lifecycle with one [`Builder`] for the whole
//! run. Per-package failures end up in the [`BuildReport`]; only errors that
//! stop the run before any package is attempted are returned as
//! [`RunError`].

use chrono::Utc;
use indicatif::ProgressBar;
use std::collections::BTreeSet;
use std::fmt::Display;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::config::defaults;
use crate::core::builder::{Builder, BuilderContext, BuilderRegistry};
use crate::core::distro::Distribution;
use crate::core::lifecycle::{FailureReason, PackageStatus, Step};
use crate::core::lock::{LockManager, PackageLock};
use crate::core::package::Package;
use crate::core::packages_manager::PackagesManager;
use crate::core::rebuild::{self, BuildRecord, MetadataStore, RebuildDecision, RebuildReason};
use crate::core::report::{BuildReport, PackageOutcome};
use crate::core::scheduler::Scheduler;
use crate::error::RunError;
use crate::infra::sources::SourceStager;

/// Batch policy for a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildOptions {
    /// Continue with independent packages after a failure
    pub keep_going: bool,
    /// Time limit for each per-package step
    pub step_timeout: Option<Duration>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            keep_going: true,
            step_timeout: None,
        }
    }
}

/// Directories a run writes to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildPaths {
    /// Transient build state
    pub work_dir: PathBuf,
    /// Parent of per-run result directories
    pub result_dir: PathBuf,
}

/// Orchestrates build runs
pub struct BuildManager {
    packages: PackagesManager,
    scheduler: Scheduler,
    registry: BuilderRegistry,
    locks: Arc<dyn LockManager>,
    store: Arc<dyn MetadataStore>,
    stager: SourceStager,
    paths: BuildPaths,
    options: BuildOptions,
    cancel: CancellationToken,
    progress: Option<ProgressBar>,
    timestamp: Option<String>,
}

impl BuildManager {
    /// Create a build manager
    pub fn new(
        packages: PackagesManager,
        registry: BuilderRegistry,
        locks: Arc<dyn LockManager>,
        store: Arc<dyn MetadataStore>,
        paths: BuildPaths,
    ) -> Self {
        Self {
            packages,
            scheduler: Scheduler::new(),
            registry,
            locks,
            store,
            stager: SourceStager::new(paths.work_dir.clone()),
            paths,
            options: BuildOptions::default(),
            cancel: CancellationToken::new(),
            progress: None,
            timestamp: None,
        }
    }

    /// Set the batch policy
    #[must_use]
    pub fn with_options(mut self, options: BuildOptions) -> Self {
        self.options = options;
        self
    }

    /// Use a custom source stager
    #[must_use]
    pub fn with_stager(mut self, stager: SourceStager) -> Self {
        self.stager = stager;
        self
    }

    /// Stop the run when `token` is cancelled
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Report progress on a bar
    #[must_use]
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Use a fixed run timestamp instead of the current time
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    /// Token that cancels this manager's runs
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Scheduled build order for `names` without building anything
    pub fn plan(&self, names: &[String], distro: &Distribution) -> Result<Vec<Package>, RunError> {
        let packages = self.packages.prepare(names, distro)?;
        Ok(self.scheduler.schedule(packages)?)
    }

    /// Build `names` and their dependencies for `distro`
    pub async fn run(
        &self,
        names: &[String],
        distro: &Distribution,
    ) -> Result<BuildReport, RunError> {
        let batch = self.plan(names, distro)?;
        self.execute(batch, distro).await
    }

    /// Build an already ordered batch
    pub async fn execute(
        &self,
        batch: Vec<Package>,
        distro: &Distribution,
    ) -> Result<BuildReport, RunError> {
        let timestamp = self.timestamp.clone().unwrap_or_else(|| {
            let now = chrono::Local::now()
                .format(defaults::RUN_TIMESTAMP_FORMAT)
                .to_string();
            unique_run_tag(&self.paths, now)
        });
        let context = BuilderContext {
            distro: distro.clone(),
            timestamp: timestamp.clone(),
            work_dir: self.paths.work_dir.clone(),
            result_dir: self.paths.result_dir.clone(),
        };

        let mut builder = self.registry.select(&context)?;
        if let Err(e) = builder.initialize().await {
            if let Err(clean) = builder.clean().await {
                tracing::warn!("Cleanup after failed initialization failed: {clean}");
            }
            return Err(RunError::Initialize(e));
        }
        tracing::info!("Building {} packages for {distro} (run {timestamp})", batch.len());

        let mut report = BuildReport::new(distro.clone(), timestamp, context.run_dir());
        let mut failed: BTreeSet<String> = BTreeSet::new();
        let mut aborted = false;

        if let Some(pb) = &self.progress {
            pb.set_length(batch.len() as u64);
        }

        for mut package in batch {
            if let Some(pb) = &self.progress {
                pb.set_message(package.name.clone());
            }

            let reason = self
                .process(builder.as_mut(), &mut package, distro, &failed, aborted, &mut report)
                .await;

            if let PackageStatus::Failed { reason: failure } = package.status() {
                failed.insert(package.name.clone());
                if !self.options.keep_going && !failure.is_not_attempted() && !aborted {
                    tracing::warn!("Aborting run after failure of {}", package.name);
                    aborted = true;
                }
            }
            report
                .packages
                .push(PackageOutcome::from_package(&package, reason));

            if let Some(pb) = &self.progress {
                pb.inc(1);
            }
        }

        self.finalize(builder.as_mut(), &mut report).await;

        if let Some(pb) = &self.progress {
            pb.finish_and_clear();
        }
        Ok(report)
    }

    /// Carry one package to a terminal state
    ///
    /// Returns the rebuild reason if the package was attempted.
    async fn process(
        &self,
        builder: &mut dyn Builder,
        package: &mut Package,
        distro: &Distribution,
        failed: &BTreeSet<String>,
        aborted: bool,
        report: &mut BuildReport,
    ) -> Option<RebuildReason> {
        if self.cancel.is_cancelled() {
            package.advance(PackageStatus::failed(FailureReason::Cancelled));
            return None;
        }
        if aborted {
            package.advance(PackageStatus::failed(FailureReason::Aborted));
            return None;
        }
        if let Some(dependency) = package.dependencies.iter().find(|d| failed.contains(*d)) {
            tracing::warn!(
                "{}: Skipping, dependency {dependency} failed.",
                package.name
            );
            let dependency = dependency.clone();
            package.advance(PackageStatus::failed(FailureReason::DependencyFailed {
                dependency,
            }));
            return None;
        }

        let reason = match rebuild::evaluate(package, distro) {
            RebuildDecision::UpToDate => {
                tracing::info!("{}: Skipping rebuild.", package.name);
                // The run's repository must still contain the previous RPMs
                match self
                    .step(Step::CopyResults, builder.copy_results(package))
                    .await
                {
                    Ok(()) => package.advance(PackageStatus::Skipped),
                    Err(failure) => {
                        tracing::error!(
                            "{}: previous results not carried forward: {failure}",
                            package.name
                        );
                        package.advance(PackageStatus::failed(failure));
                    }
                }
                return None;
            }
            RebuildDecision::Rebuild(reason) => reason,
        };

        match self.attempt(builder, package).await {
            Ok(()) => {
                let record = BuildRecord {
                    name: package.name.clone(),
                    version: package.version.clone(),
                    release: package.release.clone(),
                    fingerprint: package.fingerprint.clone(),
                    distro: distro.clone(),
                    built_at: Utc::now(),
                    run: report.timestamp.clone(),
                };
                if let Err(e) = self.store.record(record) {
                    tracing::warn!("{}: build record not saved: {e}", package.name);
                    report
                        .warnings
                        .push(format!("{}: build record not saved: {e}", package.name));
                }
                package.advance(PackageStatus::Done);
                tracing::info!("{}: Done.", package.name);
            }
            Err(failure) => {
                tracing::error!("{}: Failed: {failure}", package.name);
                package.advance(PackageStatus::failed(failure));
            }
        }
        Some(reason)
    }

    /// Lock, prepare, build, and copy results
    ///
    /// The lock covers source preparation only. Every exit path releases it
    /// exactly once: explicitly after preparation, or by the guard's drop
    /// when an earlier step fails.
    async fn attempt(
        &self,
        builder: &mut dyn Builder,
        package: &mut Package,
    ) -> Result<(), FailureReason> {
        let lock = PackageLock::acquire(self.locks.as_ref(), &package.name)
            .map_err(|e| FailureReason::Lock {
                error: e.to_string(),
            })?;
        package.advance(PackageStatus::Locked);

        let staged = self
            .step(Step::FetchSources, self.stager.stage(package))
            .await?;
        self.step(Step::PrepareSources, builder.prepare_sources(package, &staged))
            .await?;
        package.advance(PackageStatus::SourcesPrepared);

        if let Err(e) = lock.release() {
            tracing::warn!("{}: {e}", package.name);
        }

        self.check_cancelled()?;
        self.step(Step::Build, builder.build(package)).await?;
        package.advance(PackageStatus::Built);

        self.check_cancelled()?;
        self.step(Step::CopyResults, builder.copy_results(package))
            .await?;
        package.advance(PackageStatus::ResultsCopied);
        Ok(())
    }

    fn check_cancelled(&self) -> Result<(), FailureReason> {
        if self.cancel.is_cancelled() {
            Err(FailureReason::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Run one step under the configured time limit
    async fn step<T, E, F>(&self, step: Step, fut: F) -> Result<T, FailureReason>
    where
        E: Display,
        F: Future<Output = Result<T, E>>,
    {
        let result = match self.options.step_timeout {
            Some(limit) => tokio::time::timeout(limit, fut).await.map_err(|_| {
                FailureReason::TimedOut {
                    step,
                    seconds: limit.as_secs(),
                }
            })?,
            None => fut.await,
        };
        result.map_err(|e| FailureReason::Step {
            step,
            error: e.to_string(),
        })
    }

    /// Assemble the repository, publish it, and clean up
    ///
    /// A repository failure skips publishing. Cleanup always runs.
    async fn finalize(&self, builder: &mut dyn Builder, report: &mut BuildReport) {
        match builder.create_repository().await {
            Ok(()) => match builder.publish_latest().await {
                Ok(()) => report.published = true,
                Err(e) => {
                    tracing::error!("Failed to publish latest results: {e}");
                    report.finalize_errors.push(format!("publish latest: {e}"));
                }
            },
            Err(e) => {
                tracing::error!("Failed to create repository, not publishing: {e}");
                report
                    .finalize_errors
                    .push(format!("create repository: {e}"));
            }
        }

        if let Err(e) = builder.clean().await {
            tracing::error!("Cleanup failed: {e}");
            report.finalize_errors.push(format!("clean: {e}"));
        }
    }
}

/// `base`, or `base-N` if a run with that tag already left directories
fn unique_run_tag(paths: &BuildPaths, base: String) -> String {
    let taken = |tag: &str| {
        paths.result_dir.join(tag).exists() || paths.work_dir.join("build").join(tag).exists()
    };
    if !taken(&base) {
        return base;
    }
    (2u32..)
        .map(|n| format!("{base}-{n}"))
        .find(|tag| !taken(tag))
        .unwrap_or(base)
}

impl std::fmt::Debug for BuildManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildManager")
            .field("packages", &self.packages)
            .field("registry", &self.registry)
            .field("paths", &self.paths)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::ForceRebuild;
    use crate::core::report::RunOutcome;
    use crate::error::{BuilderError, ConfigError, LockError};
    use crate::infra::metadata::JsonMetadataStore;
    use crate::infra::sources::StagedSources;
    use async_trait::async_trait;
    use std::collections::{BTreeMap, HashSet};
    use std::sync::Mutex;
    use tempfile::TempDir;

    type Events = Arc<Mutex<Vec<String>>>;

    /// Records every call; fails or hangs on request
    #[derive(Default, Clone)]
    struct Recording {
        events: Events,
        fail: HashSet<String>,
        hang: HashSet<String>,
    }

    impl Recording {
        fn call(&self, event: String) -> Result<(), BuilderError> {
            self.events.lock().unwrap().push(event.clone());
            if self.fail.contains(&event) {
                return Err(BuilderError::CommandFailed {
                    command: event,
                    status: "exit status: 1".to_string(),
                    stderr: String::new(),
                });
            }
            Ok(())
        }

        async fn maybe_hang(&self, event: &str) {
            if self.hang.contains(event) {
                std::future::pending::<()>().await;
            }
        }
    }

    #[async_trait]
    impl Builder for Recording {
        async fn initialize(&mut self) -> Result<(), BuilderError> {
            self.call("initialize".to_string())
        }
        async fn prepare_sources(
            &mut self,
            package: &Package,
            _staged: &StagedSources,
        ) -> Result<(), BuilderError> {
            self.call(format!("prepare:{}", package.name))
        }
        async fn build(&mut self, package: &Package) -> Result<(), BuilderError> {
            let event = format!("build:{}", package.name);
            self.maybe_hang(&event).await;
            self.call(event)
        }
        async fn copy_results(&mut self, package: &Package) -> Result<(), BuilderError> {
            self.call(format!("copy:{}", package.name))
        }
        async fn create_repository(&mut self) -> Result<(), BuilderError> {
            self.call("create_repository".to_string())
        }
        async fn publish_latest(&mut self) -> Result<(), BuilderError> {
            self.call("publish_latest".to_string())
        }
        async fn clean(&mut self) -> Result<(), BuilderError> {
            self.call("clean".to_string())
        }
    }

    /// Counts acquisitions and releases; refuses listed packages
    #[derive(Default)]
    struct Counting {
        acquired: Mutex<BTreeMap<String, usize>>,
        released: Mutex<BTreeMap<String, usize>>,
        busy: HashSet<String>,
    }

    impl Counting {
        fn acquired(&self, name: &str) -> usize {
            self.acquired.lock().unwrap().get(name).copied().unwrap_or(0)
        }
        fn released(&self, name: &str) -> usize {
            self.released.lock().unwrap().get(name).copied().unwrap_or(0)
        }
    }

    impl LockManager for Counting {
        fn acquire(&self, package: &str) -> Result<(), LockError> {
            if self.busy.contains(package) {
                return Err(LockError::Contention {
                    package: package.to_string(),
                    path: PathBuf::from(format!("/locks/{package}.lock")),
                });
            }
            *self
                .acquired
                .lock()
                .unwrap()
                .entry(package.to_string())
                .or_default() += 1;
            Ok(())
        }
        fn release(&self, package: &str) -> Result<(), LockError> {
            *self
                .released
                .lock()
                .unwrap()
                .entry(package.to_string())
                .or_default() += 1;
            Ok(())
        }
    }

    struct Harness {
        _temp: TempDir,
        manager: BuildManager,
        events: Events,
        locks: Arc<Counting>,
    }

    fn harness(builder: Recording, locks: Counting, options: BuildOptions) -> Harness {
        let temp = TempDir::new().unwrap();
        let store: Arc<dyn MetadataStore> =
            Arc::new(JsonMetadataStore::open(&temp.path().join("state")).unwrap());
        let events = builder.events.clone();
        let mut registry = BuilderRegistry::new();
        registry.register("centos", move |_| -> Result<Box<dyn Builder>, ConfigError> {
            Ok(Box::new(builder.clone()))
        });
        let locks = Arc::new(locks);
        let manager = BuildManager::new(
            PackagesManager::new(temp.path().join("versions"), ForceRebuild::None, store.clone()),
            registry,
            locks.clone(),
            store,
            BuildPaths {
                work_dir: temp.path().join("work"),
                result_dir: temp.path().join("result"),
            },
        )
        .with_options(options)
        .with_timestamp("2017-03-01T101500");

        Harness {
            _temp: temp,
            manager,
            events,
            locks,
        }
    }

    fn distro() -> Distribution {
        Distribution::new("centos", "7", "ppc64le")
    }

    fn up_to_date(name: &str, deps: &[&str]) -> Package {
        let record = BuildRecord {
            name: name.to_string(),
            version: "1.0".to_string(),
            release: "1".to_string(),
            fingerprint: "same".to_string(),
            distro: distro(),
            built_at: Utc::now(),
            run: "2017-01-01T000000".to_string(),
        };
        Package::new(name, "1.0")
            .with_dependencies(deps.iter().copied())
            .with_fingerprint("same")
            .with_last_build(Some(record))
    }

    fn stale(name: &str, deps: &[&str]) -> Package {
        Package::new(name, "1.0")
            .with_dependencies(deps.iter().copied())
            .with_fingerprint("new")
    }

    fn status<'a>(report: &'a BuildReport, name: &str) -> &'a PackageStatus {
        &report.package(name).unwrap().status
    }

    fn events(events: &Events) -> Vec<String> {
        events.lock().unwrap().clone()
    }

    #[tokio::test]
    async fn test_forced_package_builds_others_skip() {
        let h = harness(Recording::default(), Counting::default(), BuildOptions::default());
        let batch = vec![
            up_to_date("A", &[]),
            up_to_date("B", &["A"]).with_force_rebuild(true),
            up_to_date("C", &["A"]),
        ];

        let report = h.manager.execute(batch, &distro()).await.unwrap();

        assert_eq!(status(&report, "A"), &PackageStatus::Skipped);
        assert_eq!(status(&report, "B"), &PackageStatus::Done);
        assert_eq!(status(&report, "C"), &PackageStatus::Skipped);
        assert_eq!(
            report.package("B").unwrap().rebuild_reason,
            Some(RebuildReason::Forced)
        );
        assert_eq!(h.locks.acquired("A"), 0);
        assert_eq!(h.locks.acquired("B"), 1);
        assert_eq!(h.locks.released("B"), 1);
        assert!(report.published);
        assert_eq!(
            events(&h.events),
            vec![
                "initialize",
                "copy:A",
                "prepare:B",
                "build:B",
                "copy:B",
                "copy:C",
                "create_repository",
                "publish_latest",
                "clean",
            ]
        );
    }

    #[tokio::test]
    async fn test_dependents_of_failed_package_are_not_attempted() {
        let builder = Recording {
            fail: HashSet::from(["build:A".to_string()]),
            ..Recording::default()
        };
        let h = harness(builder, Counting::default(), BuildOptions::default());
        let batch = vec![stale("A", &[]), stale("B", &["A"]), stale("C", &[])];

        let report = h.manager.execute(batch, &distro()).await.unwrap();

        assert!(matches!(
            status(&report, "A"),
            PackageStatus::Failed {
                reason: FailureReason::Step { step: Step::Build, .. }
            }
        ));
        assert_eq!(
            status(&report, "B"),
            &PackageStatus::failed(FailureReason::DependencyFailed {
                dependency: "A".to_string()
            })
        );
        assert_eq!(status(&report, "C"), &PackageStatus::Done);
        assert_eq!(h.locks.acquired("B"), 0);
        assert_eq!(h.locks.released("A"), 1);
        assert!(report.published);
    }

    #[tokio::test]
    async fn test_prepare_failure_releases_lock_once() {
        let builder = Recording {
            fail: HashSet::from(["prepare:A".to_string()]),
            ..Recording::default()
        };
        let h = harness(builder, Counting::default(), BuildOptions::default());

        let report = h.manager.execute(vec![stale("A", &[])], &distro()).await.unwrap();

        assert!(status(&report, "A").is_failed());
        assert_eq!(h.locks.acquired("A"), 1);
        assert_eq!(h.locks.released("A"), 1);
    }

    #[tokio::test]
    async fn test_lock_contention_fails_package() {
        let locks = Counting {
            busy: HashSet::from(["A".to_string()]),
            ..Counting::default()
        };
        let h = harness(Recording::default(), locks, BuildOptions::default());

        let report = h.manager.execute(vec![stale("A", &[])], &distro()).await.unwrap();

        assert!(matches!(
            status(&report, "A"),
            PackageStatus::Failed {
                reason: FailureReason::Lock { .. }
            }
        ));
        assert_eq!(h.locks.released("A"), 0);
        assert!(!events(&h.events).contains(&"prepare:A".to_string()));
    }

    #[tokio::test]
    async fn test_abort_on_first_failure() {
        let builder = Recording {
            fail: HashSet::from(["build:A".to_string()]),
            ..Recording::default()
        };
        let options = BuildOptions {
            keep_going: false,
            step_timeout: None,
        };
        let h = harness(builder, Counting::default(), options);

        let report = h
            .manager
            .execute(vec![stale("A", &[]), stale("B", &[])], &distro())
            .await
            .unwrap();

        assert_eq!(
            status(&report, "B"),
            &PackageStatus::failed(FailureReason::Aborted)
        );
        assert!(!events(&h.events).contains(&"prepare:B".to_string()));
        assert!(events(&h.events).contains(&"clean".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_step_timeout() {
        let builder = Recording {
            hang: HashSet::from(["build:A".to_string()]),
            ..Recording::default()
        };
        let options = BuildOptions {
            keep_going: true,
            step_timeout: Some(Duration::from_secs(30)),
        };
        let h = harness(builder, Counting::default(), options);

        let report = h
            .manager
            .execute(vec![stale("A", &[]), stale("B", &[])], &distro())
            .await
            .unwrap();

        assert_eq!(
            status(&report, "A"),
            &PackageStatus::failed(FailureReason::TimedOut {
                step: Step::Build,
                seconds: 30
            })
        );
        assert_eq!(h.locks.released("A"), 1);
        assert_eq!(status(&report, "B"), &PackageStatus::Done);
    }

    #[tokio::test]
    async fn test_cancelled_run_still_finalizes() {
        let h = harness(Recording::default(), Counting::default(), BuildOptions::default());
        h.manager.cancellation_token().cancel();

        let report = h
            .manager
            .execute(vec![stale("A", &[]), stale("B", &["A"])], &distro())
            .await
            .unwrap();

        assert_eq!(
            status(&report, "A"),
            &PackageStatus::failed(FailureReason::Cancelled)
        );
        assert_eq!(
            status(&report, "B"),
            &PackageStatus::failed(FailureReason::Cancelled)
        );
        assert!(events(&h.events).contains(&"clean".to_string()));
    }

    #[tokio::test]
    async fn test_repository_failure_skips_publish_but_cleans() {
        let builder = Recording {
            fail: HashSet::from(["create_repository".to_string()]),
            ..Recording::default()
        };
        let h = harness(builder, Counting::default(), BuildOptions::default());

        let report = h.manager.execute(vec![stale("A", &[])], &distro()).await.unwrap();

        assert!(!report.published);
        assert_eq!(report.finalize_errors.len(), 1);
        let events = events(&h.events);
        assert!(!events.contains(&"publish_latest".to_string()));
        assert!(events.contains(&"clean".to_string()));
    }

    #[tokio::test]
    async fn test_carry_forward_failure_fails_package() {
        let builder = Recording {
            fail: HashSet::from(["copy:A".to_string()]),
            ..Recording::default()
        };
        let h = harness(builder, Counting::default(), BuildOptions::default());

        let report = h
            .manager
            .execute(vec![up_to_date("A", &[]), stale("B", &["A"])], &distro())
            .await
            .unwrap();

        assert!(matches!(
            status(&report, "A"),
            PackageStatus::Failed {
                reason: FailureReason::Step {
                    step: Step::CopyResults,
                    ..
                }
            }
        ));
        assert!(matches!(
            status(&report, "B"),
            PackageStatus::Failed {
                reason: FailureReason::DependencyFailed { .. }
            }
        ));
        assert_eq!(report.outcome(), RunOutcome::PartialFailure);
        assert_eq!(h.locks.acquired("A"), 0);
    }

    #[tokio::test]
    async fn test_initialize_failure_is_run_error() {
        let builder = Recording {
            fail: HashSet::from(["initialize".to_string()]),
            ..Recording::default()
        };
        let h = harness(builder, Counting::default(), BuildOptions::default());

        let result = h.manager.execute(vec![stale("A", &[])], &distro()).await;
        assert!(matches!(result, Err(RunError::Initialize(_))));
        assert_eq!(h.locks.acquired("A"), 0);
        assert_eq!(events(&h.events), vec!["initialize", "clean"]);
    }

    #[tokio::test]
    async fn test_unknown_family_is_config_error() {
        let h = harness(Recording::default(), Counting::default(), BuildOptions::default());
        let result = h
            .manager
            .execute(vec![stale("A", &[])], &Distribution::new("fedora", "27", "x86_64"))
            .await;
        assert!(matches!(
            result,
            Err(RunError::Config(ConfigError::NoBuilder { .. }))
        ));
    }

    #[test]
    fn test_run_tag_avoids_existing_runs() {
        let temp = TempDir::new().unwrap();
        let paths = BuildPaths {
            work_dir: temp.path().join("work"),
            result_dir: temp.path().join("result"),
        };
        let base = "2017-03-01T101500.123".to_string();
        assert_eq!(unique_run_tag(&paths, base.clone()), base);

        std::fs::create_dir_all(paths.result_dir.join(&base)).unwrap();
        assert_eq!(unique_run_tag(&paths, base.clone()), format!("{base}-2"));

        std::fs::create_dir_all(paths.work_dir.join("build").join(format!("{base}-2"))).unwrap();
        assert_eq!(unique_run_tag(&paths, base.clone()), format!("{base}-3"));
    }

    #[tokio::test]
    async fn test_successful_build_is_recorded() {
        let h = harness(Recording::default(), Counting::default(), BuildOptions::default());
        h.manager
            .execute(vec![stale("A", &[])], &distro())
            .await
            .unwrap();

        let record = h.manager.store.lookup("A").unwrap().unwrap();
        assert_eq!(record.fingerprint, "new");
        assert_eq!(record.run, "2017-03-01T101500");
    }
}
