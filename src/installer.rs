// Copyright (C) 2026 Melanin Click Team
// Licensed under GPL-3.0-or-later

//! Install orchestration: storage check, download, extraction and config
//! generation as one cancellable job per package.
//!
//! At most one job per package runs at a time. A second `install` call for a
//! busy package attaches to the running job instead of starting another
//! download to the same archive path.

use crate::controls::{JobPhase, LogLevel, UiMessage};
use crate::error::{InstallError, InstallResult};
use crate::extract::extract_archive;
use crate::fetch::Fetcher;
use crate::package::{Download, InstallLayout, PackageId, Platform, Variant};
use crate::runtime_config::RuntimeConfig;
use crate::storage::{select_variant, FreeSpace};
use futures_util::future::join_all;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

/// Observer side of an install job.
#[derive(Debug, Clone)]
pub struct JobHandle {
    id: u64,
    package: PackageId,
    cancel: CancellationToken,
    phase: watch::Receiver<JobPhase>,
}

impl JobHandle {
    pub fn package(&self) -> PackageId {
        self.package
    }

    pub fn phase(&self) -> JobPhase {
        *self.phase.borrow()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Resolve once the job reaches `Done`, `Failed` or `Cancelled`.
    pub async fn wait(&mut self) -> JobPhase {
        self.wait_for(JobPhase::is_terminal).await
    }

    pub async fn wait_for(&mut self, mut predicate: impl FnMut(JobPhase) -> bool) -> JobPhase {
        let reached = self.phase.wait_for(|p| predicate(*p)).await.map(|p| *p);
        // sender gone: the last value is final
        reached.unwrap_or_else(|_| *self.phase.borrow())
    }
}

/// Result of an `install` call.
#[derive(Debug)]
pub struct InstallTicket {
    pub handle: JobHandle,
    /// The package was already being installed; this ticket observes that job.
    pub attached: bool,
}

type JobTable = Arc<Mutex<HashMap<PackageId, JobHandle>>>;

#[derive(Clone)]
pub struct Installer {
    runtime: Handle,
    fetcher: Arc<dyn Fetcher>,
    storage: Arc<dyn FreeSpace>,
    layout: InstallLayout,
    platform: Platform,
    events: mpsc::Sender<UiMessage>,
    jobs: JobTable,
    next_id: Arc<AtomicU64>,
}

impl Installer {
    pub fn new(
        runtime: Handle,
        fetcher: Arc<dyn Fetcher>,
        storage: Arc<dyn FreeSpace>,
        layout: InstallLayout,
        platform: Platform,
        events: mpsc::Sender<UiMessage>,
    ) -> Self {
        Self {
            runtime,
            fetcher,
            storage,
            layout,
            platform,
            events,
            jobs: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn layout(&self) -> &InstallLayout {
        &self.layout
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    fn download(&self, package: PackageId) -> InstallResult<&'static Download> {
        package
            .spec()
            .download_for(self.platform)
            .ok_or_else(|| InstallError::Unsupported(package.display_name().to_string()))
    }

    /// Path of the package's main executable once installed.
    pub fn executable(&self, package: PackageId) -> InstallResult<PathBuf> {
        Ok(self.layout.executable(package, self.download(package)?))
    }

    /// The package executable is present on disk.
    pub fn installed(&self, package: PackageId) -> bool {
        self.executable(package).map(|p| p.exists()).unwrap_or(false)
    }

    pub fn is_busy(&self, package: PackageId) -> bool {
        self.lock_jobs()
            .get(&package)
            .map(|job| !job.phase().is_terminal())
            .unwrap_or(false)
    }

    /// Request cancellation of a running job. Returns false when nothing was running.
    pub fn cancel(&self, package: PackageId) -> bool {
        match self.lock_jobs().get(&package) {
            Some(job) if !job.phase().is_terminal() => {
                crate::debug::log(&format!("Cancellation requested for {}", package.name()));
                job.cancel();
                true
            }
            _ => false,
        }
    }

    /// Start installing `package`, or attach to the job already doing so.
    pub fn install(&self, package: PackageId) -> InstallResult<InstallTicket> {
        let download = self.download(package)?;

        let mut jobs = self.lock_jobs();
        if let Some(existing) = jobs.get(&package) {
            if !existing.phase().is_terminal() {
                crate::debug::log(&format!(
                    "Install of {} requested while job {} is running; attaching",
                    package.name(),
                    existing.id
                ));
                return Ok(InstallTicket {
                    handle: existing.clone(),
                    attached: true,
                });
            }
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let cancel = CancellationToken::new();
        let (phase_tx, phase_rx) = watch::channel(JobPhase::Idle);
        let handle = JobHandle {
            id,
            package,
            cancel: cancel.clone(),
            phase: phase_rx,
        };
        jobs.insert(package, handle.clone());
        drop(jobs);

        crate::debug::log_section(&format!("Install {} (job {})", package.name(), id));

        let job = InstallJob {
            id,
            package,
            download,
            fetcher: self.fetcher.clone(),
            storage: self.storage.clone(),
            layout: self.layout.clone(),
            events: self.events.clone(),
            cancel,
            phase: phase_tx,
            jobs: self.jobs.clone(),
        };
        self.runtime.spawn(job.run());

        Ok(InstallTicket {
            handle,
            attached: false,
        })
    }

    /// Cancel every running job and block until each reaches a terminal
    /// phase or `grace` runs out. Returns the phase each job ended in.
    ///
    /// Must be called from outside the runtime, before it is dropped, so the
    /// cancelled jobs get to delete their partial archives.
    pub fn shutdown(&self, grace: Duration) -> Vec<(PackageId, JobPhase)> {
        let running: Vec<JobHandle> = self
            .lock_jobs()
            .values()
            .filter(|job| !job.phase().is_terminal())
            .cloned()
            .collect();
        if running.is_empty() {
            return Vec::new();
        }

        for job in &running {
            crate::debug::log(&format!("Shutting down {} install (job {})", job.package.name(), job.id));
            job.cancel();
        }

        let waits = running.into_iter().map(|mut job| async move {
            let ended = tokio::time::timeout(grace, job.wait())
                .await
                .unwrap_or_else(|_| job.phase());
            (job.package(), ended)
        });
        self.runtime.block_on(join_all(waits))
    }

    fn lock_jobs(&self) -> std::sync::MutexGuard<'_, HashMap<PackageId, JobHandle>> {
        self.jobs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Worker side of one install.
struct InstallJob {
    id: u64,
    package: PackageId,
    download: &'static Download,
    fetcher: Arc<dyn Fetcher>,
    storage: Arc<dyn FreeSpace>,
    layout: InstallLayout,
    events: mpsc::Sender<UiMessage>,
    cancel: CancellationToken,
    phase: watch::Sender<JobPhase>,
    jobs: JobTable,
}

impl InstallJob {
    async fn run(self) {
        let name = self.package.display_name();
        let result = self.execute().await;

        let (final_phase, variant) = match result {
            Ok(variant) => {
                let what = variant_suffix(self.package, variant);
                self.log(LogLevel::Success, format!("{} {} installed", name, what)).await;
                (JobPhase::Done, Some(variant))
            }
            Err(e) if e.is_cancelled() => {
                self.log(LogLevel::Warning, format!("{} installation cancelled", name)).await;
                (JobPhase::Cancelled, None)
            }
            Err(e) => {
                crate::debug::log(&format!("ERROR: {} install failed: {:?}", self.package.name(), e));
                self.log(LogLevel::Error, format!("{}: {}", name, e)).await;
                (JobPhase::Failed, None)
            }
        };

        self.emit(UiMessage::Phase {
            package: self.package,
            phase: final_phase,
            variant,
        })
        .await;

        {
            let mut jobs = self.jobs.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            if jobs.get(&self.package).map(|job| job.id) == Some(self.id) {
                jobs.remove(&self.package);
            }
        }

        // Observers wake only after every message for this job is queued
        self.phase.send_replace(final_phase);
    }

    async fn execute(&self) -> InstallResult<Variant> {
        let name = self.package.display_name();

        self.enter(JobPhase::CheckingStorage, None).await;
        let free_gb = self.storage.free_space_gb(self.layout.home())?;
        crate::debug::log(&format!("Free space under {:?}: {:.2} GB", self.layout.home(), free_gb));
        let variant = select_variant(free_gb, &self.package.spec().storage)?;
        self.log(
            LogLevel::Info,
            format!("{:.1} GB free, installing {}", free_gb, variant_suffix(self.package, variant)),
        )
        .await;
        self.check_cancelled()?;

        self.enter(JobPhase::Downloading, Some(variant)).await;
        let install_root = self.layout.install_root(self.package);
        let archive = self.layout.archive_path(self.package, self.download.format);
        tokio::fs::create_dir_all(&install_root)
            .await
            .map_err(|e| InstallError::filesystem(format!("Failed to create {:?}", install_root), e))?;

        self.log(LogLevel::Info, format!("Downloading {}...", name)).await;
        let events = self.events.clone();
        let package = self.package;
        let progress = move |downloaded: u64, total: Option<u64>| {
            // dropped when the UI is behind
            let _ = events.try_send(UiMessage::Progress {
                package,
                downloaded,
                total,
            });
        };

        let outcome = match self
            .fetcher
            .fetch(self.download.url, &archive, &self.cancel, &progress)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                remove_archive(&archive).await;
                return Err(e);
            }
        };
        crate::debug::log(&format!(
            "Downloaded {} bytes to {:?}, SHA-256 {}",
            outcome.bytes, archive, outcome.sha256
        ));
        self.log(
            LogLevel::Info,
            format!(
                "Downloaded {:.1} MB (SHA-256 {})",
                outcome.bytes as f64 / 1_000_000.0,
                outcome.sha256
            ),
        )
        .await;

        if self.cancel.is_cancelled() {
            remove_archive(&archive).await;
            return Err(InstallError::Cancelled);
        }

        // No cancellation from here on
        self.enter(JobPhase::Extracting, Some(variant)).await;
        self.log(LogLevel::Info, format!("Extracting {}...", name)).await;
        extract_archive(&archive, &install_root, self.download.format).await?;
        remove_archive(&archive).await;

        let executable = self.layout.executable(self.package, self.download);
        if !executable.exists() {
            return Err(InstallError::CorruptArchive(format!(
                "archive did not contain {}",
                self.download.executable
            )));
        }

        self.enter(JobPhase::Configuring, Some(variant)).await;
        if let Some(config) = RuntimeConfig::for_package(&self.layout, self.package, variant) {
            if config.materialize()? {
                self.log(LogLevel::Info, format!("Created {}", config.path().display())).await;
            } else {
                self.log(
                    LogLevel::Info,
                    format!("Keeping existing {}", config.path().display()),
                )
                .await;
            }
        }

        Ok(variant)
    }

    fn check_cancelled(&self) -> InstallResult<()> {
        if self.cancel.is_cancelled() {
            Err(InstallError::Cancelled)
        } else {
            Ok(())
        }
    }

    async fn enter(&self, phase: JobPhase, variant: Option<Variant>) {
        crate::debug::log(&format!("{} -> {}", self.package.name(), phase.label()));
        self.phase.send_replace(phase);
        self.emit(UiMessage::Phase {
            package: self.package,
            phase,
            variant,
        })
        .await;
    }

    async fn log(&self, level: LogLevel, text: String) {
        self.emit(UiMessage::Log { level, text }).await;
    }

    async fn emit(&self, message: UiMessage) {
        // A closed channel means the window is gone; the job still finishes
        let _ = self.events.send(message).await;
    }
}

fn variant_suffix(package: PackageId, variant: Variant) -> &'static str {
    match package {
        PackageId::Bitcoin => variant.label(),
        PackageId::Lnd | PackageId::Whive => "node",
        PackageId::CpuMiner => "miner",
    }
}

async fn remove_archive(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => crate::debug::log(&format!("Removed archive {:?}", path)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => crate::debug::log(&format!("WARNING: could not remove {:?}: {}", path, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::fixtures;
    use crate::fetch::{write_stream, FetchOutcome, ProgressFn};
    use async_trait::async_trait;
    use futures_util::stream;
    use futures_util::StreamExt;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use tokio::sync::Notify;

    const PLATFORM: Platform = Platform::LinuxX86_64;

    struct StubStorage(f64);

    impl FreeSpace for StubStorage {
        fn free_space_gb(&self, _mount_point: &Path) -> InstallResult<f64> {
            Ok(self.0)
        }
    }

    enum Behaviour {
        /// Serve the body in one chunk.
        Serve(Vec<u8>),
        /// Write one chunk, then stall until cancelled.
        Stall,
        /// Leave a partial file behind and fail.
        BreakMidway,
        /// Serve the body, but the token is cancelled by the time it returns.
        ServeThenCancel(Vec<u8>),
    }

    struct StubFetcher {
        behaviour: Behaviour,
        calls: AtomicUsize,
        gate: Option<Arc<Notify>>,
    }

    impl StubFetcher {
        fn new(behaviour: Behaviour) -> Arc<Self> {
            Arc::new(Self {
                behaviour,
                calls: AtomicUsize::new(0),
                gate: None,
            })
        }

        fn gated(behaviour: Behaviour, gate: Arc<Notify>) -> Arc<Self> {
            Arc::new(Self {
                behaviour,
                calls: AtomicUsize::new(0),
                gate: Some(gate),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Fetcher for StubFetcher {
        async fn fetch(
            &self,
            _url: &str,
            dest: &Path,
            cancel: &CancellationToken,
            progress: &ProgressFn,
        ) -> InstallResult<FetchOutcome> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            let long = Duration::from_secs(30);
            match &self.behaviour {
                Behaviour::Serve(body) => {
                    let chunks = stream::iter(vec![Ok::<_, std::io::Error>(body.clone())]);
                    write_stream(chunks, dest, Some(body.len() as u64), cancel, long, progress).await
                }
                Behaviour::Stall => {
                    let chunks = stream::iter(vec![Ok::<_, std::io::Error>(vec![0u8; 64])])
                        .chain(stream::pending());
                    write_stream(chunks, dest, None, cancel, long, progress).await
                }
                Behaviour::BreakMidway => {
                    std::fs::write(dest, b"partial").unwrap();
                    Err(InstallError::Network("connection reset".into()))
                }
                Behaviour::ServeThenCancel(body) => {
                    let chunks = stream::iter(vec![Ok::<_, std::io::Error>(body.clone())]);
                    let outcome =
                        write_stream(chunks, dest, Some(body.len() as u64), cancel, long, progress).await;
                    cancel.cancel();
                    outcome
                }
            }
        }
    }

    struct Harness {
        home: tempfile::TempDir,
        installer: Installer,
        rx: mpsc::Receiver<UiMessage>,
    }

    impl Harness {
        fn new(fetcher: Arc<dyn Fetcher>, free_gb: f64) -> Self {
            Self::on(Handle::current(), fetcher, free_gb)
        }

        fn on(runtime: Handle, fetcher: Arc<dyn Fetcher>, free_gb: f64) -> Self {
            let home = tempfile::tempdir().unwrap();
            let (tx, rx) = mpsc::channel(256);
            let installer = Installer::new(
                runtime,
                fetcher,
                Arc::new(StubStorage(free_gb)),
                InstallLayout::new(home.path()),
                PLATFORM,
                tx,
            );
            Self { home, installer, rx }
        }

        fn layout(&self) -> &InstallLayout {
            self.installer.layout()
        }

        fn drain(&mut self) -> Vec<UiMessage> {
            let mut out = Vec::new();
            while let Ok(message) = self.rx.try_recv() {
                out.push(message);
            }
            out
        }
    }

    fn phases(messages: &[UiMessage], package: PackageId) -> Vec<JobPhase> {
        messages
            .iter()
            .filter_map(|m| match m {
                UiMessage::Phase { package: p, phase, .. } if *p == package => Some(*phase),
                _ => None,
            })
            .collect()
    }

    fn errors(messages: &[UiMessage]) -> Vec<String> {
        messages
            .iter()
            .filter_map(|m| match m {
                UiMessage::Log {
                    level: LogLevel::Error,
                    text,
                } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    fn whive_archive() -> Vec<u8> {
        fixtures::tar_gz(&[("whive/bin/whive-qt", b"#!/bin/sh\n"), ("whive/bin/whived", b"")])
    }

    #[tokio::test]
    async fn test_whive_install_walks_phases_in_order() {
        let fetcher = StubFetcher::new(Behaviour::Serve(whive_archive()));
        let mut h = Harness::new(fetcher.clone(), 50.0);

        let mut ticket = h.installer.install(PackageId::Whive).unwrap();
        assert!(!ticket.attached);
        assert_eq!(ticket.handle.wait().await, JobPhase::Done);

        let messages = h.drain();
        assert_eq!(
            phases(&messages, PackageId::Whive),
            vec![
                JobPhase::CheckingStorage,
                JobPhase::Downloading,
                JobPhase::Extracting,
                JobPhase::Configuring,
                JobPhase::Done,
            ]
        );

        // Run control follows the same stream
        let mut state = crate::controls::ControlState::new(|_| false);
        for message in &messages {
            let before = state.controls(PackageId::Whive).run;
            state = crate::controls::reduce(state, message);
            let after = state.controls(PackageId::Whive).run;
            if after && !before {
                assert!(matches!(
                    message,
                    UiMessage::Phase {
                        phase: JobPhase::Done,
                        ..
                    }
                ));
            }
        }
        assert!(state.controls(PackageId::Whive).run);

        let layout = h.layout();
        assert!(layout.install_root(PackageId::Whive).join("whive/bin/whive-qt").exists());
        assert!(!layout
            .archive_path(PackageId::Whive, crate::extract::ArchiveFormat::TarGz)
            .exists());
        assert_eq!(
            std::fs::read_to_string(h.home.path().join(".whive/whive.conf")).unwrap(),
            "daemon=1\ntxindex=1\n"
        );
        assert!(h.installer.installed(PackageId::Whive));
        assert!(!h.installer.is_busy(PackageId::Whive));
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_low_storage_fails_without_download() {
        let fetcher = StubFetcher::new(Behaviour::Serve(whive_archive()));
        let mut h = Harness::new(fetcher.clone(), 10.0);

        let mut ticket = h.installer.install(PackageId::Whive).unwrap();
        assert_eq!(ticket.handle.wait().await, JobPhase::Failed);
        assert_eq!(fetcher.calls(), 0);

        let messages = h.drain();
        assert_eq!(
            phases(&messages, PackageId::Whive),
            vec![JobPhase::CheckingStorage, JobPhase::Failed]
        );
        let errors = errors(&messages);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("Whive Core: insufficient space"), "{}", errors[0]);
    }

    #[tokio::test]
    async fn test_bitcoin_between_thresholds_installs_pruned() {
        let body = fixtures::tar_gz(&[("bitcoin-22.0/bin/bitcoin-qt", b"qt")]);
        let fetcher = StubFetcher::new(Behaviour::Serve(body));
        let mut h = Harness::new(fetcher, 120.0);

        let mut ticket = h.installer.install(PackageId::Bitcoin).unwrap();
        assert_eq!(ticket.handle.wait().await, JobPhase::Done);

        let messages = h.drain();
        assert!(messages.iter().any(|m| matches!(
            m,
            UiMessage::Phase {
                phase: JobPhase::Done,
                variant: Some(Variant::Pruned),
                ..
            }
        )));
        let pruned = h.home.path().join(".bitcoin/pruned/bitcoin.conf");
        assert_eq!(std::fs::read_to_string(pruned).unwrap(), "prune=550\ndaemon=1\n");
        assert!(!h.home.path().join(".bitcoin/mainnet").exists());
        // Same install root as a full node would use
        assert!(h.home.path().join("bitcoin-core/bitcoin-22.0/bin/bitcoin-qt").exists());
    }

    #[tokio::test]
    async fn test_concurrent_install_fetches_once() {
        let gate = Arc::new(Notify::new());
        let fetcher = StubFetcher::gated(Behaviour::Serve(whive_archive()), gate.clone());
        let mut h = Harness::new(fetcher.clone(), 50.0);

        let mut first = h.installer.install(PackageId::Whive).unwrap();
        let mut second = h.installer.install(PackageId::Whive).unwrap();
        assert!(!first.attached);
        assert!(second.attached);
        assert!(h.installer.is_busy(PackageId::Whive));

        first.handle.wait_for(|p| p == JobPhase::Downloading).await;
        gate.notify_one();

        assert_eq!(first.handle.wait().await, JobPhase::Done);
        assert_eq!(second.handle.wait().await, JobPhase::Done);
        assert_eq!(fetcher.calls(), 1);

        let messages = h.drain();
        assert_eq!(
            phases(&messages, PackageId::Whive)
                .iter()
                .filter(|p| **p == JobPhase::Downloading)
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn test_install_after_finish_starts_new_job() {
        let fetcher = StubFetcher::new(Behaviour::Serve(whive_archive()));
        let h = Harness::new(fetcher.clone(), 50.0);

        let mut first = h.installer.install(PackageId::Whive).unwrap();
        first.handle.wait().await;
        let mut again = h.installer.install(PackageId::Whive).unwrap();
        assert!(!again.attached);
        assert_eq!(again.handle.wait().await, JobPhase::Done);
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn test_reinstall_keeps_operator_config() {
        let fetcher = StubFetcher::new(Behaviour::Serve(whive_archive()));
        let h = Harness::new(fetcher, 50.0);
        let conf = h.home.path().join(".whive/whive.conf");
        std::fs::create_dir_all(conf.parent().unwrap()).unwrap();
        std::fs::write(&conf, "daemon=0\nrpcuser=me\n").unwrap();

        let mut ticket = h.installer.install(PackageId::Whive).unwrap();
        assert_eq!(ticket.handle.wait().await, JobPhase::Done);
        assert_eq!(std::fs::read_to_string(&conf).unwrap(), "daemon=0\nrpcuser=me\n");
    }

    #[tokio::test]
    async fn test_cancel_during_download_leaves_no_archive() {
        let fetcher = StubFetcher::new(Behaviour::Stall);
        let mut h = Harness::new(fetcher, 50.0);
        let archive = h
            .layout()
            .archive_path(PackageId::Whive, crate::extract::ArchiveFormat::TarGz);

        let mut ticket = h.installer.install(PackageId::Whive).unwrap();
        ticket.handle.wait_for(|p| p == JobPhase::Downloading).await;
        for _ in 0..200 {
            if archive.exists() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(archive.exists());

        assert!(h.installer.cancel(PackageId::Whive));
        assert_eq!(ticket.handle.wait().await, JobPhase::Cancelled);
        assert!(!archive.exists());
        assert!(!h.installer.cancel(PackageId::Whive));

        let messages = h.drain();
        assert_eq!(phases(&messages, PackageId::Whive).last(), Some(&JobPhase::Cancelled));
        assert!(errors(&messages).is_empty());
    }

    #[tokio::test]
    async fn test_cancel_after_download_discards_archive() {
        let fetcher = StubFetcher::new(Behaviour::ServeThenCancel(whive_archive()));
        let mut h = Harness::new(fetcher.clone(), 50.0);

        let mut ticket = h.installer.install(PackageId::Whive).unwrap();
        assert_eq!(ticket.handle.wait().await, JobPhase::Cancelled);
        assert_eq!(fetcher.calls(), 1);
        assert!(!h
            .layout()
            .archive_path(PackageId::Whive, crate::extract::ArchiveFormat::TarGz)
            .exists());
        assert!(!h
            .layout()
            .install_root(PackageId::Whive)
            .join("whive/bin/whive-qt")
            .exists());
        assert!(!h.installer.installed(PackageId::Whive));

        let messages = h.drain();
        let seen = phases(&messages, PackageId::Whive);
        assert!(!seen.contains(&JobPhase::Extracting), "{:?}", seen);
        assert_eq!(seen.last(), Some(&JobPhase::Cancelled));
        assert!(errors(&messages).is_empty());
    }

    #[test]
    fn test_shutdown_waits_for_cleanup_before_runtime_drops() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let fetcher = StubFetcher::new(Behaviour::Stall);
        let mut h = Harness::on(runtime.handle().clone(), fetcher, 50.0);
        let archive = h
            .layout()
            .archive_path(PackageId::Whive, crate::extract::ArchiveFormat::TarGz);

        let mut ticket = h.installer.install(PackageId::Whive).unwrap();
        runtime.block_on(async {
            ticket.handle.wait_for(|p| p == JobPhase::Downloading).await;
            for _ in 0..200 {
                if archive.exists() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        });
        assert!(archive.exists());

        // the window is gone; nothing drains any more
        h.rx.close();
        assert_eq!(
            h.installer.shutdown(Duration::from_secs(5)),
            vec![(PackageId::Whive, JobPhase::Cancelled)]
        );
        drop(runtime);

        assert!(!archive.exists());
        assert!(!h.installer.is_busy(PackageId::Whive));
    }

    #[test]
    fn test_shutdown_with_nothing_running() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let fetcher = StubFetcher::new(Behaviour::Stall);
        let h = Harness::on(runtime.handle().clone(), fetcher.clone(), 50.0);

        assert!(h.installer.shutdown(Duration::from_secs(5)).is_empty());
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn test_network_failure_removes_partial_archive() {
        let fetcher = StubFetcher::new(Behaviour::BreakMidway);
        let mut h = Harness::new(fetcher, 50.0);

        let mut ticket = h.installer.install(PackageId::Whive).unwrap();
        assert_eq!(ticket.handle.wait().await, JobPhase::Failed);
        assert!(!h
            .layout()
            .archive_path(PackageId::Whive, crate::extract::ArchiveFormat::TarGz)
            .exists());

        let errors = errors(&h.drain());
        assert_eq!(errors, vec!["Whive Core: network error: connection reset".to_string()]);
    }

    #[tokio::test]
    async fn test_archive_without_executable_fails() {
        let body = fixtures::tar_gz(&[("whive/README", b"no binaries here")]);
        let fetcher = StubFetcher::new(Behaviour::Serve(body));
        let mut h = Harness::new(fetcher, 50.0);

        let mut ticket = h.installer.install(PackageId::Whive).unwrap();
        assert_eq!(ticket.handle.wait().await, JobPhase::Failed);
        let errors = errors(&h.drain());
        assert!(errors[0].contains("corrupt archive"), "{}", errors[0]);
        assert!(!h.home.path().join(".whive/whive.conf").exists());
    }

    #[tokio::test]
    async fn test_traversal_archive_is_kept_for_inspection() {
        let body = fixtures::tar_gz(&[("../../evil", b"x")]);
        let fetcher = StubFetcher::new(Behaviour::Serve(body));
        let h = Harness::new(fetcher, 50.0);

        let mut ticket = h.installer.install(PackageId::Whive).unwrap();
        assert_eq!(ticket.handle.wait().await, JobPhase::Failed);
        assert!(h
            .layout()
            .archive_path(PackageId::Whive, crate::extract::ArchiveFormat::TarGz)
            .exists());
        assert!(!h.home.path().parent().unwrap().join("evil").exists());
    }

    #[tokio::test]
    async fn test_unsupported_platform_is_rejected_up_front() {
        let fetcher = StubFetcher::new(Behaviour::Stall);
        let home = tempfile::tempdir().unwrap();
        let (tx, _rx) = mpsc::channel(8);
        let installer = Installer::new(
            Handle::current(),
            fetcher.clone(),
            Arc::new(StubStorage(500.0)),
            InstallLayout::new(home.path()),
            Platform::WindowsX86_64,
            tx,
        );

        assert!(matches!(
            installer.install(PackageId::CpuMiner),
            Err(InstallError::Unsupported(_))
        ));
        assert!(!installer.installed(PackageId::CpuMiner));
        assert_eq!(fetcher.calls(), 0);
    }
}
