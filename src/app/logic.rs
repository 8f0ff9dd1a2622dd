// Copyright (C) 2026 Melanin Click Team
// Licensed under GPL-3.0-or-later

use super::state::{LogLine, MAX_LOG_LINES};
use super::{Dialog, MinerTarget, WizardApp};
use crate::config::pool_by_name;
use crate::controls::{reduce, ControlState, JobPhase, LogLevel, UiMessage};
use crate::error::{InstallError, InstallResult};
use crate::launcher::LaunchRequest;
use crate::miner::{bitcoin_cpu_request, stick_miner_request, whive_miner_request, MinerDevice};
use crate::package::{InstallLayout, PackageId, Variant};
use crate::runtime_config::RuntimeConfig;
use std::path::PathBuf;

/// What to do with a parked miner launch after a message arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum PendingMiner {
    Launch,
    Discard,
}

pub(super) fn pending_miner_action(message: &UiMessage) -> Option<PendingMiner> {
    match message {
        UiMessage::Phase {
            package: PackageId::CpuMiner,
            phase,
            ..
        } => match phase {
            JobPhase::Done => Some(PendingMiner::Launch),
            JobPhase::Failed | JobPhase::Cancelled => Some(PendingMiner::Discard),
            _ => None,
        },
        _ => None,
    }
}

/// Pool mining opens once the coin's node is installed. A parked launch or a
/// running miner install blocks a second request.
pub(super) fn miner_enabled(controls: &ControlState, target: MinerTarget, parked: bool) -> bool {
    !parked && controls.controls(target.package()).run && controls.controls(PackageId::CpuMiner).install
}

/// Build the node launch, writing the variant's config first if it is missing.
///
/// Returns the request and whether a config file was created.
pub(super) fn node_launch_request(
    layout: &InstallLayout,
    executable: PathBuf,
    package: PackageId,
    variant: Variant,
) -> InstallResult<(LaunchRequest, bool)> {
    if !executable.exists() {
        return Err(InstallError::NotFound(executable));
    }
    let mut args: Vec<String> = package.spec().run_args.iter().map(|a| a.to_string()).collect();
    let created = match RuntimeConfig::for_package(layout, package, variant) {
        Some(config) => {
            let created = config.materialize()?;
            args.extend(config.node_args());
            created
        }
        None => false,
    };
    Ok((LaunchRequest::new(executable, args), created))
}

impl WizardApp {
    pub(super) fn log(&mut self, level: LogLevel, text: impl Into<String>) {
        let text = text.into();
        crate::debug::log(&format!("[{:?}] {}", level, text));
        self.push_line(level, text);
    }

    fn push_line(&mut self, level: LogLevel, text: String) {
        self.log_lines.push(LogLine { level, text });
        if self.log_lines.len() > MAX_LOG_LINES {
            let excess = self.log_lines.len() - MAX_LOG_LINES;
            self.log_lines.drain(..excess);
        }
    }

    /// Apply every queued background message, in arrival order.
    pub(super) fn drain_messages(&mut self) {
        while let Ok(message) = self.events_rx.try_recv() {
            self.controls = reduce(self.controls.clone(), &message);

            match pending_miner_action(&message) {
                Some(PendingMiner::Launch) => {
                    if let Some(request) = self.pending_miner.take() {
                        self.launch(&request, "pool miner");
                    }
                }
                Some(PendingMiner::Discard) => {
                    if self.pending_miner.take().is_some() {
                        self.log(LogLevel::Warning, "Miner launch dropped: CPU miner was not installed");
                    }
                }
                None => {}
            }

            // job text was already written to the debug log by the worker
            if let UiMessage::Log { level, text } = message {
                self.push_line(level, text);
            }
        }
    }

    /// Install button. Asks first when something is already installed there.
    pub(super) fn request_install(&mut self, package: PackageId) {
        if !self.controls.controls(package).install {
            return;
        }
        if self.installer.layout().install_root(package).exists() {
            self.dialog = Some(Dialog::ConfirmReinstall(package));
        } else {
            self.begin_install(package);
        }
    }

    /// Returns false when no job is running for `package` afterwards.
    pub(super) fn begin_install(&mut self, package: PackageId) -> bool {
        match self.installer.install(package) {
            Ok(ticket) if ticket.attached => {
                let notice = InstallError::AlreadyInProgress(package.display_name().to_string());
                self.log(LogLevel::Warning, notice.to_string());
                true
            }
            Ok(_) => true,
            Err(e) => {
                self.log(LogLevel::Error, format!("{}: {}", package.display_name(), e));
                false
            }
        }
    }

    pub(super) fn cancel(&mut self, package: PackageId) {
        if self.installer.cancel(package) {
            self.log(
                LogLevel::Warning,
                format!("Cancelling {} installation...", package.display_name()),
            );
        }
    }

    pub(super) fn run_node(&mut self, package: PackageId, variant: Variant) {
        let what = match package {
            PackageId::Bitcoin => format!("{} ({})", package.display_name(), variant.label()),
            _ => package.display_name().to_string(),
        };

        let request = self
            .installer
            .executable(package)
            .and_then(|exe| node_launch_request(self.installer.layout(), exe, package, variant));

        match request {
            Ok((request, created)) => {
                if created {
                    self.log(LogLevel::Info, format!("Created default config for {}", what));
                }
                self.launch(&request, &what);
            }
            Err(e) => self.log(LogLevel::Error, format!("{}: {}", what, e)),
        }
    }

    fn miner_request(&self, target: MinerTarget) -> InstallResult<LaunchRequest> {
        let address = self.address_input.as_str();
        let worker = self.worker_input.as_str();
        match target {
            MinerTarget::Bitcoin => {
                let pool = pool_by_name(&self.prefs.bitcoin_pool);
                match self.prefs.miner_type {
                    MinerDevice::Cpu => {
                        let cpuminer = self.installer.executable(PackageId::CpuMiner)?;
                        bitcoin_cpu_request(&cpuminer, pool.url, address, worker)
                    }
                    MinerDevice::StickMiner => {
                        stick_miner_request(&self.installer.layout().stick_miner(), pool.url, address)
                    }
                }
            }
            MinerTarget::Whive => {
                let cpuminer = self.installer.executable(PackageId::CpuMiner)?;
                whive_miner_request(&cpuminer, address, worker)
            }
        }
    }

    /// Miner setup "Continue". Returns false when the input was rejected and
    /// the dialog should stay open.
    pub(super) fn start_miner(&mut self, target: MinerTarget) -> bool {
        let what = format!("{} pool miner", target.label());
        let request = match self.miner_request(target) {
            Ok(request) => request,
            Err(e @ InstallError::InvalidInput(_)) => {
                self.log(LogLevel::Error, format!("{}: {}", what, e));
                return false;
            }
            Err(e) => {
                self.log(LogLevel::Error, format!("{}: {}", what, e));
                return true;
            }
        };
        self.prefs.worker_name = self.worker_input.trim().to_string();

        if request.executable.exists() {
            self.launch(&request, &what);
            return true;
        }

        let stick_miner = target == MinerTarget::Bitcoin && self.prefs.miner_type == MinerDevice::StickMiner;
        if stick_miner {
            self.log(
                LogLevel::Error,
                format!(
                    "{}: {}. Build cgminer with USB stick support into {:?} and try again.",
                    what,
                    InstallError::NotFound(request.executable.clone()),
                    self.installer.layout().home().join("cgminer"),
                ),
            );
            return true;
        }

        self.log(LogLevel::Info, "CPU miner is not installed yet; installing it first");
        self.pending_miner = Some(request);
        if !self.begin_install(PackageId::CpuMiner) {
            self.pending_miner = None;
        }
        true
    }

    fn launch(&mut self, request: &LaunchRequest, what: &str) {
        match self.launcher.launch(request) {
            Ok(()) => self.log(LogLevel::Success, format!("Started {}", what)),
            Err(e) => self.log(LogLevel::Error, format!("{}: {}", what, e)),
        }
    }

    pub(super) fn copy_debug_log(&mut self) {
        match crate::debug::read_log() {
            Ok(contents) => {
                match arboard::Clipboard::new().and_then(|mut clipboard| clipboard.set_text(contents)) {
                    Ok(_) => self.log(LogLevel::Info, "Debug log copied to clipboard"),
                    Err(e) => self.log(LogLevel::Error, format!("Failed to copy to clipboard: {}", e)),
                }
            }
            Err(e) => self.log(LogLevel::Error, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn phase(package: PackageId, phase: JobPhase) -> UiMessage {
        UiMessage::Phase {
            package,
            phase,
            variant: None,
        }
    }

    #[test]
    fn test_pending_miner_follows_cpuminer_outcome() {
        assert_eq!(
            pending_miner_action(&phase(PackageId::CpuMiner, JobPhase::Done)),
            Some(PendingMiner::Launch)
        );
        assert_eq!(
            pending_miner_action(&phase(PackageId::CpuMiner, JobPhase::Failed)),
            Some(PendingMiner::Discard)
        );
        assert_eq!(
            pending_miner_action(&phase(PackageId::CpuMiner, JobPhase::Cancelled)),
            Some(PendingMiner::Discard)
        );
        assert_eq!(pending_miner_action(&phase(PackageId::CpuMiner, JobPhase::Downloading)), None);
        // other packages finishing never release the parked request
        assert_eq!(pending_miner_action(&phase(PackageId::Whive, JobPhase::Done)), None);
        assert_eq!(
            pending_miner_action(&UiMessage::log(LogLevel::Info, "CPU miner: done")),
            None
        );
    }

    #[test]
    fn test_miner_waits_for_its_node() {
        let mut state = ControlState::new(|_| false);
        assert!(!miner_enabled(&state, MinerTarget::Bitcoin, false));
        assert!(!miner_enabled(&state, MinerTarget::Whive, false));

        state = reduce(state, &phase(PackageId::Whive, JobPhase::Done));
        assert!(miner_enabled(&state, MinerTarget::Whive, false));
        assert!(!miner_enabled(&state, MinerTarget::Bitcoin, false));
        assert!(!miner_enabled(&state, MinerTarget::Whive, true));

        // installing the miner itself locks both buttons
        state = reduce(state, &phase(PackageId::CpuMiner, JobPhase::Downloading));
        assert!(!miner_enabled(&state, MinerTarget::Whive, false));
    }

    #[test]
    fn test_node_request_writes_config_once() {
        let home = tempfile::tempdir().unwrap();
        let layout = InstallLayout::new(home.path());
        let exe = home.path().join("bitcoin-qt");
        std::fs::write(&exe, b"").unwrap();

        let (request, created) =
            node_launch_request(&layout, exe.clone(), PackageId::Bitcoin, Variant::Pruned).unwrap();
        assert!(created);
        assert_eq!(request.executable, exe);
        assert!(!request.options.open_in_terminal);
        assert_eq!(request.args.len(), 2);
        assert!(home.path().join(".bitcoin/pruned/bitcoin.conf").exists());

        let (_, created) = node_launch_request(&layout, exe, PackageId::Bitcoin, Variant::Pruned).unwrap();
        assert!(!created);
    }

    #[test]
    fn test_lnd_request_uses_neutrino_args() {
        let home = tempfile::tempdir().unwrap();
        let layout = InstallLayout::new(home.path());
        let exe = home.path().join("lnd");
        std::fs::write(&exe, b"").unwrap();

        let (request, created) = node_launch_request(&layout, exe, PackageId::Lnd, Variant::Mainnet).unwrap();
        assert!(!created);
        assert_eq!(request.args.len(), PackageId::Lnd.spec().run_args.len());
        assert_eq!(request.args[0], "--bitcoin.active");
        assert!(request.args.contains(&"--bitcoin.node=neutrino".to_string()));
    }

    #[test]
    fn test_node_request_missing_executable_has_no_side_effects() {
        let home = tempfile::tempdir().unwrap();
        let layout = InstallLayout::new(home.path());
        let exe = home.path().join("whive-core/whive/bin/whive-qt");

        let err = node_launch_request(&layout, exe.clone(), PackageId::Whive, Variant::Mainnet).unwrap_err();
        assert!(matches!(err, InstallError::NotFound(ref p) if p == &exe));
        assert!(!Path::new(&home.path().join(".whive")).exists());
    }
}
