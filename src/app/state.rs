// Copyright (C) 2026 Melanin Click Team
// Licensed under GPL-3.0-or-later

use crate::config::{setup_theme, MESSAGE_CHANNEL_CAPACITY, SHUTDOWN_GRACE};
use crate::controls::{ControlState, LogLevel, UiMessage};
use crate::fetch::HttpFetcher;
use crate::installer::Installer;
use crate::launcher::{LaunchRequest, ProcessLauncher};
use crate::package::{InstallLayout, PackageId, Platform};
use crate::preferences::Preferences;
use crate::storage::SystemStorage;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Runtime;
use tokio::sync::mpsc;

/// Lines kept in the on-screen output log.
pub(super) const MAX_LOG_LINES: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Welcome,
    Dashboard,
}

/// Which coin a pool miner is being set up for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MinerTarget {
    Bitcoin,
    Whive,
}

impl MinerTarget {
    pub fn label(self) -> &'static str {
        match self {
            MinerTarget::Bitcoin => "Bitcoin",
            MinerTarget::Whive => "Whive",
        }
    }

    /// Node the miner belongs to.
    pub fn package(self) -> PackageId {
        match self {
            MinerTarget::Bitcoin => PackageId::Bitcoin,
            MinerTarget::Whive => PackageId::Whive,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialog {
    /// Install root already exists; ask before overwriting.
    ConfirmReinstall(PackageId),
    /// Hardware warning plus address/worker entry.
    MinerSetup(MinerTarget),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogLine {
    pub level: LogLevel,
    pub text: String,
}

pub struct WizardApp {
    // Keeps the worker threads alive for the installer's handle
    pub(super) _runtime: Runtime,

    pub(super) installer: Installer,
    pub(super) launcher: ProcessLauncher,
    pub(super) events_rx: mpsc::Receiver<UiMessage>,

    // Rendered state
    pub(super) screen: Screen,
    pub(super) dialog: Option<Dialog>,
    pub(super) controls: ControlState,
    pub(super) log_lines: Vec<LogLine>,
    pub(super) show_log: bool,

    // Operator input
    pub(super) prefs: Preferences,
    pub(super) prefs_path: Option<PathBuf>,
    pub(super) address_input: String,
    pub(super) worker_input: String,

    // Miner launch waiting on the CPU miner install
    pub(super) pending_miner: Option<LaunchRequest>,
}

impl WizardApp {
    pub fn new(cc: &eframe::CreationContext<'_>) -> Result<Self, String> {
        setup_theme(&cc.egui_ctx);

        let prefs_path = Preferences::default_path();
        let prefs = prefs_path
            .as_deref()
            .map(Preferences::load_or_default)
            .unwrap_or_default();

        let runtime = Runtime::new().map_err(|e| format!("Failed to start async runtime: {}", e))?;
        let layout = InstallLayout::from_home_dir()
            .ok_or_else(|| "Could not determine the home directory".to_string())?;
        let fetcher = HttpFetcher::new(prefs.network_timeout()).map_err(|e| e.to_string())?;
        let platform = Platform::detect();
        let (events_tx, events_rx) = mpsc::channel(MESSAGE_CHANNEL_CAPACITY);

        crate::debug::log_section("Startup");
        crate::debug::log(&format!("Platform: {:?}", platform));
        crate::debug::log(&format!("Home: {:?}", layout.home()));

        let installer = Installer::new(
            runtime.handle().clone(),
            Arc::new(fetcher),
            Arc::new(SystemStorage),
            layout,
            platform,
            events_tx,
        );
        let controls = ControlState::new(|package| installer.installed(package));
        let worker_input = prefs.worker_name.clone();

        Ok(Self {
            _runtime: runtime,
            installer,
            launcher: ProcessLauncher::detect(),
            events_rx,
            screen: Screen::Welcome,
            dialog: None,
            controls,
            log_lines: Vec::new(),
            show_log: false,
            prefs,
            prefs_path,
            address_input: String::new(),
            worker_input,
            pending_miner: None,
        })
    }
}

impl Drop for WizardApp {
    fn drop(&mut self) {
        // nobody drains after this; sends fail instead of blocking the jobs
        self.events_rx.close();
        for (package, phase) in self.installer.shutdown(SHUTDOWN_GRACE) {
            crate::debug::log(&format!("Exiting: {} install ended {:?}", package.name(), phase));
        }
        if let Some(path) = &self.prefs_path {
            if let Err(e) = self.prefs.save(path) {
                crate::debug::log(&format!("WARNING: {}", e));
            }
        }
    }
}
