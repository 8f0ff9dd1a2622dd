// Copyright (C) 2026 Melanin Click Team
// Licensed under GPL-3.0-or-later

//! Messages flowing from install jobs to the UI, and the reducer that turns
//! them into button availability.
//!
//! The UI never decides on its own whether a control is enabled; it folds
//! every [`UiMessage`] into a [`ControlState`] and renders from that.

use crate::package::{PackageId, Variant};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobPhase {
    Idle,
    CheckingStorage,
    Downloading,
    Extracting,
    Configuring,
    Done,
    Failed,
    Cancelled,
}

impl JobPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobPhase::Done | JobPhase::Failed | JobPhase::Cancelled)
    }

    /// A job is running in this phase.
    pub fn is_busy(self) -> bool {
        !self.is_terminal() && self != JobPhase::Idle
    }

    /// Cancellation is honoured until extraction starts.
    pub fn is_cancellable(self) -> bool {
        matches!(self, JobPhase::CheckingStorage | JobPhase::Downloading)
    }

    pub fn label(self) -> &'static str {
        match self {
            JobPhase::Idle => "Idle",
            JobPhase::CheckingStorage => "Checking storage",
            JobPhase::Downloading => "Downloading",
            JobPhase::Extracting => "Extracting",
            JobPhase::Configuring => "Configuring",
            JobPhase::Done => "Done",
            JobPhase::Failed => "Failed",
            JobPhase::Cancelled => "Cancelled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UiMessage {
    Log {
        level: LogLevel,
        text: String,
    },
    Phase {
        package: PackageId,
        phase: JobPhase,
        variant: Option<Variant>,
    },
    Progress {
        package: PackageId,
        downloaded: u64,
        total: Option<u64>,
    },
}

impl UiMessage {
    pub fn log(level: LogLevel, text: impl Into<String>) -> Self {
        UiMessage::Log {
            level,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PackageControls {
    pub install: bool,
    pub cancel: bool,
    pub run: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PackageState {
    pub phase: JobPhase,
    pub installed: bool,
    pub variant: Option<Variant>,
    pub downloaded: u64,
    pub total: Option<u64>,
}

impl PackageState {
    fn new(installed: bool) -> Self {
        Self {
            phase: JobPhase::Idle,
            installed,
            variant: None,
            downloaded: 0,
            total: None,
        }
    }

    pub fn controls(&self) -> PackageControls {
        let busy = self.phase.is_busy();
        PackageControls {
            install: !busy,
            cancel: self.phase.is_cancellable(),
            run: self.installed && !busy,
        }
    }

    /// Download fraction, if the server told us the size.
    pub fn fraction(&self) -> Option<f32> {
        match self.total {
            Some(total) if total > 0 => Some((self.downloaded as f64 / total as f64).min(1.0) as f32),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ControlState {
    packages: BTreeMap<PackageId, PackageState>,
}

impl ControlState {
    /// Start with every package idle; `installed` reports what is on disk.
    pub fn new(installed: impl Fn(PackageId) -> bool) -> Self {
        let packages = PackageId::ALL
            .iter()
            .map(|id| (*id, PackageState::new(installed(*id))))
            .collect();
        Self { packages }
    }

    pub fn package(&self, package: PackageId) -> &PackageState {
        // every id is inserted in new()
        &self.packages[&package]
    }

    pub fn controls(&self, package: PackageId) -> PackageControls {
        self.package(package).controls()
    }

    pub fn any_busy(&self) -> bool {
        self.packages.values().any(|p| p.phase.is_busy())
    }
}

/// Fold one message into the control state.
pub fn reduce(mut state: ControlState, message: &UiMessage) -> ControlState {
    match message {
        UiMessage::Log { .. } => {}
        UiMessage::Phase {
            package,
            phase,
            variant,
        } => {
            if let Some(entry) = state.packages.get_mut(package) {
                entry.phase = *phase;
                if variant.is_some() {
                    entry.variant = *variant;
                }
                match phase {
                    JobPhase::CheckingStorage => {
                        entry.downloaded = 0;
                        entry.total = None;
                    }
                    JobPhase::Done => entry.installed = true,
                    _ => {}
                }
            }
        }
        UiMessage::Progress {
            package,
            downloaded,
            total,
        } => {
            if let Some(entry) = state.packages.get_mut(package) {
                entry.downloaded = *downloaded;
                entry.total = *total;
            }
        }
    }
    state
}
