// Copyright (C) 2026 Melanin Click Team
// Licensed under GPL-3.0-or-later

//! Error taxonomy for provisioning and launching packages.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for install/launch operations.
pub type InstallResult<T> = Result<T, InstallError>;

/// Everything that can stop an install job or a launch request.
///
/// `Cancelled` is not a failure: the orchestrator reports it as its own
/// terminal phase so the UI can stay calm about it.
#[derive(Debug, Error)]
pub enum InstallError {
    /// Free space is at or below what the package needs.
    #[error("insufficient space: {available_gb:.2} GB available, more than {required_gb:.0} GB required")]
    InsufficientStorage { available_gb: f64, required_gb: f64 },

    /// Connection, HTTP status or timeout problem.
    #[error("network error: {0}")]
    Network(String),

    /// Local read/write failure (including a full disk mid-download).
    #[error("filesystem error: {0}")]
    Filesystem(String),

    /// Archive could not be read or contains an unsafe entry.
    #[error("corrupt archive: {0}")]
    CorruptArchive(String),

    #[error("cancelled")]
    Cancelled,

    /// Executable missing on disk.
    #[error("{} not found", .0.display())]
    NotFound(PathBuf),

    /// Operator input rejected before any side effect.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("{0} installation is already in progress")]
    AlreadyInProgress(String),

    /// No download exists for the detected platform.
    #[error("{0} is not available for this platform")]
    Unsupported(String),

    /// The OS refused to create the process.
    #[error("failed to start process: {0}")]
    Spawn(String),
}

impl InstallError {
    /// Wrap an I/O error with what we were doing at the time.
    pub fn filesystem(context: impl std::fmt::Display, err: std::io::Error) -> Self {
        InstallError::Filesystem(format!("{}: {}", context, err))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, InstallError::Cancelled)
    }
}
