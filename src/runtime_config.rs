// Copyright (C) 2026 Melanin Click Team
// Licensed under GPL-3.0-or-later

// Minimal key=value config files the nodes read at startup.

use crate::error::{InstallError, InstallResult};
use crate::package::{InstallLayout, PackageId, Variant};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

const MAINNET: &[(&str, &str)] = &[("daemon", "1"), ("txindex", "1")];

// txindex cannot be combined with pruning
const PRUNED: &[(&str, &str)] = &[("prune", "550"), ("daemon", "1")];

const WHIVE: &[(&str, &str)] = &[("daemon", "1"), ("txindex", "1")];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    package: PackageId,
    variant: Variant,
    path: PathBuf,
    entries: &'static [(&'static str, &'static str)],
}

impl RuntimeConfig {
    /// Config for a package variant, or `None` for packages that run without one.
    pub fn for_package(layout: &InstallLayout, package: PackageId, variant: Variant) -> Option<Self> {
        let dir = layout.config_dir(package, variant)?;
        let (file, entries) = match (package, variant) {
            (PackageId::Bitcoin, Variant::Mainnet) => ("bitcoin.conf", MAINNET),
            (PackageId::Bitcoin, Variant::Pruned) => ("bitcoin.conf", PRUNED),
            (PackageId::Whive, _) => ("whive.conf", WHIVE),
            (PackageId::Lnd, _) | (PackageId::CpuMiner, _) => return None,
        };
        Some(Self {
            package,
            variant,
            path: dir.join(file),
            entries,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Data directory the config lives in.
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or(&self.path)
    }

    /// Command-line arguments that point the node at this config.
    pub fn node_args(&self) -> Vec<String> {
        match (self.package, self.variant) {
            (PackageId::Bitcoin, Variant::Mainnet) => {
                vec![format!("-conf={}", self.path.display())]
            }
            (PackageId::Bitcoin, Variant::Pruned) => vec![
                format!("-datadir={}", self.dir().display()),
                format!("-conf={}", self.path.display()),
            ],
            // whive-qt finds ~/.whive/whive.conf on its own
            _ => Vec::new(),
        }
    }

    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|(key, value)| format!("{}={}\n", key, value))
            .collect()
    }

    /// Write the file unless one already exists.
    ///
    /// Returns `true` when a new file was created. An existing file is never
    /// opened for writing, so operator edits survive reinstalls.
    pub fn materialize(&self) -> InstallResult<bool> {
        std::fs::create_dir_all(self.dir())
            .map_err(|e| InstallError::filesystem(format!("Failed to create {:?}", self.dir()), e))?;

        let mut file = match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                crate::debug::log(&format!("Config {:?} already present, leaving it alone", self.path));
                return Ok(false);
            }
            Err(e) => {
                return Err(InstallError::filesystem(format!("Failed to create {:?}", self.path), e))
            }
        };

        file.write_all(self.render().as_bytes())
            .map_err(|e| InstallError::filesystem(format!("Failed to write {:?}", self.path), e))?;

        crate::debug::log(&format!("Wrote config {:?}", self.path));
        Ok(true)
    }
}
