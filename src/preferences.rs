// Copyright (C) 2026 Melanin Click Team
// Licensed under GPL-3.0-or-later

use crate::config::{
    BITCOIN_POOLS, DEFAULT_NETWORK_TIMEOUT_SECS, DEFAULT_POOL_INDEX, DEFAULT_WORKER_NAME, PREFERENCES_DIR,
};
use crate::miner::MinerDevice;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const PREFERENCES_FILE: &str = "config.json";

/// Operator choices persisted between runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    /// Mining hardware for Bitcoin pool mining
    pub miner_type: MinerDevice,
    /// Display name of the selected Bitcoin pool
    pub bitcoin_pool: String,
    pub worker_name: String,
    /// Connect and inactivity timeout for downloads
    pub network_timeout_secs: u64,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            miner_type: MinerDevice::default(),
            bitcoin_pool: BITCOIN_POOLS[DEFAULT_POOL_INDEX].name.to_string(),
            worker_name: DEFAULT_WORKER_NAME.to_string(),
            network_timeout_secs: DEFAULT_NETWORK_TIMEOUT_SECS,
        }
    }
}

impl Preferences {
    /// `<config dir>/melaninclick/config.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(PREFERENCES_DIR).join(PREFERENCES_FILE))
    }

    /// Save preferences to disk
    pub fn save(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create preferences directory: {}", e))?;
        }

        let json = serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize preferences: {}", e))?;

        std::fs::write(path, json).map_err(|e| format!("Failed to write preferences: {}", e))?;

        crate::debug::log(&format!("Saved preferences to: {:?}", path));
        Ok(())
    }

    /// Load preferences from disk. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let json = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read preferences: {}", e))?;

        let prefs: Preferences = serde_json::from_str(&json)
            .map_err(|e| format!("Failed to parse preferences: {}", e))?;

        crate::debug::log(&format!("Loaded preferences from: {:?}", path));
        Ok(prefs)
    }

    /// Like [`Preferences::load`], but a broken file is logged and ignored.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_else(|e| {
            crate::debug::log(&format!("WARNING: {}; using defaults", e));
            Self::default()
        })
    }

    pub fn network_timeout(&self) -> Duration {
        Duration::from_secs(self.network_timeout_secs.max(1))
    }
}
