// Copyright (C) 2026 Melanin Click Team
// Licensed under GPL-3.0-or-later

// Launch requests for pool mining. Inputs are validated here, so a request
// that comes back Ok is safe to hand to the launcher.

use crate::config::{STICK_MINER_SUGGESTED_DIFF, WHIVE_MINER_THREADS, WHIVE_POOL_URL};
use crate::error::InstallResult;
use crate::launcher::LaunchRequest;
use crate::validate::{require_bitcoin_address, require_whive_address, require_worker_name};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MinerDevice {
    #[default]
    #[serde(rename = "CPU Mining")]
    Cpu,
    #[serde(rename = "StickMiner")]
    StickMiner,
}

impl MinerDevice {
    pub const ALL: [MinerDevice; 2] = [MinerDevice::Cpu, MinerDevice::StickMiner];

    pub fn label(self) -> &'static str {
        match self {
            MinerDevice::Cpu => "CPU Mining",
            MinerDevice::StickMiner => "StickMiner",
        }
    }
}

/// `cpuminer -a sha256d -o <pool> -u <address>.<worker> -p x`
pub fn bitcoin_cpu_request(
    cpuminer: &Path,
    pool_url: &str,
    address: &str,
    worker: &str,
) -> InstallResult<LaunchRequest> {
    let address = require_bitcoin_address(address)?;
    let worker = require_worker_name(worker)?;
    Ok(LaunchRequest::new(
        cpuminer,
        vec![
            "-a".into(),
            "sha256d".into(),
            "-o".into(),
            pool_url.into(),
            "-u".into(),
            format!("{}.{}", address, worker),
            "-p".into(),
            "x".into(),
        ],
    )
    .in_terminal())
}

/// USB stick miners go through cgminer, which needs root for device access.
pub fn stick_miner_request(cgminer: &Path, pool_url: &str, address: &str) -> InstallResult<LaunchRequest> {
    let address = require_bitcoin_address(address)?;
    Ok(LaunchRequest::new(
        cgminer,
        vec![
            "-o".into(),
            pool_url.into(),
            "-u".into(),
            address.into(),
            "-p".into(),
            "x".into(),
            "--suggest-diff".into(),
            STICK_MINER_SUGGESTED_DIFF.to_string(),
        ],
    )
    .elevated())
}

/// `cpuminer -a yespower -o <whive pool> -u <address>.<worker> -t 2`
pub fn whive_miner_request(cpuminer: &Path, address: &str, worker: &str) -> InstallResult<LaunchRequest> {
    let address = require_whive_address(address)?;
    let worker = require_worker_name(worker)?;
    Ok(LaunchRequest::new(
        cpuminer,
        vec![
            "-a".into(),
            "yespower".into(),
            "-o".into(),
            WHIVE_POOL_URL.into(),
            "-u".into(),
            format!("{}.{}", address, worker),
            "-t".into(),
            WHIVE_MINER_THREADS.to_string(),
        ],
    )
    .in_terminal())
}
