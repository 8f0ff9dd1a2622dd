// Copyright (C) 2026 Melanin Click Team
// Licensed under GPL-3.0-or-later

// Input checks that gate miner launches. Nothing reaches the process
// launcher unless these pass.

use crate::error::{InstallError, InstallResult};
use regex::Regex;

lazy_static::lazy_static! {
    // P2PKH/P2SH: leading 1 or 3, 25-34 chars of base58
    static ref LEGACY: Regex = Regex::new(r"^[13][1-9A-HJ-NP-Za-km-z]{24,33}$").unwrap();
    // bech32 is single-case
    static ref BECH32_LOWER: Regex = Regex::new(r"^bc1[02-9ac-hj-np-z]{38,58}$").unwrap();
    static ref BECH32_UPPER: Regex = Regex::new(r"^BC1[02-9AC-HJ-NP-Z]{38,58}$").unwrap();
    // W (pubkey hash) or 7 (script hash), 26-35 chars of base58
    static ref WHIVE: Regex = Regex::new(r"^[W7][1-9A-HJ-NP-Za-km-z]{25,34}$").unwrap();
    static ref WORKER: Regex = Regex::new(r"^[A-Za-z0-9_.-]{1,64}$").unwrap();
}

/// Legacy (`1...`, `3...`) or bech32 (`bc1...`) mainnet address.
pub fn validate_bitcoin_address(address: &str) -> bool {
    LEGACY.is_match(address) || BECH32_LOWER.is_match(address) || BECH32_UPPER.is_match(address)
}

/// Whive mainnet address. The prefixes never collide with Bitcoin's.
pub fn validate_whive_address(address: &str) -> bool {
    WHIVE.is_match(address)
}

pub fn validate_worker_name(worker: &str) -> bool {
    WORKER.is_match(worker)
}

/// Trim and check a Bitcoin payout address.
pub fn require_bitcoin_address(address: &str) -> InstallResult<&str> {
    let address = address.trim();
    if address.is_empty() {
        return Err(InstallError::InvalidInput("Bitcoin address is required".into()));
    }
    if !validate_bitcoin_address(address) {
        return Err(InstallError::InvalidInput(format!(
            "\"{}\" is not a valid Bitcoin address",
            address
        )));
    }
    Ok(address)
}

pub fn require_whive_address(address: &str) -> InstallResult<&str> {
    let address = address.trim();
    if address.is_empty() {
        return Err(InstallError::InvalidInput("Whive address is required".into()));
    }
    if !validate_whive_address(address) {
        return Err(InstallError::InvalidInput(format!(
            "\"{}\" is not a valid Whive address",
            address
        )));
    }
    Ok(address)
}

pub fn require_worker_name(worker: &str) -> InstallResult<&str> {
    let worker = worker.trim();
    if !validate_worker_name(worker) {
        return Err(InstallError::InvalidInput(
            "Worker name must be 1-64 letters, digits, '.', '_' or '-'".into(),
        ));
    }
    Ok(worker)
}
