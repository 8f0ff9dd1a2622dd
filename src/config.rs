// ============================================================================
// WIZARD CONFIGURATION
// ============================================================================
// Compile-time settings for the Melanin Click wizard.
//
// The package catalog (download URLs, storage thresholds, executables) lives
// in src/package.rs. Operator choices that survive restarts live in
// src/preferences.rs.
// ============================================================================

use eframe::egui;
use std::time::Duration;

// ----------------------------------------------------------------------------
// BRANDING
// ----------------------------------------------------------------------------

pub const APP_NAME: &str = "Melanin Click";

/// Window title (displayed in title bar)
pub const WINDOW_TITLE: &str = "Melanin Click";

/// User-Agent string for archive downloads
pub const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Directory name under the OS config dir holding preferences
pub const PREFERENCES_DIR: &str = "melaninclick";

// ----------------------------------------------------------------------------
// WINDOW SETTINGS
// ----------------------------------------------------------------------------

/// Default window size (width, height)
pub const WINDOW_SIZE: (f32, f32) = (760.0, 560.0);

/// Minimum window size (width, height)
pub const WINDOW_MIN_SIZE: (f32, f32) = (640.0, 480.0);

// ----------------------------------------------------------------------------
// BACKGROUND WORK
// ----------------------------------------------------------------------------

/// Capacity of the worker -> UI message channel
pub const MESSAGE_CHANNEL_CAPACITY: usize = 256;

/// How often the UI drains messages while idle
pub const UI_DRAIN_INTERVAL: Duration = Duration::from_millis(100);

/// How long exit waits for cancelled installs to clean up
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Connect timeout and download inactivity timeout, in seconds
pub const DEFAULT_NETWORK_TIMEOUT_SECS: u64 = 30;

/// Bytes between two download progress messages
pub const PROGRESS_STEP_BYTES: u64 = 256 * 1024;

// ----------------------------------------------------------------------------
// MINING
// ----------------------------------------------------------------------------

pub struct PoolOption {
    pub name: &'static str,
    pub url: &'static str,
}

pub const BITCOIN_POOLS: &[PoolOption] = &[
    PoolOption {
        name: "CKPool",
        url: "stratum+tcp://solo.ckpool.org:3333",
    },
    PoolOption {
        name: "Public Pool",
        url: "stratum+tcp://public-pool.io:21496",
    },
    PoolOption {
        name: "Ocean Pool",
        url: "stratum+tcp://stratum.ocean.xyz:3000",
    },
    PoolOption {
        name: "Ocean Pool (Alt)",
        url: "stratum+tcp://mine.ocean.xyz:3334",
    },
    PoolOption {
        name: "Kano Pool",
        url: "stratum+tcp://stratum.kano.is:3333",
    },
];

/// Index of the default pool selection
pub const DEFAULT_POOL_INDEX: usize = 1;

/// Whive has a single yespower pool
pub const WHIVE_POOL_URL: &str = "stratum+tcp://206.189.2.17:3333";

/// Threads handed to the Whive CPU miner
pub const WHIVE_MINER_THREADS: u32 = 2;

/// Fixed difficulty suggested to USB stick miners
pub const STICK_MINER_SUGGESTED_DIFF: u32 = 442;

pub const DEFAULT_WORKER_NAME: &str = "melaninclick";

/// Look a pool up by display name, falling back to the default pool.
pub fn pool_by_name(name: &str) -> &'static PoolOption {
    BITCOIN_POOLS
        .iter()
        .find(|p| p.name == name)
        .unwrap_or(&BITCOIN_POOLS[DEFAULT_POOL_INDEX])
}

// ============================================================================
// THEME SETUP (internal use)
// ============================================================================

pub fn setup_theme(ctx: &egui::Context) {
    use egui_thematic::ThemeConfig;

    let theme = ThemeConfig::gruvbox_dark_preset();
    ctx.set_visuals(theme.to_visuals());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_lookup_falls_back_to_default() {
        assert_eq!(pool_by_name("Kano Pool").url, "stratum+tcp://stratum.kano.is:3333");
        assert_eq!(pool_by_name("nope").name, "Public Pool");
        assert!(DEFAULT_POOL_INDEX < BITCOIN_POOLS.len());
    }
}
