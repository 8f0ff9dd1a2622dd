// Copyright (C) 2026 Melanin Click Team
// Licensed under GPL-3.0-or-later

//! Package catalog and on-disk layout.
//!
//! Each package has exactly one record here. Download URLs are not checked
//! ahead of time; a dead link surfaces as a network error during install.

use crate::extract::ArchiveFormat;
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PackageId {
    Bitcoin,
    Lnd,
    Whive,
    CpuMiner,
}

impl PackageId {
    pub const ALL: [PackageId; 4] = [
        PackageId::Bitcoin,
        PackageId::Lnd,
        PackageId::Whive,
        PackageId::CpuMiner,
    ];

    /// Short identity used for directory and archive names.
    pub fn name(self) -> &'static str {
        match self {
            PackageId::Bitcoin => "bitcoin",
            PackageId::Lnd => "lnd",
            PackageId::Whive => "whive",
            PackageId::CpuMiner => "cpuminer",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            PackageId::Bitcoin => "Bitcoin Core",
            PackageId::Lnd => "Lightning (LND)",
            PackageId::Whive => "Whive Core",
            PackageId::CpuMiner => "CPU miner",
        }
    }

    pub fn spec(self) -> &'static PackageSpec {
        match self {
            PackageId::Bitcoin => &BITCOIN,
            PackageId::Lnd => &LND,
            PackageId::Whive => &WHIVE,
            PackageId::CpuMiner => &CPU_MINER,
        }
    }
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Storage tier a package is installed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variant {
    Mainnet,
    Pruned,
}

impl Variant {
    pub fn name(self) -> &'static str {
        match self {
            Variant::Mainnet => "mainnet",
            Variant::Pruned => "pruned",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Variant::Mainnet => "full node",
            Variant::Pruned => "pruned node",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    LinuxX86_64,
    LinuxAarch64,
    MacX86_64,
    MacAarch64,
    WindowsX86_64,
    Other,
}

impl Platform {
    /// Detect the platform the wizard is running on.
    pub fn detect() -> Self {
        Self::from_parts(std::env::consts::OS, std::env::consts::ARCH)
    }

    pub fn from_parts(os: &str, arch: &str) -> Self {
        match (os, arch) {
            ("linux", "x86_64") => Platform::LinuxX86_64,
            ("linux", "aarch64") => Platform::LinuxAarch64,
            ("macos", "aarch64") => Platform::MacAarch64,
            ("macos", _) => Platform::MacX86_64,
            ("windows", "x86_64") => Platform::WindowsX86_64,
            _ => Platform::Other,
        }
    }
}

/// Free-space thresholds (decimal GB) that pick the variant at install time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StoragePolicy {
    /// Above this, install the full variant.
    pub full_gb: f64,
    /// At or below this, refuse to install.
    pub minimum_gb: f64,
    /// Variant used between `minimum_gb` and `full_gb`, if the package has one.
    pub constrained: Option<Variant>,
}

/// One downloadable archive and where its executable lands after extraction.
#[derive(Debug)]
pub struct Download {
    pub platforms: &'static [Platform],
    pub url: &'static str,
    pub format: ArchiveFormat,
    /// Relative to the install root.
    pub executable: &'static str,
}

#[derive(Debug)]
pub struct PackageSpec {
    pub id: PackageId,
    pub storage: StoragePolicy,
    pub downloads: &'static [Download],
    /// Arguments always passed when the package is run.
    pub run_args: &'static [&'static str],
}

impl PackageSpec {
    pub fn download_for(&self, platform: Platform) -> Option<&'static Download> {
        self.downloads.iter().find(|d| d.platforms.contains(&platform))
    }
}

// ----------------------------------------------------------------------------
// CATALOG
// ----------------------------------------------------------------------------

static BITCOIN: PackageSpec = PackageSpec {
    id: PackageId::Bitcoin,
    storage: StoragePolicy {
        full_gb: 600.0,
        minimum_gb: 10.0,
        constrained: Some(Variant::Pruned),
    },
    downloads: &[
        Download {
            platforms: &[Platform::LinuxX86_64],
            url: "https://bitcoincore.org/bin/bitcoin-core-22.0/bitcoin-22.0-x86_64-linux-gnu.tar.gz",
            format: ArchiveFormat::TarGz,
            executable: "bitcoin-22.0/bin/bitcoin-qt",
        },
        Download {
            platforms: &[Platform::LinuxAarch64],
            url: "https://bitcoincore.org/bin/bitcoin-core-22.0/bitcoin-22.0-aarch64-linux-gnu.tar.gz",
            format: ArchiveFormat::TarGz,
            executable: "bitcoin-22.0/bin/bitcoin-qt",
        },
        // Apple silicon runs the x86_64 build under Rosetta
        Download {
            platforms: &[Platform::MacX86_64, Platform::MacAarch64],
            url: "https://bitcoincore.org/bin/bitcoin-core-22.0/bitcoin-22.0-osx64.tar.gz",
            format: ArchiveFormat::TarGz,
            executable: "bitcoin-22.0/bin/bitcoin-qt",
        },
        Download {
            platforms: &[Platform::WindowsX86_64],
            url: "https://bitcoincore.org/bin/bitcoin-core-22.0/bitcoin-22.0-win64.zip",
            format: ArchiveFormat::Zip,
            executable: "bitcoin-22.0/bin/bitcoin-qt.exe",
        },
    ],
    run_args: &[],
};

// Light client: talks to public neutrino peers instead of a local bitcoind
const LND_NEUTRINO_ARGS: &[&str] = &[
    "--bitcoin.active",
    "--bitcoin.mainnet",
    "--bitcoin.node=neutrino",
    "--neutrino.addpeer=btcd-mainnet.lightning.computer",
    "--neutrino.addpeer=mainnet1-btcd.zaphq.io",
    "--neutrino.addpeer=mainnet2-btcd.zaphq.io",
    "--neutrino.addpeer=mainnet3-btcd.zaphq.io",
    "--neutrino.addpeer=mainnet4-btcd.zaphq.io",
    "--neutrino.feeurl=https://nodes.lightning.computer/fees/v1/btc-fee-estimates.json",
];

static LND: PackageSpec = PackageSpec {
    id: PackageId::Lnd,
    storage: StoragePolicy {
        full_gb: 1.0,
        minimum_gb: 1.0,
        constrained: None,
    },
    downloads: &[
        Download {
            platforms: &[Platform::LinuxX86_64],
            url: "https://github.com/lightningnetwork/lnd/releases/download/v0.17.0-beta.rc2/lnd-linux-amd64-v0.17.0-beta.rc2.tar.gz",
            format: ArchiveFormat::TarGz,
            executable: "lnd-linux-amd64-v0.17.0-beta.rc2/lnd",
        },
        Download {
            platforms: &[Platform::LinuxAarch64],
            url: "https://github.com/lightningnetwork/lnd/releases/download/v0.17.0-beta.rc2/lnd-linux-arm64-v0.17.0-beta.rc2.tar.gz",
            format: ArchiveFormat::TarGz,
            executable: "lnd-linux-arm64-v0.17.0-beta.rc2/lnd",
        },
        Download {
            platforms: &[Platform::MacX86_64],
            url: "https://github.com/lightningnetwork/lnd/releases/download/v0.17.0-beta.rc2/lnd-darwin-amd64-v0.17.0-beta.rc2.tar.gz",
            format: ArchiveFormat::TarGz,
            executable: "lnd-darwin-amd64-v0.17.0-beta.rc2/lnd",
        },
        Download {
            platforms: &[Platform::MacAarch64],
            url: "https://github.com/lightningnetwork/lnd/releases/download/v0.17.0-beta.rc2/lnd-darwin-arm64-v0.17.0-beta.rc2.tar.gz",
            format: ArchiveFormat::TarGz,
            executable: "lnd-darwin-arm64-v0.17.0-beta.rc2/lnd",
        },
        Download {
            platforms: &[Platform::WindowsX86_64],
            url: "https://github.com/lightningnetwork/lnd/releases/download/v0.17.0-beta.rc2/lnd-windows-amd64-v0.17.0-beta.rc2.zip",
            format: ArchiveFormat::Zip,
            executable: "lnd-windows-amd64-v0.17.0-beta.rc2/lnd.exe",
        },
    ],
    run_args: LND_NEUTRINO_ARGS,
};

static WHIVE: PackageSpec = PackageSpec {
    id: PackageId::Whive,
    storage: StoragePolicy {
        full_gb: 10.0,
        minimum_gb: 10.0,
        constrained: None,
    },
    downloads: &[
        Download {
            platforms: &[Platform::LinuxX86_64],
            url: "https://github.com/whiveio/whive/releases/download/22.2.2/whive-22.2.2-x86_64-linux-gnu.tar.gz",
            format: ArchiveFormat::TarGz,
            executable: "whive/bin/whive-qt",
        },
        Download {
            platforms: &[Platform::MacX86_64, Platform::MacAarch64],
            url: "https://github.com/whiveio/whive/releases/download/22.2.2/whive-22.2.2-osx64.tar.gz",
            format: ArchiveFormat::TarGz,
            executable: "whive/bin/whive-qt",
        },
        Download {
            platforms: &[Platform::WindowsX86_64],
            url: "https://github.com/whiveio/whive/releases/download/v2.22.1/whive-2.22.1-win64.zip",
            format: ArchiveFormat::Zip,
            executable: "whive/bin/whive-qt.exe",
        },
    ],
    run_args: &[],
};

static CPU_MINER: PackageSpec = PackageSpec {
    id: PackageId::CpuMiner,
    storage: StoragePolicy {
        full_gb: 1.0,
        minimum_gb: 1.0,
        constrained: None,
    },
    downloads: &[
        Download {
            platforms: &[Platform::LinuxX86_64],
            url: "https://github.com/rplant8/cpuminer-opt-rplant/releases/download/5.0.40/cpuminer-opt-linux-5.0.40.tar.gz",
            format: ArchiveFormat::TarGz,
            executable: "cpuminer",
        },
        Download {
            platforms: &[Platform::MacX86_64, Platform::MacAarch64],
            url: "https://github.com/rplant8/cpuminer-opt-rplant/releases/download/5.0.36/cpuminer-opt-mac.tar.gz",
            format: ArchiveFormat::TarGz,
            executable: "cpuminer-sse2",
        },
    ],
    run_args: &[],
};

// ----------------------------------------------------------------------------
// LAYOUT
// ----------------------------------------------------------------------------

/// Filesystem conventions, rooted at the operator's home directory.
///
/// Every package has one install root regardless of the variant chosen.
#[derive(Debug, Clone)]
pub struct InstallLayout {
    home: PathBuf,
}

impl InstallLayout {
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self { home: home.into() }
    }

    pub fn from_home_dir() -> Option<Self> {
        dirs::home_dir().map(Self::new)
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    /// `~/<pkg>-core`
    pub fn install_root(&self, package: PackageId) -> PathBuf {
        self.home.join(format!("{}-core", package.name()))
    }

    /// `~/<pkg>-core/<pkg>.<ext>`
    pub fn archive_path(&self, package: PackageId, format: ArchiveFormat) -> PathBuf {
        self.install_root(package)
            .join(format!("{}.{}", package.name(), format.extension()))
    }

    pub fn executable(&self, package: PackageId, download: &Download) -> PathBuf {
        self.install_root(package).join(download.executable)
    }

    /// Directory holding the runtime config for a package variant, if the
    /// package has one.
    pub fn config_dir(&self, package: PackageId, variant: Variant) -> Option<PathBuf> {
        match package {
            PackageId::Bitcoin => Some(self.home.join(".bitcoin").join(variant.name())),
            PackageId::Whive => Some(self.home.join(".whive")),
            PackageId::Lnd | PackageId::CpuMiner => None,
        }
    }

    /// Externally built cgminer used for USB stick miners.
    pub fn stick_miner(&self) -> PathBuf {
        self.home.join("cgminer").join("cgminer")
    }
}
