// Copyright (C) 2026 Melanin Click Team
// Licensed under GPL-3.0-or-later

// Free-space queries and the storage tier policy applied before a download.

use crate::error::{InstallError, InstallResult};
use crate::package::{StoragePolicy, Variant};
use std::path::Path;

const BYTES_PER_GB: f64 = 1_000_000_000.0;

/// Something that can tell how much room is left on a volume.
pub trait FreeSpace: Send + Sync {
    /// Free space, in decimal gigabytes, on the filesystem holding `mount_point`.
    fn free_space_gb(&self, mount_point: &Path) -> InstallResult<f64>;
}

/// Free space as reported by the operating system (statvfs / GetDiskFreeSpaceExW).
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemStorage;

impl FreeSpace for SystemStorage {
    fn free_space_gb(&self, mount_point: &Path) -> InstallResult<f64> {
        available_bytes(mount_point).map(|bytes| bytes as f64 / BYTES_PER_GB)
    }
}

fn available_bytes(path: &Path) -> InstallResult<u64> {
    #[cfg(target_os = "windows")]
    {
        use std::os::windows::ffi::OsStrExt;
        use windows::Win32::Storage::FileSystem::GetDiskFreeSpaceExW;

        let path_wide: Vec<u16> = path.as_os_str().encode_wide().chain(Some(0)).collect();

        let mut free_bytes = 0u64;
        unsafe {
            GetDiskFreeSpaceExW(
                windows::core::PCWSTR(path_wide.as_ptr()),
                None,
                None,
                Some(&mut free_bytes),
            )
        }
        .map_err(|e| InstallError::Filesystem(format!("Cannot query free space on {}: {}", path.display(), e)))?;
        Ok(free_bytes)
    }

    #[cfg(unix)]
    {
        use std::os::unix::ffi::OsStrExt;
        let path_cstr = std::ffi::CString::new(path.as_os_str().as_bytes()).map_err(|_| {
            InstallError::Filesystem(format!("Path contains a NUL byte: {}", path.display()))
        })?;
        let mut stat: libc::statvfs = unsafe { std::mem::zeroed() };

        if unsafe { libc::statvfs(path_cstr.as_ptr(), &mut stat) } != 0 {
            return Err(InstallError::filesystem(
                format!("Cannot query free space on {}", path.display()),
                std::io::Error::last_os_error(),
            ));
        }
        // Both fields are u32 on some targets (macOS, ARM32)
        Ok((stat.f_bavail as u64) * (stat.f_frsize as u64))
    }

    #[cfg(not(any(unix, target_os = "windows")))]
    {
        Err(InstallError::Filesystem(format!(
            "Free space cannot be queried on this platform ({})",
            path.display()
        )))
    }
}

/// Pick the variant to install for `free_gb` of free space.
///
/// Above `full_gb` the full variant is used. Between the two thresholds the
/// constrained variant is used when the package has one. At or below
/// `minimum_gb` nothing is installed.
pub fn select_variant(free_gb: f64, policy: &StoragePolicy) -> InstallResult<Variant> {
    if free_gb > policy.full_gb {
        return Ok(Variant::Mainnet);
    }
    if free_gb > policy.minimum_gb {
        if let Some(variant) = policy.constrained {
            return Ok(variant);
        }
        return Err(InstallError::InsufficientStorage {
            available_gb: free_gb,
            required_gb: policy.full_gb,
        });
    }
    Err(InstallError::InsufficientStorage {
        available_gb: free_gb,
        required_gb: policy.minimum_gb,
    })
}
