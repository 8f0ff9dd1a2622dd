// Copyright (C) 2026 Melanin Click Team
// Licensed under GPL-3.0-or-later

// Centralized debug logging for the Melanin Click wizard.
// Every install stage, launch command and error lands here; the GUI can show
// the file and copy it to the clipboard for support requests.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

const LOG_FILE_NAME: &str = "melaninclick_debug.txt";

lazy_static::lazy_static! {
    static ref DEBUG_LOG: Mutex<DebugLog> = Mutex::new(DebugLog::new());
}

pub struct DebugLog {
    path: PathBuf,
}

impl DebugLog {
    fn new() -> Self {
        let path = std::env::temp_dir().join(LOG_FILE_NAME);

        // Clear existing log and write header
        if let Ok(mut f) = std::fs::File::create(&path) {
            let _ = writeln!(f, "=== Melanin Click Debug Log ===");
            let _ = writeln!(f, "Log file: {:?}", path);
            let _ = writeln!(f, "Timestamp: {:?}", std::time::SystemTime::now());
            let _ = writeln!(f, "Platform: {}", std::env::consts::OS);
            let _ = writeln!(f, "Arch: {}", std::env::consts::ARCH);
            let _ = writeln!(f);
        }

        Self { path }
    }
}

/// Log a debug message
pub fn log(message: &str) {
    let debug_log = DEBUG_LOG.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Ok(mut f) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&debug_log.path)
    {
        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let _ = writeln!(f, "[{}] {}", timestamp, message);
    }
}

/// Log a section header
pub fn log_section(section: &str) {
    log(&format!("\n=== {} ===", section));
}

/// Get the path to the debug log file
pub fn get_log_path() -> PathBuf {
    DEBUG_LOG
        .lock()
        .map(|debug_log| debug_log.path.clone())
        .unwrap_or_else(|_| std::env::temp_dir().join(LOG_FILE_NAME))
}

/// Read the whole debug log (for the log panel and clipboard copy)
pub fn read_log() -> Result<String, String> {
    let log_path = get_log_path();
    std::fs::read_to_string(&log_path)
        .map_err(|e| format!("Failed to read log file {:?}: {}", log_path, e))
}
