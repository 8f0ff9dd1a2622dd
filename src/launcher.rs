// Copyright (C) 2026 Melanin Click Team
// Licensed under GPL-3.0-or-later

//! Detached process launching.
//!
//! Launched nodes and miners are not supervised: they are spawned with null
//! stdio in their own process group and never waited on, so they keep running
//! after the wizard exits.
//!
//! Opening a command in a new terminal window goes through a
//! [`TerminalStrategy`]. The strategy is picked once at startup by looking
//! for the terminal launcher program on `PATH`, so the same code path runs on
//! every host.

use crate::error::{InstallError, InstallResult};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LaunchOptions {
    pub open_in_terminal: bool,
    /// Run through `sudo`. Needs a terminal for the password prompt.
    pub elevate: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRequest {
    pub executable: PathBuf,
    pub args: Vec<String>,
    pub options: LaunchOptions,
}

impl LaunchRequest {
    pub fn new(executable: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            executable: executable.into(),
            args,
            options: LaunchOptions::default(),
        }
    }

    pub fn in_terminal(mut self) -> Self {
        self.options.open_in_terminal = true;
        self
    }

    pub fn elevated(mut self) -> Self {
        self.options.elevate = true;
        self.options.open_in_terminal = true;
        self
    }
}

/// Program plus argument vector handed to the OS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
    /// Already-quoted text appended to the command line as is. Windows only
    /// honours this byte for byte; `args` go through the argv encoder.
    pub raw_tail: Option<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            raw_tail: None,
        }
    }
}

/// How a host opens a command line in a new terminal window.
pub trait TerminalStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Program whose presence on `PATH` means this strategy works here.
    fn launcher_program(&self) -> &'static str;

    fn supports_elevation(&self) -> bool;

    /// Quote one word of the command line for the terminal's shell.
    fn quote(&self, word: &str) -> String;

    /// Wrap a complete command line in the terminal invocation.
    fn wrap(&self, command_line: &str) -> CommandSpec;
}

// ----------------------------------------------------------------------------
// QUOTING
// ----------------------------------------------------------------------------

/// POSIX shell single-quoting.
pub fn posix_quote(word: &str) -> String {
    let safe = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_-./:=@%+,".contains(c));
    if safe {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}

/// Escape text for the inside of an AppleScript string literal.
pub fn applescript_escape(text: &str) -> String {
    text.replace('\\', r"\\").replace('"', "\\\"")
}

/// cmd.exe quoting: wrap in double quotes, double any embedded quote.
pub fn windows_quote(word: &str) -> String {
    let safe = !word.is_empty()
        && !word
            .chars()
            .any(|c| c.is_whitespace() || "\"&|<>^%()".contains(c));
    if safe {
        word.to_string()
    } else {
        format!("\"{}\"", word.replace('"', "\"\""))
    }
}

// ----------------------------------------------------------------------------
// STRATEGIES
// ----------------------------------------------------------------------------

/// macOS Terminal.app driven through osascript.
pub struct AppleTerminal;

impl TerminalStrategy for AppleTerminal {
    fn name(&self) -> &'static str {
        "Terminal.app"
    }

    fn launcher_program(&self) -> &'static str {
        "osascript"
    }

    fn supports_elevation(&self) -> bool {
        true
    }

    fn quote(&self, word: &str) -> String {
        posix_quote(word)
    }

    fn wrap(&self, command_line: &str) -> CommandSpec {
        CommandSpec::new(
            "osascript",
            vec![
                "-e".into(),
                format!(
                    "tell application \"Terminal\" to do script \"{}\"",
                    applescript_escape(command_line)
                ),
                "-e".into(),
                "tell application \"Terminal\" to activate".into(),
            ],
        )
    }
}

pub struct GnomeTerminal;

impl TerminalStrategy for GnomeTerminal {
    fn name(&self) -> &'static str {
        "GNOME Terminal"
    }

    fn launcher_program(&self) -> &'static str {
        "gnome-terminal"
    }

    fn supports_elevation(&self) -> bool {
        true
    }

    fn quote(&self, word: &str) -> String {
        posix_quote(word)
    }

    fn wrap(&self, command_line: &str) -> CommandSpec {
        CommandSpec::new(
            "gnome-terminal",
            vec![
                "--".into(),
                "bash".into(),
                "-c".into(),
                format!("{}; exec bash", command_line),
            ],
        )
    }
}

/// Debian alternatives entry pointing at whatever terminal is installed.
pub struct XTerminalEmulator;

impl TerminalStrategy for XTerminalEmulator {
    fn name(&self) -> &'static str {
        "x-terminal-emulator"
    }

    fn launcher_program(&self) -> &'static str {
        "x-terminal-emulator"
    }

    fn supports_elevation(&self) -> bool {
        true
    }

    fn quote(&self, word: &str) -> String {
        posix_quote(word)
    }

    fn wrap(&self, command_line: &str) -> CommandSpec {
        CommandSpec::new(
            "x-terminal-emulator",
            vec![
                "-e".into(),
                "bash".into(),
                "-c".into(),
                format!("{}; exec bash", command_line),
            ],
        )
    }
}

/// A new console window through `start`.
pub struct WindowsConsole;

impl TerminalStrategy for WindowsConsole {
    fn name(&self) -> &'static str {
        "Windows console"
    }

    fn launcher_program(&self) -> &'static str {
        "cmd"
    }

    fn supports_elevation(&self) -> bool {
        false
    }

    fn quote(&self, word: &str) -> String {
        windows_quote(word)
    }

    fn wrap(&self, command_line: &str) -> CommandSpec {
        // empty string is the window title for `start`
        let args = vec!["/C".into(), "start".into(), "".into(), "cmd".into(), "/K".into()];
        CommandSpec {
            raw_tail: Some(command_line.to_string()),
            ..CommandSpec::new("cmd", args)
        }
    }
}

/// Known strategies, most specific first.
pub fn terminal_strategies() -> Vec<Arc<dyn TerminalStrategy>> {
    vec![
        Arc::new(AppleTerminal),
        Arc::new(GnomeTerminal),
        Arc::new(XTerminalEmulator),
        Arc::new(WindowsConsole),
    ]
}

/// First strategy whose launcher program passes `available`.
pub fn select_terminal(
    candidates: Vec<Arc<dyn TerminalStrategy>>,
    available: impl Fn(&str) -> bool,
) -> Option<Arc<dyn TerminalStrategy>> {
    candidates.into_iter().find(|s| available(s.launcher_program()))
}

// ----------------------------------------------------------------------------
// LAUNCHER
// ----------------------------------------------------------------------------

#[derive(Clone)]
pub struct ProcessLauncher {
    terminal: Option<Arc<dyn TerminalStrategy>>,
}

impl ProcessLauncher {
    pub fn new(terminal: Option<Arc<dyn TerminalStrategy>>) -> Self {
        Self { terminal }
    }

    /// Search `PATH` for a usable terminal launcher.
    pub fn detect() -> Self {
        let terminal = select_terminal(terminal_strategies(), |program| which::which(program).is_ok());
        match &terminal {
            Some(t) => crate::debug::log(&format!("Terminal strategy: {}", t.name())),
            None => crate::debug::log("WARNING: no terminal launcher found on PATH"),
        }
        Self::new(terminal)
    }

    pub fn terminal_name(&self) -> Option<&'static str> {
        self.terminal.as_ref().map(|t| t.name())
    }

    /// Work out what would be spawned for `request`.
    pub fn command_for(&self, request: &LaunchRequest) -> InstallResult<CommandSpec> {
        if !request.executable.exists() {
            return Err(InstallError::NotFound(request.executable.clone()));
        }

        if !request.options.open_in_terminal && !request.options.elevate {
            return Ok(CommandSpec::new(request.executable.clone(), request.args.clone()));
        }

        let terminal = self.terminal.as_ref().ok_or_else(|| {
            InstallError::Unsupported("Opening a terminal window".to_string())
        })?;
        if request.options.elevate && !terminal.supports_elevation() {
            return Err(InstallError::Unsupported(format!(
                "Elevated launch through {}",
                terminal.name()
            )));
        }

        let mut words = Vec::with_capacity(request.args.len() + 2);
        if request.options.elevate {
            words.push("sudo".to_string());
        }
        words.push(terminal.quote(&request.executable.to_string_lossy()));
        words.extend(request.args.iter().map(|a| terminal.quote(a)));

        Ok(terminal.wrap(&words.join(" ")))
    }

    /// Spawn `request` detached and return without waiting.
    pub fn launch(&self, request: &LaunchRequest) -> InstallResult<()> {
        let spec = self.command_for(request)?;
        crate::debug::log(&format!(
            "Launching {:?} {:?} {}",
            spec.program,
            spec.args,
            spec.raw_tail.as_deref().unwrap_or("")
        ));

        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        if let Some(tail) = &spec.raw_tail {
            append_raw(&mut command, tail);
        }
        if let Some(dir) = request.executable.parent() {
            command.current_dir(dir);
        }
        detach(&mut command);

        // The child is intentionally dropped without wait()
        command
            .spawn()
            .map(|_child| ())
            .map_err(|e| InstallError::Spawn(format!("{}: {}", spec.program.display(), e)))
    }
}

#[cfg(windows)]
fn append_raw(command: &mut Command, tail: &str) {
    use std::os::windows::process::CommandExt;
    command.raw_arg(tail);
}

#[cfg(not(windows))]
fn append_raw(command: &mut Command, tail: &str) {
    command.arg(tail);
}

#[cfg(unix)]
fn detach(command: &mut Command) {
    use std::os::unix::process::CommandExt;
    command.process_group(0);
}

#[cfg(windows)]
fn detach(command: &mut Command) {
    use std::os::windows::process::CommandExt;
    const DETACHED_PROCESS: u32 = 0x0000_0008;
    const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
    command.creation_flags(DETACHED_PROCESS | CREATE_NEW_PROCESS_GROUP);
}

#[cfg(not(any(unix, windows)))]
fn detach(_command: &mut Command) {}

#[cfg(test)]
mod tests {
    use super::*;

    fn existing_file(dir: &tempfile::TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, b"").unwrap();
        path
    }

    #[test]
    fn test_posix_quote() {
        assert_eq!(posix_quote("sha256d"), "sha256d");
        assert_eq!(posix_quote("stratum+tcp://solo.ckpool.org:3333"), "stratum+tcp://solo.ckpool.org:3333");
        assert_eq!(posix_quote("my dir"), "'my dir'");
        assert_eq!(posix_quote("it's"), r"'it'\''s'");
        assert_eq!(posix_quote(""), "''");
    }

    #[test]
    fn test_applescript_and_windows_quote() {
        assert_eq!(applescript_escape(r#"say "hi" \o/"#), r#"say \"hi\" \\o/"#);
        assert_eq!(windows_quote("x"), "x");
        assert_eq!(windows_quote(r"C:\Program Files\x.exe"), r#""C:\Program Files\x.exe""#);
        assert_eq!(windows_quote(r#"a"b"#), r#""a""b""#);
    }

    #[test]
    fn test_strategy_wrapping() {
        let gnome = GnomeTerminal.wrap("cpuminer -a sha256d");
        assert_eq!(gnome.program, PathBuf::from("gnome-terminal"));
        assert_eq!(gnome.args, vec!["--", "bash", "-c", "cpuminer -a sha256d; exec bash"]);

        let x = XTerminalEmulator.wrap("ls");
        assert_eq!(x.args, vec!["-e", "bash", "-c", "ls; exec bash"]);

        let apple = AppleTerminal.wrap("'/Users/op/my miner' -o \"x\"");
        assert_eq!(apple.program, PathBuf::from("osascript"));
        assert_eq!(
            apple.args[1],
            r#"tell application "Terminal" to do script "'/Users/op/my miner' -o \"x\"""#
        );

        let win = WindowsConsole.wrap("cpuminer.exe -t 2");
        assert_eq!(win.args, vec!["/C", "start", "", "cmd", "/K"]);
        assert_eq!(win.raw_tail.as_deref(), Some("cpuminer.exe -t 2"));
        assert!(gnome.raw_tail.is_none());
        assert!(apple.raw_tail.is_none());
    }

    #[test]
    fn test_windows_console_keeps_quoted_line_intact() {
        let dir = tempfile::tempdir().unwrap();
        let exe = existing_file(&dir, "cpu miner.exe");
        let launcher = ProcessLauncher::new(Some(Arc::new(WindowsConsole)));
        let request = LaunchRequest::new(&exe, vec!["-u".into(), "addr.rig 1".into()]).in_terminal();

        let spec = launcher.command_for(&request).unwrap();
        // the quoted line must not pass through argv escaping again
        assert!(spec.args.iter().all(|a| !a.contains('"')));
        assert_eq!(
            spec.raw_tail,
            Some(format!("\"{}\" -u \"addr.rig 1\"", exe.display()))
        );
    }

    #[test]
    fn test_select_terminal_by_capability() {
        let only_x = select_terminal(terminal_strategies(), |p| p == "x-terminal-emulator");
        assert_eq!(only_x.map(|t| t.name()), Some("x-terminal-emulator"));

        let gnome_first = select_terminal(terminal_strategies(), |p| {
            p == "gnome-terminal" || p == "x-terminal-emulator"
        });
        assert_eq!(gnome_first.map(|t| t.name()), Some("GNOME Terminal"));

        assert!(select_terminal(terminal_strategies(), |_| false).is_none());
    }

    #[test]
    fn test_missing_executable_is_not_found() {
        let launcher = ProcessLauncher::new(Some(Arc::new(GnomeTerminal)));
        let request = LaunchRequest::new("/definitely/not/here/bitcoin-qt", vec![]);
        assert!(matches!(launcher.command_for(&request), Err(InstallError::NotFound(_))));
        assert!(matches!(launcher.launch(&request), Err(InstallError::NotFound(_))));
    }

    #[test]
    fn test_direct_command_passes_args_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let exe = existing_file(&dir, "bitcoin-qt");
        let launcher = ProcessLauncher::new(None);
        let request = LaunchRequest::new(&exe, vec!["-conf=/home/op/.bitcoin/mainnet/bitcoin.conf".into()]);

        let spec = launcher.command_for(&request).unwrap();
        assert_eq!(spec.program, exe);
        assert_eq!(spec.args, request.args);
        assert!(spec.raw_tail.is_none());
    }

    #[test]
    fn test_terminal_command_quotes_each_word() {
        let dir = tempfile::tempdir().unwrap();
        let exe = existing_file(&dir, "cpu miner");
        let launcher = ProcessLauncher::new(Some(Arc::new(GnomeTerminal)));
        let request = LaunchRequest::new(&exe, vec!["-u".into(), "addr.rig 1".into()]).in_terminal();

        let spec = launcher.command_for(&request).unwrap();
        let expected = format!("'{}' -u 'addr.rig 1'; exec bash", exe.display());
        assert_eq!(spec.args[3], expected);
    }

    #[test]
    fn test_elevation_rules() {
        let dir = tempfile::tempdir().unwrap();
        let exe = existing_file(&dir, "cgminer");
        let request = LaunchRequest::new(&exe, vec!["-p".into(), "x".into()]).elevated();
        assert!(request.options.open_in_terminal);

        let posix = ProcessLauncher::new(Some(Arc::new(XTerminalEmulator)));
        let spec = posix.command_for(&request).unwrap();
        assert!(spec.args[3].starts_with("sudo "));

        let windows = ProcessLauncher::new(Some(Arc::new(WindowsConsole)));
        assert!(matches!(windows.command_for(&request), Err(InstallError::Unsupported(_))));

        let headless = ProcessLauncher::new(None);
        assert!(matches!(headless.command_for(&request), Err(InstallError::Unsupported(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_launch_returns_without_waiting() {
        let launcher = ProcessLauncher::new(None);
        let request = LaunchRequest::new("/bin/sh", vec!["-c".into(), "sleep 5".into()]);
        let started = std::time::Instant::now();
        launcher.launch(&request).unwrap();
        assert!(started.elapsed() < std::time::Duration::from_secs(5));
    }
}
