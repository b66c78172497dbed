//! Session handoff
//!
//! On admit the gate replaces its own process image with the operator's
//! shell, or with the single command of a non-interactive SSH invocation.
//! On deny it exits non-zero without granting a shell.

use std::env;
use std::os::unix::process::CommandExt;
use std::process::Command;

use crate::error::GateError;

/// Fallback when $SHELL is unset
const DEFAULT_SHELL: &str = "/bin/sh";

/// The operator's login shell
pub fn login_shell() -> String {
    env::var("SHELL").unwrap_or_else(|_| String::from(DEFAULT_SHELL))
}

/// The single command of a non-interactive SSH invocation, if any
pub fn ssh_command() -> Option<String> {
    env::var("SSH_ORIGINAL_COMMAND")
        .ok()
        .filter(|command| !command.is_empty())
}

/// Replace the current process with the shell, or with `shell -c command`
///
/// On success this never returns; the returned error is the exec failure.
pub fn handoff(command: Option<&str>) -> GateError {
    let mut shell = Command::new(login_shell());
    if let Some(command) = command {
        shell.arg("-c").arg(command);
    }

    GateError::Io(shell.exec())
}

/// Exit without granting a shell, bypassing normal cleanup
pub fn deny() -> ! {
    std::process::exit(1);
}
