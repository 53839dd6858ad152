//! Subprocess execution through the host shell.
//!
//! Every identity query, directory creation and scheduler registration goes
//! through a [`CommandGateway`]. The only error a gateway reports is
//! [`InstallerError::Spawn`]: a command that starts and then fails is not an
//! error here, callers judge the captured text or the exit status.

use std::process::{Command, Stdio};

use log::debug;

use crate::error::InstallerError;

/// Exit status of a command run with [`CommandGateway::execute`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandExit {
    pub code: Option<i32>,
}

impl CommandExit {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// `Ok` on success, otherwise [`InstallerError::CommandFailed`] for `command`.
    pub fn into_result(self, command: &str) -> Result<(), InstallerError> {
        if self.success() {
            Ok(())
        } else {
            Err(InstallerError::CommandFailed {
                command: command.to_string(),
                code: self.code,
            })
        }
    }
}

pub trait CommandGateway {
    /// Run `command` through the host shell, block until it exits and return
    /// everything it wrote to stdout. Trailing newlines are left in place.
    fn capture(&self, command: &str) -> Result<String, InstallerError>;

    /// Run `command` with inherited stdio and return its exit status.
    fn execute(&self, command: &str) -> Result<CommandExit, InstallerError>;

    /// Whether `program` can be found on `PATH`.
    fn has_program(&self, program: &str) -> bool {
        which::which(program).is_ok()
    }
}

impl<T: CommandGateway + ?Sized> CommandGateway for &T {
    fn capture(&self, command: &str) -> Result<String, InstallerError> {
        (**self).capture(command)
    }

    fn execute(&self, command: &str) -> Result<CommandExit, InstallerError> {
        (**self).execute(command)
    }

    fn has_program(&self, program: &str) -> bool {
        (**self).has_program(program)
    }
}

/// Gateway backed by `sh -c` on Unix and `cmd /C` on Windows.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellGateway;

impl ShellGateway {
    fn shell(command: &str) -> Command {
        #[cfg(windows)]
        let cmd = {
            use std::os::windows::process::CommandExt;
            let mut cmd = Command::new("cmd");
            cmd.arg("/C").raw_arg(command);
            cmd
        };

        #[cfg(not(windows))]
        let cmd = {
            let mut cmd = Command::new("sh");
            cmd.arg("-c").arg(command);
            cmd
        };

        cmd
    }
}

impl CommandGateway for ShellGateway {
    fn capture(&self, command: &str) -> Result<String, InstallerError> {
        debug!("capturing `{command}`");
        let output = Self::shell(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .output()
            .map_err(|source| InstallerError::Spawn {
                command: command.to_string(),
                source,
            })?;

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn execute(&self, command: &str) -> Result<CommandExit, InstallerError> {
        debug!("executing `{command}`");
        let status = Self::shell(command)
            .status()
            .map_err(|source| InstallerError::Spawn {
                command: command.to_string(),
                source,
            })?;

        Ok(CommandExit {
            code: status.code(),
        })
    }
}

/// Quote `arg` for `sh` when it holds anything beyond plain path characters.
/// `~` is not plain: unquoted it would be tilde-expanded.
pub fn sh_quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "/._-+:@%=,".contains(c));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

/// Whether `cmd.exe` would split or reinterpret `arg` unquoted.
pub fn cmd_needs_quotes(arg: &str) -> bool {
    arg.is_empty()
        || arg
            .chars()
            .any(|c| c.is_whitespace() || "&|<>^()".contains(c))
}

/// Quote `arg` for `cmd.exe` when it contains whitespace or metacharacters.
pub fn cmd_quote(arg: &str) -> String {
    if cmd_needs_quotes(arg) {
        format!("\"{arg}\"")
    } else {
        arg.to_string()
    }
}
