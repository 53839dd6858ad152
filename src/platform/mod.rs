//! Host platform abstraction.
//!
//! Both scheduler families implement the same capability set:
//! - resolve identity (privilege, user, OS)
//! - resolve the install layout
//! - stage the binary and descriptors
//! - register the recurring job
//!
//! Families:
//! - Linux and other Unix hosts: systemd timer units ([`Systemd`])
//! - Windows: Task Scheduler via `schtasks.exe` ([`TaskScheduler`])
//!
//! The implementations are plain string/path logic over a
//! [`CommandGateway`](crate::gateway::CommandGateway), so either one can be
//! built and exercised on any host. [`native`] picks the one for this build.

use std::fmt;
use std::path::PathBuf;

use crate::config::InstallConfig;
use crate::env::ProcessEnv;
use crate::error::InstallerError;
use crate::gateway::ShellGateway;
use crate::pipeline::StepOutcome;

mod systemd;
mod task_scheduler;

pub use systemd::Systemd;
pub use task_scheduler::TaskScheduler;

/// Who and where we are. Derived once per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostContext {
    pub is_superuser: bool,
    pub user_name: String,
    pub os_name: String,
}

/// One file to put in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedArtifact {
    pub source: PathBuf,
    pub dest: PathBuf,
}

/// Where staged artifacts live for a given [`HostContext`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallLayout {
    /// Install directory in the host's native form, trailing separator included
    pub install_dir: String,
    /// Directory the scheduler reads descriptors from, if the family uses one
    pub service_dir: Option<PathBuf>,
    pub binary: StagedArtifact,
    pub service: Option<StagedArtifact>,
    pub timer: Option<StagedArtifact>,
}

impl InstallLayout {
    pub fn binary_dest_path(&self) -> &PathBuf {
        &self.binary.dest
    }

    pub fn service_desc_dest_path(&self) -> Option<&PathBuf> {
        self.service.as_ref().map(|a| &a.dest)
    }

    pub fn timer_desc_dest_path(&self) -> Option<&PathBuf> {
        self.timer.as_ref().map(|a| &a.dest)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    Systemd,
    TaskScheduler,
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Systemd => f.write_str("systemd"),
            Self::TaskScheduler => f.write_str("task scheduler"),
        }
    }
}

/// Capability set every host family provides.
///
/// Errors returned directly from these methods are fatal for the run; step
/// level failures travel inside [`StepOutcome`].
pub trait Platform {
    fn family(&self) -> Family;

    /// Whether the process runs with administrator/root rights.
    fn is_superuser(&self) -> Result<bool, InstallerError>;

    /// Display name of the current user.
    fn user_name(&self, elevated: bool) -> Result<String, InstallerError>;

    /// Host operating system name.
    fn os_name(&self) -> Result<String, InstallerError>;

    /// Install directory for the given privilege state. Every caller that
    /// needs the install directory goes through here.
    fn install_dir(&self, elevated: bool) -> Result<String, InstallerError>;

    fn resolve_layout(&self, host: &HostContext) -> Result<InstallLayout, InstallerError>;

    /// Create directories and put every artifact of `layout` in place.
    fn stage_files(&self, layout: &InstallLayout) -> Result<Vec<StepOutcome>, InstallerError>;

    /// Hand the staged job to the native scheduler.
    fn register_recurring_job(
        &self,
        host: &HostContext,
        layout: &InstallLayout,
    ) -> Result<StepOutcome, InstallerError>;

    fn resolve_identity(&self) -> Result<HostContext, InstallerError> {
        let is_superuser = self.is_superuser()?;
        Ok(HostContext {
            is_superuser,
            user_name: self.user_name(is_superuser)?,
            os_name: self.os_name()?,
        })
    }
}

cfg_if::cfg_if! {
    if #[cfg(windows)] {
        /// Platform implementation for this build.
        pub type Native = TaskScheduler<ShellGateway, ProcessEnv>;
    } else {
        /// Platform implementation for this build.
        pub type Native = Systemd<ShellGateway, ProcessEnv>;
    }
}

/// The platform for this build, wired to the real shell and process
/// environment.
pub fn native(config: InstallConfig, source_dir: PathBuf) -> Box<dyn Platform> {
    Box::new(Native::new(config, source_dir, ShellGateway, ProcessEnv))
}
