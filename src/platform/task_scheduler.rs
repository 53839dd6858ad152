//! Windows family: the binary goes under the profile (or a fixed admin
//! directory) and a scheduled task created with `schtasks.exe` runs it.

use std::path::{Path, PathBuf};

use log::{debug, warn};
use once_cell::sync::{Lazy, OnceCell};
use regex::Regex;

use super::{Family, HostContext, InstallLayout, Platform, StagedArtifact};
use crate::config::InstallConfig;
use crate::env::EnvSource;
use crate::error::InstallerError;
use crate::gateway::{CommandGateway, cmd_needs_quotes, cmd_quote};
use crate::pipeline::{Step, StepOutcome};
use crate::staging::{self, StagingMode};

const SCHTASKS: &str = "schtasks.exe";

/// Only succeeds (prints anything) with administrator rights.
const ELEVATION_CHECK: &str = "net session";

const OS_NAME_QUERY: &str = r#"systeminfo | findstr /B /C:"OS Name""#;

static OS_NAME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[\n\r\s]*.*?(Windows\s*\S+).*[\n\r\s]*$").expect("OS name pattern is valid")
});

pub struct TaskScheduler<G, E> {
    config: InstallConfig,
    source_dir: PathBuf,
    gateway: G,
    env: E,
    elevated: OnceCell<bool>,
}

impl<G: CommandGateway, E: EnvSource> TaskScheduler<G, E> {
    pub fn new(config: InstallConfig, source_dir: PathBuf, gateway: G, env: E) -> Self {
        Self {
            config,
            source_dir,
            gateway,
            env,
            elevated: OnceCell::new(),
        }
    }

    fn profile(&self) -> Result<String, InstallerError> {
        self.env
            .var("USERPROFILE")
            .ok_or(InstallerError::MissingEnv("USERPROFILE"))
    }

    /// `schtasks.exe /create /F /tn <name> /sc <freq> /mo <value> /tr <path> [/rl highest]`
    pub fn registration_command(&self, elevated: bool, target: &Path) -> String {
        let task = &self.config.task;
        let mut cmd = format!(
            "{SCHTASKS} /create /F /tn {} /sc {} /mo {} /tr {}",
            cmd_quote(&task.name),
            task.frequency,
            task.modifier,
            task_action(target)
        );
        if elevated {
            cmd.push_str(" /rl highest");
        }
        cmd
    }
}

/// `/tr` value. schtasks strips one layer of quotes while parsing, so a path
/// that needs quoting also carries escaped inner quotes into the stored action.
pub(crate) fn task_action(target: &Path) -> String {
    let path = target.to_string_lossy();
    if cmd_needs_quotes(&path) {
        format!(r#""\"{path}\"""#)
    } else {
        path.into_owned()
    }
}

/// Pull the `Windows <edition>` token out of the `OS Name` line.
pub(crate) fn parse_os_name(systeminfo: &str) -> String {
    match OS_NAME_PATTERN.captures(systeminfo) {
        Some(caps) => caps[1].to_string(),
        None => {
            debug!("no Windows product name in {systeminfo:?}");
            systeminfo.trim().to_string()
        }
    }
}

impl<G: CommandGateway, E: EnvSource> Platform for TaskScheduler<G, E> {
    fn family(&self) -> Family {
        Family::TaskScheduler
    }

    /// Checked once, then served from the cache.
    fn is_superuser(&self) -> Result<bool, InstallerError> {
        self.elevated
            .get_or_try_init(|| {
                let output = self.gateway.capture(ELEVATION_CHECK)?;
                Ok::<_, InstallerError>(!output.is_empty())
            })
            .copied()
    }

    fn user_name(&self, elevated: bool) -> Result<String, InstallerError> {
        let mut user = self
            .env
            .var("USERNAME")
            .ok_or(InstallerError::MissingEnv("USERNAME"))?;
        if elevated {
            user.push_str(" (admin)");
        }
        Ok(user)
    }

    fn os_name(&self) -> Result<String, InstallerError> {
        Ok(parse_os_name(&self.gateway.capture(OS_NAME_QUERY)?))
    }

    fn install_dir(&self, elevated: bool) -> Result<String, InstallerError> {
        if elevated {
            Ok(format!("{}\\", self.config.task.admin_install_dir))
        } else {
            Ok(format!(
                "{}\\{}\\",
                self.profile()?,
                self.config.artifacts.install_dir
            ))
        }
    }

    fn resolve_layout(&self, host: &HostContext) -> Result<InstallLayout, InstallerError> {
        let install_dir = self.install_dir(host.is_superuser)?;
        Ok(InstallLayout {
            binary: StagedArtifact {
                source: self.source_dir.join(&self.config.artifacts.binary),
                dest: PathBuf::from(format!(
                    "{install_dir}{}",
                    self.config.artifacts.installed_binary
                )),
            },
            install_dir,
            service_dir: None,
            service: None,
            timer: None,
        })
    }

    fn stage_files(&self, layout: &InstallLayout) -> Result<Vec<StepOutcome>, InstallerError> {
        if self.config.artifacts.staging == StagingMode::Link {
            warn!("Hard-link staging is not used with the task scheduler, copying instead");
        }

        let mkdir = format!("mkdir {}", cmd_quote(&layout.install_dir));
        let exit = self.gateway.execute(&mkdir)?;
        // `mkdir` refuses an existing directory; that is not a failure here.
        let existing = Path::new(layout.install_dir.trim_end_matches('\\')).is_dir();
        let created = if exit.success() || existing {
            Ok(())
        } else {
            exit.into_result(&mkdir)
        };

        Ok(vec![
            StepOutcome::new(Step::CreateDirectories, created),
            StepOutcome::new(
                Step::StageBinary,
                staging::stage_artifact(&layout.binary, StagingMode::Copy),
            ),
        ])
    }

    fn register_recurring_job(
        &self,
        host: &HostContext,
        layout: &InstallLayout,
    ) -> Result<StepOutcome, InstallerError> {
        if !self.gateway.has_program(SCHTASKS) {
            return Ok(StepOutcome::new(
                Step::RegisterJob,
                Err(InstallerError::ProgramNotFound(SCHTASKS.to_string())),
            ));
        }

        let cmd = self.registration_command(host.is_superuser, layout.binary_dest_path());
        let exit = self.gateway.execute(&cmd)?;
        Ok(StepOutcome::new(Step::RegisterJob, exit.into_result(&cmd)))
    }
}
