//! systemd family: units under the system or user unit directory, a timer
//! enabled with `systemctl enable --now`.

use std::path::PathBuf;

use log::debug;

use super::{Family, HostContext, InstallLayout, Platform, StagedArtifact};
use crate::config::InstallConfig;
use crate::env::EnvSource;
use crate::error::InstallerError;
use crate::gateway::{CommandGateway, sh_quote};
use crate::pipeline::{Step, StepOutcome};
use crate::staging::{self, StagingMode};

const SYSTEMCTL: &str = "systemctl";

pub struct Systemd<G, E> {
    config: InstallConfig,
    source_dir: PathBuf,
    gateway: G,
    env: E,
}

impl<G: CommandGateway, E: EnvSource> Systemd<G, E> {
    pub fn new(config: InstallConfig, source_dir: PathBuf, gateway: G, env: E) -> Self {
        Self {
            config,
            source_dir,
            gateway,
            env,
        }
    }

    fn home(&self) -> Result<String, InstallerError> {
        self.env.var("HOME").ok_or(InstallerError::MissingEnv("HOME"))
    }

    /// Unit directory the service manager scans for the given scope.
    fn unit_dir(&self, elevated: bool) -> Result<PathBuf, InstallerError> {
        if elevated {
            Ok(PathBuf::from(&self.config.systemd.system_unit_dir))
        } else {
            Ok(PathBuf::from(format!(
                "{}/{}",
                self.home()?,
                self.config.systemd.user_unit_dir
            )))
        }
    }

    /// `mkdir -p <install dir> <unit dir>`
    pub fn mkdir_command(layout: &InstallLayout) -> String {
        let mut cmd = format!("mkdir -p {}", sh_quote(&layout.install_dir));
        if let Some(dir) = &layout.service_dir {
            cmd.push(' ');
            cmd.push_str(&sh_quote(&dir.to_string_lossy()));
        }
        cmd
    }

    /// `systemctl enable --now [--user] <timer>`
    pub fn registration_command(&self, elevated: bool) -> String {
        let scope = if elevated { "" } else { "--user " };
        format!(
            "{SYSTEMCTL} enable --now {scope}{}",
            sh_quote(&self.config.systemd.timer)
        )
    }
}

fn stage(step: Step, artifact: Option<&StagedArtifact>, mode: StagingMode) -> Option<StepOutcome> {
    artifact.map(|artifact| StepOutcome::new(step, staging::stage_artifact(artifact, mode)))
}

impl<G: CommandGateway, E: EnvSource> Platform for Systemd<G, E> {
    fn family(&self) -> Family {
        Family::Systemd
    }

    fn is_superuser(&self) -> Result<bool, InstallerError> {
        Ok(self.gateway.capture("id -u")?.trim() == "0")
    }

    fn user_name(&self, elevated: bool) -> Result<String, InstallerError> {
        if elevated {
            return Ok("root".to_string());
        }
        self.env.var("USER").ok_or(InstallerError::MissingEnv("USER"))
    }

    fn os_name(&self) -> Result<String, InstallerError> {
        Ok(self.gateway.capture("uname")?.trim().to_string())
    }

    fn install_dir(&self, elevated: bool) -> Result<String, InstallerError> {
        let root = if elevated {
            self.config.systemd.root_home.clone()
        } else {
            self.home()?
        };
        Ok(format!("{root}/{}/", self.config.artifacts.install_dir))
    }

    fn resolve_layout(&self, host: &HostContext) -> Result<InstallLayout, InstallerError> {
        let elevated = host.is_superuser;
        let install_dir = self.install_dir(elevated)?;
        let unit_dir = self.unit_dir(elevated)?;
        let names = &self.config.systemd;

        // The system-scope unit ships under a different name and is renamed
        // on the way in.
        let service_source = if elevated {
            &names.system_service
        } else {
            &names.service
        };

        Ok(InstallLayout {
            binary: StagedArtifact {
                source: self.source_dir.join(&self.config.artifacts.binary),
                dest: PathBuf::from(format!(
                    "{install_dir}{}",
                    self.config.artifacts.installed_binary
                )),
            },
            service: Some(StagedArtifact {
                source: self.source_dir.join(service_source),
                dest: unit_dir.join(&names.service),
            }),
            timer: Some(StagedArtifact {
                source: self.source_dir.join(&names.timer),
                dest: unit_dir.join(&names.timer),
            }),
            service_dir: Some(unit_dir),
            install_dir,
        })
    }

    fn stage_files(&self, layout: &InstallLayout) -> Result<Vec<StepOutcome>, InstallerError> {
        let mode = self.config.artifacts.staging;
        let mut steps = Vec::with_capacity(5);

        let mkdir = Self::mkdir_command(layout);
        let exit = self.gateway.execute(&mkdir)?;
        steps.push(StepOutcome::new(
            Step::CreateDirectories,
            exit.into_result(&mkdir),
        ));

        steps.extend(stage(Step::StageServiceDescriptor, layout.service.as_ref(), mode));
        steps.extend(stage(Step::StageBinary, Some(&layout.binary), mode));
        steps.extend(stage(Step::StageTimerDescriptor, layout.timer.as_ref(), mode));

        debug!("setting owner rwx on {}", layout.binary.dest.display());
        steps.push(StepOutcome::new(
            Step::MarkExecutable,
            staging::make_owner_executable(&layout.binary.dest),
        ));

        Ok(steps)
    }

    fn register_recurring_job(
        &self,
        host: &HostContext,
        _layout: &InstallLayout,
    ) -> Result<StepOutcome, InstallerError> {
        if !self.gateway.has_program(SYSTEMCTL) {
            return Ok(StepOutcome::new(
                Step::RegisterJob,
                Err(InstallerError::ProgramNotFound(SYSTEMCTL.to_string())),
            ));
        }

        let cmd = self.registration_command(host.is_superuser);
        let exit = self.gateway.execute(&cmd)?;
        Ok(StepOutcome::new(Step::RegisterJob, exit.into_result(&cmd)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::CommandExit;
    use std::cell::RefCell;
    use std::collections::HashMap;

    #[derive(Default)]
    struct Canned {
        uid: &'static str,
        log: RefCell<Vec<String>>,
    }

    impl CommandGateway for Canned {
        fn capture(&self, command: &str) -> Result<String, InstallerError> {
            self.log.borrow_mut().push(command.to_string());
            Ok(match command {
                "id -u" => format!("{}\n", self.uid),
                "uname" => "Linux\n".to_string(),
                _ => String::new(),
            })
        }

        fn execute(&self, command: &str) -> Result<CommandExit, InstallerError> {
            self.log.borrow_mut().push(command.to_string());
            Ok(CommandExit { code: Some(0) })
        }

        fn has_program(&self, _program: &str) -> bool {
            true
        }
    }

    fn env(home: &str, user: &str) -> HashMap<String, String> {
        HashMap::from([
            ("HOME".to_string(), home.to_string()),
            ("USER".to_string(), user.to_string()),
        ])
    }

    fn platform(uid: &'static str) -> Systemd<Canned, HashMap<String, String>> {
        Systemd::new(
            InstallConfig::default(),
            PathBuf::from("/tmp/bundle"),
            Canned {
                uid,
                ..Canned::default()
            },
            env("/home/alice", "alice"),
        )
    }

    #[test]
    fn uid_zero_is_superuser() {
        assert!(platform("0").is_superuser().unwrap());
        assert!(!platform("1000").is_superuser().unwrap());
    }

    #[test]
    fn identity_for_regular_user() {
        let host = platform("1000").resolve_identity().unwrap();
        assert_eq!(
            host,
            HostContext {
                is_superuser: false,
                user_name: "alice".into(),
                os_name: "Linux".into(),
            }
        );
    }

    #[test]
    fn root_is_called_root() {
        let host = platform("0").resolve_identity().unwrap();
        assert_eq!(host.user_name, "root");
    }

    #[test]
    fn install_dir_depends_on_privilege_only() {
        let p = platform("1000");
        assert_eq!(p.install_dir(false).unwrap(), "/home/alice/.aura/");
        assert_eq!(p.install_dir(false).unwrap(), p.install_dir(false).unwrap());
        assert_eq!(p.install_dir(true).unwrap(), "/root/.aura/");
    }

    #[test]
    fn missing_home_is_fatal() {
        let p = Systemd::new(
            InstallConfig::default(),
            PathBuf::from("/tmp/bundle"),
            Canned::default(),
            HashMap::new(),
        );
        let err = p.install_dir(false).unwrap_err();
        assert!(matches!(err, InstallerError::MissingEnv("HOME")));
        assert!(err.is_fatal());
    }

    #[test]
    fn user_scope_layout() {
        let p = platform("1000");
        let host = p.resolve_identity().unwrap();
        let layout = p.resolve_layout(&host).unwrap();

        assert_eq!(layout.install_dir, "/home/alice/.aura/");
        assert_eq!(layout.binary.source, PathBuf::from("/tmp/bundle/aura"));
        assert_eq!(layout.binary_dest_path(), &PathBuf::from("/home/alice/.aura/aura"));
        assert_eq!(
            layout.service_desc_dest_path(),
            Some(&PathBuf::from("/home/alice/.config/systemd/user/aura.service"))
        );
        assert_eq!(
            layout.timer_desc_dest_path(),
            Some(&PathBuf::from("/home/alice/.config/systemd/user/aura.timer"))
        );
        assert_eq!(
            layout.service.as_ref().map(|s| s.source.clone()),
            Some(PathBuf::from("/tmp/bundle/aura.service"))
        );
    }

    #[test]
    fn system_scope_layout_renames_service() {
        let p = platform("0");
        let host = p.resolve_identity().unwrap();
        let layout = p.resolve_layout(&host).unwrap();

        assert_eq!(layout.install_dir, "/root/.aura/");
        assert_eq!(layout.service_dir, Some(PathBuf::from("/etc/systemd/system")));
        let service = layout.service.unwrap();
        assert_eq!(service.source, PathBuf::from("/tmp/bundle/aura-system.service"));
        assert_eq!(service.dest, PathBuf::from("/etc/systemd/system/aura.service"));
    }

    #[test]
    fn layout_is_a_function_of_host_context() {
        let p = platform("1000");
        let host = p.resolve_identity().unwrap();
        assert_eq!(p.resolve_layout(&host).unwrap(), p.resolve_layout(&host).unwrap());
    }

    #[test]
    fn mkdir_covers_both_directories() {
        let p = platform("1000");
        let layout = p.resolve_layout(&p.resolve_identity().unwrap()).unwrap();
        assert_eq!(
            Systemd::<Canned, HashMap<String, String>>::mkdir_command(&layout),
            "mkdir -p /home/alice/.aura/ /home/alice/.config/systemd/user"
        );
    }

    #[test]
    fn registration_scope_follows_privilege() {
        let p = platform("1000");
        assert_eq!(
            p.registration_command(false),
            "systemctl enable --now --user aura.timer"
        );
        assert_eq!(p.registration_command(true), "systemctl enable --now aura.timer");
    }

    #[test]
    fn failing_systemctl_is_reported() {
        struct Refusing;
        impl CommandGateway for Refusing {
            fn capture(&self, _command: &str) -> Result<String, InstallerError> {
                Ok("1000".into())
            }
            fn execute(&self, _command: &str) -> Result<CommandExit, InstallerError> {
                Ok(CommandExit { code: Some(1) })
            }
            fn has_program(&self, _program: &str) -> bool {
                true
            }
        }

        let p = Systemd::new(
            InstallConfig::default(),
            PathBuf::from("/tmp/bundle"),
            Refusing,
            env("/home/alice", "alice"),
        );
        let host = p.resolve_identity().unwrap();
        let layout = p.resolve_layout(&host).unwrap();
        let outcome = p.register_recurring_job(&host, &layout).unwrap();

        assert_eq!(outcome.step, Step::RegisterJob);
        assert!(matches!(
            outcome.result,
            Err(InstallerError::CommandFailed { code: Some(1), .. })
        ));
    }

    #[test]
    fn missing_systemctl_skips_the_command() {
        struct NoSystemctl(RefCell<Vec<String>>);
        impl CommandGateway for NoSystemctl {
            fn capture(&self, _command: &str) -> Result<String, InstallerError> {
                Ok("1000".into())
            }
            fn execute(&self, command: &str) -> Result<CommandExit, InstallerError> {
                self.0.borrow_mut().push(command.to_string());
                Ok(CommandExit { code: Some(0) })
            }
            fn has_program(&self, _program: &str) -> bool {
                false
            }
        }

        let gateway = NoSystemctl(RefCell::new(Vec::new()));
        let p = Systemd::new(
            InstallConfig::default(),
            PathBuf::from("/tmp/bundle"),
            &gateway,
            env("/home/alice", "alice"),
        );
        let host = p.resolve_identity().unwrap();
        let layout = p.resolve_layout(&host).unwrap();
        let outcome = p.register_recurring_job(&host, &layout).unwrap();

        assert!(matches!(outcome.result, Err(InstallerError::ProgramNotFound(_))));
        assert!(gateway.0.borrow().is_empty());
    }
}
