//! The one-shot install pipeline:
//! resolve identity → resolve paths → stage files → register recurring job.
//!
//! Only fatal errors (no shell, no home directory) abort the run. Every other
//! failure is logged, recorded in the [`InstallReport`] and the pipeline moves
//! on, so a caller can decide afterwards whether a partial install matters.

use std::fmt;

use log::{info, warn};

use crate::error::InstallerError;
use crate::platform::{Family, HostContext, InstallLayout, Platform};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    CreateDirectories,
    StageServiceDescriptor,
    StageBinary,
    StageTimerDescriptor,
    MarkExecutable,
    RegisterJob,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::CreateDirectories => "create directories",
            Self::StageServiceDescriptor => "stage service descriptor",
            Self::StageBinary => "stage binary",
            Self::StageTimerDescriptor => "stage timer descriptor",
            Self::MarkExecutable => "mark binary executable",
            Self::RegisterJob => "register recurring job",
        };
        f.write_str(name)
    }
}

#[derive(Debug)]
pub struct StepOutcome {
    pub step: Step,
    pub result: Result<(), InstallerError>,
}

impl StepOutcome {
    pub fn new(step: Step, result: Result<(), InstallerError>) -> Self {
        Self { step, result }
    }

    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Everything one install run did.
#[derive(Debug)]
pub struct InstallReport {
    pub family: Family,
    pub host: HostContext,
    pub layout: InstallLayout,
    pub steps: Vec<StepOutcome>,
}

impl InstallReport {
    pub fn failures(&self) -> impl Iterator<Item = &StepOutcome> {
        self.steps.iter().filter(|s| !s.is_ok())
    }

    pub fn is_complete(&self) -> bool {
        self.failures().next().is_none()
    }

    pub fn outcome(&self, step: Step) -> Option<&StepOutcome> {
        self.steps.iter().find(|s| s.step == step)
    }

    /// Whether the scheduler accepted the job.
    pub fn registered(&self) -> bool {
        self.outcome(Step::RegisterJob).is_some_and(StepOutcome::is_ok)
    }

    /// Process exit status for this run: 0, or 2 under `strict` when any
    /// step failed. Fatal errors never produce a report and exit 1.
    pub fn exit_code(&self, strict: bool) -> i32 {
        if strict && !self.is_complete() { 2 } else { 0 }
    }
}

/// Resolve identity and layout without touching the filesystem.
pub fn inspect(platform: &dyn Platform) -> Result<(HostContext, InstallLayout), InstallerError> {
    let host = platform.resolve_identity()?;
    let layout = platform.resolve_layout(&host)?;
    Ok((host, layout))
}

/// Run the whole pipeline once.
pub fn install(platform: &dyn Platform) -> Result<InstallReport, InstallerError> {
    let family = platform.family();
    let (host, layout) = inspect(platform)?;
    info!(
        "Installing for {} on {} ({} family, {})",
        host.user_name,
        host.os_name,
        family,
        if host.is_superuser { "system scope" } else { "user scope" }
    );
    info!("Install directory: {}", layout.install_dir);

    let mut steps = platform.stage_files(&layout)?;
    log_outcomes(&steps);

    let registration = platform.register_recurring_job(&host, &layout)?;
    log_outcomes(std::slice::from_ref(&registration));
    steps.push(registration);

    let report = InstallReport {
        family,
        host,
        layout,
        steps,
    };
    let failed = report.failures().count();
    if failed == 0 {
        info!("Installation finished");
    } else {
        warn!("Installation finished with {failed} failed step(s)");
    }
    Ok(report)
}

fn log_outcomes(steps: &[StepOutcome]) {
    for outcome in steps {
        match &outcome.result {
            Ok(()) => info!("{}: ok", outcome.step),
            Err(e) => warn!("{} failed: {e}", outcome.step),
        }
    }
}
