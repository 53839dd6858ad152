//! Aura client bootstrapper.
//!
//! Installs the agent binary into a system-wide location (when elevated) or
//! a per-user one, stages its systemd units where the service manager finds
//! them, and registers a recurring job with the host's native scheduler:
//! a systemd timer on Linux, a Task Scheduler task on Windows.
//!
//! ```no_run
//! use aura_install::{InstallConfig, pipeline, platform};
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = InstallConfig::load(None)?;
//! let source_dir = config.source_dir()?;
//! let host = platform::native(config, source_dir);
//! let report = pipeline::install(host.as_ref())?;
//! for failed in report.failures() {
//!     eprintln!("{} failed", failed.step);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod env;
pub mod error;
pub mod gateway;
pub mod pipeline;
pub mod platform;
pub mod staging;

pub use config::InstallConfig;
pub use error::InstallerError;
pub use pipeline::{InstallReport, Step, StepOutcome};
pub use platform::{HostContext, InstallLayout, Platform};
