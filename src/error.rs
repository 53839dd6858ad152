//! Installer error taxonomy.
//!
//! Two classes exist: fatal errors abort the pipeline (nothing downstream can
//! work without a shell or a home directory), everything else is recorded
//! against the step that produced it and the pipeline carries on.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum InstallerError {
    /// The host shell could not be started at all.
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("environment variable {0} is not set")]
    MissingEnv(&'static str),

    #[error("cannot open source {}: {source}", .path.display())]
    OpenSource {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot open destination {}: {source}", .path.display())]
    OpenDestination {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("copy {} -> {} interrupted: {source}", .src.display(), .dst.display())]
    Copy {
        src: PathBuf,
        dst: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Hard link failed; `code` is the raw OS status when one is available.
    #[error("link {} -> {} failed (os status {}): {source}", .src.display(), .dst.display(), status_text(.code))]
    Link {
        src: PathBuf,
        dst: PathBuf,
        code: Option<i32>,
        #[source]
        source: io::Error,
    },

    #[error("cannot set permissions on {}: {source}", .path.display())]
    Permissions {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("`{command}` exited with status {}", status_text(.code))]
    CommandFailed { command: String, code: Option<i32> },

    #[error("`{0}` was not found on PATH")]
    ProgramNotFound(String),
}

fn status_text(code: &Option<i32>) -> String {
    code.map_or_else(|| "unknown".to_string(), |c| c.to_string())
}

impl InstallerError {
    /// Fatal errors stop the pipeline; all others are reported per step.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Spawn { .. } | Self::MissingEnv(_))
    }
}
