//! File staging: byte-for-byte copies, hard links and the owner-exec bit.
//!
//! These are the primitives the platforms use to put the binary and its
//! descriptors into the install layout. None of them retry; failures come
//! back as [`InstallerError`] for the pipeline to record.

use std::fs::{self, File};
use std::io;
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::InstallerError;
use crate::platform::StagedArtifact;

/// How artifacts land in the install directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StagingMode {
    #[default]
    Copy,
    /// Hard link instead of copying (systemd family only)
    Link,
}

/// Copy `src` to `dst`, truncating `dst` if it exists. Returns the number of
/// bytes written.
///
/// The source is opened first, so an unreadable source never touches `dst`.
/// A failure after `dst` was opened leaves it truncated or partially written
/// and is reported as [`InstallerError::Copy`].
pub fn copy_file(src: &Path, dst: &Path) -> Result<u64, InstallerError> {
    let mut input = File::open(src).map_err(|source| InstallerError::OpenSource {
        path: src.to_path_buf(),
        source,
    })?;

    if same_file(src, dst) {
        debug!("{} is already in place", dst.display());
        return Ok(0);
    }

    let mut output = File::create(dst).map_err(|source| InstallerError::OpenDestination {
        path: dst.to_path_buf(),
        source,
    })?;

    io::copy(&mut input, &mut output).map_err(|source| InstallerError::Copy {
        src: src.to_path_buf(),
        dst: dst.to_path_buf(),
        source,
    })
}

/// Hard-link `src` at `dst`, replacing whatever `dst` held before.
pub fn link_file(src: &Path, dst: &Path) -> Result<(), InstallerError> {
    if same_file(src, dst) {
        return Ok(());
    }

    let link_error = |source: io::Error| InstallerError::Link {
        src: src.to_path_buf(),
        dst: dst.to_path_buf(),
        code: source.raw_os_error(),
        source,
    };

    match fs::remove_file(dst) {
        Ok(()) => debug!("replaced existing {}", dst.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(link_error(e)),
    }

    fs::hard_link(src, dst).map_err(link_error)
}

/// Put one artifact in place using `mode`.
pub fn stage_artifact(artifact: &StagedArtifact, mode: StagingMode) -> Result<(), InstallerError> {
    match mode {
        StagingMode::Copy => {
            let bytes = copy_file(&artifact.source, &artifact.dest)?;
            debug!(
                "copied {} -> {} ({bytes} bytes)",
                artifact.source.display(),
                artifact.dest.display()
            );
            Ok(())
        }
        StagingMode::Link => link_file(&artifact.source, &artifact.dest),
    }
}

/// Set the owner read/write/execute bits (`S_IRWXU`) on `path`.
#[cfg(unix)]
pub fn make_owner_executable(path: &Path) -> Result<(), InstallerError> {
    use std::os::unix::fs::PermissionsExt;

    #[allow(clippy::unnecessary_cast)]
    let mode = libc::S_IRWXU as u32;
    fs::set_permissions(path, fs::Permissions::from_mode(mode)).map_err(|source| {
        InstallerError::Permissions {
            path: path.to_path_buf(),
            source,
        }
    })
}

/// Executability comes from the file extension here; nothing to do.
#[cfg(not(unix))]
pub fn make_owner_executable(_path: &Path) -> Result<(), InstallerError> {
    Ok(())
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
