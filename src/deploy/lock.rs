// ABOUTME: One deployment per project at a time, enforced by `<lock_dir>/<project>.lock`.
// ABOUTME: The file is created exclusively and names its holder; stale or unreadable files are taken over.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::diagnostics::{Diagnostics, Warning};
use crate::types::ServiceName;

use super::DeployError;

/// Locks older than this are assumed abandoned.
const STALE_AFTER_SECS: i64 = 60 * 60;

/// Contents of a lock file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockInfo {
    /// Hostname of the holder.
    pub holder: String,
    pub pid: u32,
    pub started_at: DateTime<Utc>,
    pub project: String,
    /// Version being deployed, or the command name for rollback.
    pub version: String,
}

impl LockInfo {
    pub fn new(project: &ServiceName, version: &str) -> Self {
        Self {
            holder: gethostname::gethostname().to_string_lossy().into_owned(),
            pid: std::process::id(),
            started_at: Utc::now(),
            project: project.to_string(),
            version: version.to_string(),
        }
    }

    pub fn is_stale(&self) -> bool {
        Utc::now() - self.started_at >= Duration::seconds(STALE_AFTER_SECS)
    }

    pub fn lock_path(dir: &Path, project: &ServiceName) -> PathBuf {
        dir.join(format!("{}.lock", project))
    }

    fn describe(&self) -> String {
        format!("{} (pid {}) since {}", self.holder, self.pid, self.started_at)
    }
}

/// What an existing lock file means for a new acquirer.
#[derive(Debug)]
enum Existing {
    Held(LockInfo),
    Stale(LockInfo),
    Unreadable,
}

impl Existing {
    fn inspect(path: &Path) -> Self {
        match fs::read_to_string(path)
            .ok()
            .and_then(|s| serde_json::from_str::<LockInfo>(&s).ok())
        {
            Some(info) if info.is_stale() => Existing::Stale(info),
            Some(info) => Existing::Held(info),
            None => Existing::Unreadable,
        }
    }

    /// The warning to record when taking over, or the error when we may not.
    fn takeover(self, path: &Path, break_lock: bool) -> Result<Warning, DeployError> {
        match self {
            Existing::Held(info) if break_lock => Ok(Warning::stale_lock(format!(
                "Breaking lock held by {}",
                info.describe()
            ))),
            Existing::Held(info) => Err(DeployError::lock_held(
                info.holder,
                info.pid,
                info.started_at,
                info.version,
            )),
            Existing::Stale(info) => Ok(Warning::stale_lock(format!(
                "Breaking stale lock held by {}",
                info.describe()
            ))),
            Existing::Unreadable => Ok(Warning::stale_lock(format!(
                "Lock file {} is unreadable; breaking it",
                path.display()
            ))),
        }
    }
}

/// A held lock. Dropping it removes the file.
#[derive(Debug)]
pub struct DeployLock {
    path: PathBuf,
    released: bool,
}

impl DeployLock {
    /// Take the project lock, or fail with `LockHeld` naming the holder.
    ///
    /// `break_lock` takes over a fresh lock too. The file is only ever
    /// written with create-new, so two racing breakers cannot both win.
    pub fn acquire(
        dir: &Path,
        project: &ServiceName,
        version: &str,
        break_lock: bool,
        diag: &mut Diagnostics,
    ) -> Result<Self, DeployError> {
        fs::create_dir_all(dir).map_err(|e| io_failure("create lock directory", dir, e))?;

        let path = LockInfo::lock_path(dir, project);
        let body = serde_json::to_vec_pretty(&LockInfo::new(project, version))
            .map_err(|e| DeployError::lock_error(format!("failed to serialize lock: {}", e)))?;

        match write_exclusive(&path, &body) {
            Ok(()) => return Ok(Self::held(path)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
            Err(e) => return Err(io_failure("create", &path, e)),
        }

        let warning = Existing::inspect(&path).takeover(&path, break_lock)?;
        diag.warn(warning);

        remove_if_present(&path).map_err(|e| io_failure("remove", &path, e))?;

        match write_exclusive(&path, &body) {
            Ok(()) => Ok(Self::held(path)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Err(DeployError::lock_error(
                "lock acquired by another process during break",
            )),
            Err(e) => Err(io_failure("create", &path, e)),
        }
    }

    fn held(path: PathBuf) -> Self {
        tracing::debug!("Acquired deploy lock {}", path.display());
        Self {
            path,
            released: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release now, surfacing a failure to remove the file.
    pub fn release(mut self) -> io::Result<()> {
        self.released = true;
        remove_if_present(&self.path)
    }
}

impl Drop for DeployLock {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = remove_if_present(&self.path) {
            tracing::warn!("Failed to remove deploy lock {}: {}", self.path.display(), e);
        }
    }
}

fn io_failure(action: &str, path: &Path, e: io::Error) -> DeployError {
    DeployError::lock_error(format!("failed to {} {}: {}", action, path.display(), e))
}

fn write_exclusive(path: &Path, content: &[u8]) -> io::Result<()> {
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    file.write_all(content)?;
    file.sync_all()
}

fn remove_if_present(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shop() -> ServiceName {
        ServiceName::new("shop").unwrap()
    }

    #[test]
    fn info_names_this_process() {
        let info = LockInfo::new(&shop(), "v1");

        assert_eq!(info.project, "shop");
        assert_eq!(info.pid, std::process::id());
        assert!(!info.holder.is_empty());
        assert!(!info.is_stale());
    }

    #[test]
    fn one_file_per_project() {
        assert_eq!(
            LockInfo::lock_path(Path::new("/var/lock/cutover"), &shop()),
            PathBuf::from("/var/lock/cutover/shop.lock")
        );
    }

    #[test]
    fn staleness_starts_at_one_hour() {
        let mut info = LockInfo::new(&shop(), "v1");
        info.started_at = Utc::now() - Duration::minutes(59);
        assert!(!info.is_stale());

        info.started_at = Utc::now() - Duration::minutes(61);
        assert!(info.is_stale());
    }

    #[test]
    fn held_lock_refuses_without_break() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shop.lock");
        fs::write(&path, serde_json::to_vec(&LockInfo::new(&shop(), "v1")).unwrap()).unwrap();

        assert!(matches!(
            Existing::inspect(&path),
            Existing::Held(ref info) if info.version == "v1"
        ));
        assert!(Existing::inspect(&path).takeover(&path, false).is_err());
        assert!(Existing::inspect(&path).takeover(&path, true).is_ok());
    }

    #[test]
    fn missing_file_reads_as_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Existing::inspect(&dir.path().join("gone.lock")),
            Existing::Unreadable
        ));
    }
}
