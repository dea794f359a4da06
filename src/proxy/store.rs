// ABOUTME: Storage for the upstream file: atomic writes and a sibling backup.
// ABOUTME: File-backed store for real proxies, in-memory store for tests and dry wiring.

use parking_lot::Mutex;
use std::ffi::OsString;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use super::upstream::{UpstreamConfig, UpstreamError};

const BACKUP_SUFFIX: &str = ".cutover-backup";

/// Access to the upstream configuration. Only the traffic switcher mutates it.
pub trait UpstreamStore: Send + Sync {
    /// Human-readable location for messages.
    fn location(&self) -> String;

    fn exists(&self) -> bool;

    fn read_raw(&self) -> Result<String, UpstreamError>;

    /// Replace the content in one step; readers see the old or the new file, never a mix.
    fn write_raw(&self, content: &str) -> Result<(), UpstreamError>;

    fn backup(&self) -> Result<(), UpstreamError>;

    /// Put the backup back in place. The backup is consumed.
    fn restore_backup(&self) -> Result<(), UpstreamError>;

    fn discard_backup(&self) -> Result<(), UpstreamError>;

    fn has_backup(&self) -> bool;

    fn read(&self) -> Result<UpstreamConfig, UpstreamError> {
        UpstreamConfig::parse(&self.read_raw()?)
    }

    fn write(&self, config: &UpstreamConfig) -> Result<(), UpstreamError> {
        self.write_raw(&config.render())
    }
}

#[derive(Debug, Clone)]
pub struct FileUpstreamStore {
    path: PathBuf,
    backup_path: PathBuf,
}

impl FileUpstreamStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut backup: OsString = path.as_os_str().to_owned();
        backup.push(BACKUP_SUFFIX);
        Self {
            path,
            backup_path: PathBuf::from(backup),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn backup_path(&self) -> &Path {
        &self.backup_path
    }

    fn io_error(path: &Path) -> impl FnOnce(io::Error) -> UpstreamError + '_ {
        move |source| UpstreamError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Write via a temp file in the same directory, then rename over the target.
fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    if let Ok(meta) = fs::metadata(path) {
        tmp.as_file().set_permissions(meta.permissions())?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

impl UpstreamStore for FileUpstreamStore {
    fn location(&self) -> String {
        self.path.display().to_string()
    }

    fn exists(&self) -> bool {
        self.path.is_file()
    }

    fn read_raw(&self) -> Result<String, UpstreamError> {
        fs::read_to_string(&self.path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                UpstreamError::NotFound(self.path.clone())
            } else {
                Self::io_error(&self.path)(e)
            }
        })
    }

    fn write_raw(&self, content: &str) -> Result<(), UpstreamError> {
        atomic_write(&self.path, content.as_bytes()).map_err(Self::io_error(&self.path))
    }

    fn backup(&self) -> Result<(), UpstreamError> {
        let content = fs::read(&self.path).map_err(Self::io_error(&self.path))?;
        atomic_write(&self.backup_path, &content).map_err(Self::io_error(&self.backup_path))?;
        tracing::debug!("Backed up {} to {}", self.path.display(), self.backup_path.display());
        Ok(())
    }

    fn restore_backup(&self) -> Result<(), UpstreamError> {
        if !self.has_backup() {
            return Err(UpstreamError::NoBackup(self.backup_path.clone()));
        }
        fs::rename(&self.backup_path, &self.path).map_err(Self::io_error(&self.path))?;
        tracing::debug!("Restored {} from backup", self.path.display());
        Ok(())
    }

    fn discard_backup(&self) -> Result<(), UpstreamError> {
        match fs::remove_file(&self.backup_path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Self::io_error(&self.backup_path)(e)),
        }
    }

    fn has_backup(&self) -> bool {
        self.backup_path.is_file()
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    content: Option<String>,
    backup: Option<String>,
    writes: usize,
}

/// In-memory upstream file.
#[derive(Debug, Default)]
pub struct MemoryUpstreamStore {
    state: Mutex<MemoryState>,
}

impl MemoryUpstreamStore {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            state: Mutex::new(MemoryState {
                content: Some(content.into()),
                ..Default::default()
            }),
        }
    }

    /// A store whose file does not exist.
    pub fn missing() -> Self {
        Self::default()
    }

    pub fn content(&self) -> Option<String> {
        self.state.lock().content.clone()
    }

    pub fn backup_content(&self) -> Option<String> {
        self.state.lock().backup.clone()
    }

    /// Writes to the main file, including restores.
    pub fn write_count(&self) -> usize {
        self.state.lock().writes
    }

    /// Seed a leftover backup, as an interrupted switch would leave.
    pub fn set_backup(&self, content: impl Into<String>) {
        self.state.lock().backup = Some(content.into());
    }
}

impl UpstreamStore for MemoryUpstreamStore {
    fn location(&self) -> String {
        "memory".to_string()
    }

    fn exists(&self) -> bool {
        self.state.lock().content.is_some()
    }

    fn read_raw(&self) -> Result<String, UpstreamError> {
        self.state
            .lock()
            .content
            .clone()
            .ok_or_else(|| UpstreamError::NotFound(PathBuf::from("memory")))
    }

    fn write_raw(&self, content: &str) -> Result<(), UpstreamError> {
        let mut state = self.state.lock();
        state.content = Some(content.to_string());
        state.writes += 1;
        Ok(())
    }

    fn backup(&self) -> Result<(), UpstreamError> {
        let mut state = self.state.lock();
        let content = state
            .content
            .clone()
            .ok_or_else(|| UpstreamError::NotFound(PathBuf::from("memory")))?;
        state.backup = Some(content);
        Ok(())
    }

    fn restore_backup(&self) -> Result<(), UpstreamError> {
        let mut state = self.state.lock();
        let backup = state
            .backup
            .take()
            .ok_or_else(|| UpstreamError::NoBackup(PathBuf::from("memory")))?;
        state.content = Some(backup);
        state.writes += 1;
        Ok(())
    }

    fn discard_backup(&self) -> Result<(), UpstreamError> {
        self.state.lock().backup = None;
        Ok(())
    }

    fn has_backup(&self) -> bool {
        self.state.lock().backup.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = "server 127.0.0.1:8001;  # blue [active]\nserver 127.0.0.1:8002 down;  # green\n";

    #[test]
    fn backup_path_is_a_sibling() {
        let store = FileUpstreamStore::new("/etc/nginx/conf.d/upstream.conf");
        assert_eq!(
            store.backup_path(),
            Path::new("/etc/nginx/conf.d/upstream.conf.cutover-backup")
        );
    }

    #[test]
    fn file_store_backup_and_restore() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("upstream.conf");
        fs::write(&path, CONFIG).unwrap();
        let store = FileUpstreamStore::new(&path);

        store.backup().unwrap();
        assert!(store.has_backup());

        store.write_raw("garbage").unwrap();
        assert_eq!(store.read_raw().unwrap(), "garbage");

        store.restore_backup().unwrap();
        assert_eq!(store.read_raw().unwrap(), CONFIG);
        assert!(!store.has_backup());
    }

    #[test]
    fn file_store_write_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("upstream.conf");
        fs::write(&path, CONFIG).unwrap();
        let store = FileUpstreamStore::new(&path);

        store.write(&store.read().unwrap()).unwrap();

        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn file_store_write_keeps_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("upstream.conf");
        fs::write(&path, CONFIG).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

        FileUpstreamStore::new(&path).write_raw(CONFIG).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
    }

    #[test]
    fn missing_file_reports_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileUpstreamStore::new(dir.path().join("nope.conf"));
        assert!(!store.exists());
        assert!(matches!(store.read_raw(), Err(UpstreamError::NotFound(_))));
    }

    #[test]
    fn discarding_absent_backup_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileUpstreamStore::new(dir.path().join("upstream.conf"));
        store.discard_backup().unwrap();
    }

    #[test]
    fn memory_store_restore_consumes_backup() {
        let store = MemoryUpstreamStore::new(CONFIG);
        store.backup().unwrap();
        store.write_raw("x").unwrap();
        store.restore_backup().unwrap();
        assert_eq!(store.content().as_deref(), Some(CONFIG));
        assert!(!store.has_backup());
        assert_eq!(store.write_count(), 2);
    }
}
