//! Bearer token storage.
//!
//! The token is owned by whoever logs the user in; the HTTP client and the
//! real-time transport only read it. Token storage is the one piece of
//! state the client persists.

use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use tracing::{debug, warn};

use crate::error::RhResult;
use crate::platform::Platform;

/// Getter/setter for the bearer token shared by the HTTP and socket clients.
pub trait TokenStore: Send + Sync {
    /// Current token, if the user is logged in.
    fn token(&self) -> Option<String>;

    /// Replace (or clear, with `None`) the current token.
    fn set_token(&self, token: Option<String>) -> RhResult<()>;
}

/// Process-local token store.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: RwLock<Option<String>>,
}

impl MemoryTokenStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds a token.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(token.into())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_token(&self, token: Option<String>) -> RhResult<()> {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = token;
        Ok(())
    }
}

/// Token store backed by a single file, cached in memory.
///
/// Used by the CLI so `login` and `connect` can run as separate processes.
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    cache: MemoryTokenStore,
}

impl FileTokenStore {
    /// Open (or lazily create) a token file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let cached = match std::fs::read_to_string(&path) {
            Ok(contents) => {
                let trimmed = contents.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!("failed to read token file {}: {e}", path.display());
                None
            }
        };

        Self {
            path,
            cache: MemoryTokenStore {
                token: RwLock::new(cached),
            },
        }
    }

    /// Open the token file in the platform data directory.
    pub fn open_default() -> RhResult<Self> {
        Ok(Self::open(Platform::data_dir()?.join("token")))
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn token(&self) -> Option<String> {
        self.cache.token()
    }

    fn set_token(&self, token: Option<String>) -> RhResult<()> {
        match &token {
            Some(value) => {
                if let Some(parent) = self.path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                write_private(&self.path, value.as_bytes())?;
                debug!("token saved to {}", self.path.display());
            }
            None => match std::fs::remove_file(&self.path) {
                Ok(()) => debug!("token file removed"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            },
        }
        self.cache.set_token(token)
    }
}

/// Write `contents` to a file readable only by the current user.
#[cfg(unix)]
fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    // `mode` only applies on creation; tighten a file left by older versions.
    file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    file.write_all(contents)
}

#[cfg(not(unix))]
fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    std::fs::write(path, contents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_set_and_clear() {
        let store = MemoryTokenStore::new();
        assert!(store.token().is_none());

        store.set_token(Some("abc".into())).unwrap();
        assert_eq!(store.token().as_deref(), Some("abc"));

        store.set_token(None).unwrap();
        assert!(store.token().is_none());
    }

    #[test]
    fn test_file_store_persists_across_opens() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("sub").join("token");

        let store = FileTokenStore::open(&path);
        assert!(store.token().is_none());
        store.set_token(Some("jwt-123".into())).unwrap();

        let reopened = FileTokenStore::open(&path);
        assert_eq!(reopened.token().as_deref(), Some("jwt-123"));

        reopened.set_token(None).unwrap();
        assert!(!path.exists());
        // Clearing twice is fine.
        reopened.set_token(None).unwrap();
    }

    #[test]
    fn test_file_store_ignores_blank_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("token");
        std::fs::write(&path, "  \n").unwrap();
        assert!(FileTokenStore::open(&path).token().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_file_store_is_private_to_owner() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("token");

        FileTokenStore::open(&path)
            .set_token(Some("jwt-123".into()))
            .unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);

        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();
        FileTokenStore::open(&path)
            .set_token(Some("jwt-456".into()))
            .unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "jwt-456");
    }
}
