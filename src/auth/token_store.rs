/// Plain-text refresh token cache
/// One value per file, overwritten wholesale on every successful exchange or refresh
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::Result;

pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the cached refresh token. A missing or blank file is "no token", not an error.
    pub fn load(&self) -> Result<Option<String>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("No cached refresh token at {}", self.path.display());
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        #[cfg(unix)]
        self.warn_if_exposed();

        let token = content.trim();
        if token.is_empty() {
            tracing::debug!("Refresh token file {} is empty", self.path.display());
            return Ok(None);
        }

        Ok(Some(token.to_string()))
    }

    /// Overwrite the cache with `refresh_token`
    pub fn save(&self, refresh_token: &str) -> Result<()> {
        fs::write(&self.path, refresh_token)?;

        // Owner read/write only
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))?;
        }

        tracing::debug!("Refresh token written to {}", self.path.display());
        Ok(())
    }

    #[cfg(unix)]
    fn warn_if_exposed(&self) {
        use std::os::unix::fs::PermissionsExt;

        let Ok(metadata) = fs::metadata(&self.path) else {
            return;
        };
        let mode = metadata.permissions().mode();

        if mode & 0o044 != 0 {
            tracing::warn!(
                "⚠️  Refresh token file {} is readable by other users (mode: {:o}). Run: chmod 600 {}",
                self.path.display(),
                mode & 0o777,
                self.path.display()
            );
        }
    }
}
