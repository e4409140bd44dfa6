use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Fixed key the auth token is stored under
pub const TOKEN_KEY: &str = "token";

/// Persistent home of the auth token
pub trait CredentialStore: Send + Sync {
    fn load_token(&self) -> Result<Option<String>>;

    fn save_token(&self, token: &str) -> Result<()>;

    fn clear_token(&self) -> Result<()>;
}

/// Token file in `~/.tmu/token`, readable by the owner only
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    file_path: PathBuf,
}

impl FileCredentialStore {
    pub fn new() -> Result<Self> {
        let home_dir = dirs::home_dir().context("Failed to determine home directory")?;
        Ok(Self::with_path(home_dir.join(".tmu").join(TOKEN_KEY)))
    }

    pub fn with_path(file_path: impl Into<PathBuf>) -> Self {
        Self { file_path: file_path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }
}

impl CredentialStore for FileCredentialStore {
    /// Missing, blank or garbled files read as "no token".
    fn load_token(&self) -> Result<Option<String>> {
        if !self.file_path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.file_path).context("Failed to read token file")?;
        let token = content.trim();

        if token.is_empty() {
            log_session!("token file is empty");
            return Ok(None);
        }
        if token.chars().any(char::is_control) {
            log::warn!("Token file {} contains control characters, ignoring it", self.file_path.display());
            return Ok(None);
        }
        Ok(Some(token.to_string()))
    }

    /// Write through a temp file and rename so a crash never leaves half a token.
    fn save_token(&self, token: &str) -> Result<()> {
        if let Some(parent) = self.file_path.parent() {
            fs::create_dir_all(parent).context("Failed to create token directory")?;
        }

        let temp_path = self.file_path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path).context("Failed to create temporary token file")?;
        file.write_all(token.as_bytes()).context("Failed to write token")?;
        file.sync_all().context("Failed to sync token file")?;
        drop(file);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&temp_path, fs::Permissions::from_mode(0o600))
                .context("Failed to set token file permissions")?;
        }

        fs::rename(&temp_path, &self.file_path).context("Failed to move token file into place")?;
        log_session!("token saved to {}", self.file_path.display());
        Ok(())
    }

    fn clear_token(&self) -> Result<()> {
        if self.file_path.exists() {
            fs::remove_file(&self.file_path).context("Failed to delete token file")?;
            log_session!("token removed from {}", self.file_path.display());
        }
        Ok(())
    }
}

/// Process-local store for tests and `--no-store` runs
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    token: Mutex<Option<String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: &str) -> Self {
        Self { token: Mutex::new(Some(token.to_string())) }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load_token(&self) -> Result<Option<String>> {
        let token = self.token.lock().map_err(|_| anyhow::anyhow!("credential store poisoned"))?;
        Ok(token.clone())
    }

    fn save_token(&self, token: &str) -> Result<()> {
        let mut slot = self.token.lock().map_err(|_| anyhow::anyhow!("credential store poisoned"))?;
        *slot = Some(token.to_string());
        Ok(())
    }

    fn clear_token(&self) -> Result<()> {
        let mut slot = self.token.lock().map_err(|_| anyhow::anyhow!("credential store poisoned"))?;
        *slot = None;
        Ok(())
    }
}
