use intrinio_core::{CredentialStore, IntrinioError, IntrinioResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

pub const DEFAULT_BASE_URL: &str = "https://api.intrinio.com";
const CONF_FILE_NAME: &str = "intrinio.conf";

/// Contents of `intrinio.conf`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(rename = "user", default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Optional CA bundle (PEM) used instead of the built-in roots
    #[serde(rename = "certifi", default, skip_serializing_if = "Option::is_none")]
    pub cacerts: Option<String>,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            cacerts: None,
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }
}

/// Credential store backed by a JSON file readable only by its owner.
pub struct ConfigStore {
    path: Option<PathBuf>,
    base_url: String,
    credentials: RwLock<Credentials>,
}

impl ConfigStore {
    /// `<config dir>/intrinio/intrinio.conf`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("intrinio").join(CONF_FILE_NAME))
    }

    /// Store that never touches disk.
    pub fn in_memory(credentials: Credentials) -> Self {
        Self {
            path: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            credentials: RwLock::new(credentials),
        }
    }

    /// Load credentials from `path`. A missing or unreadable file leaves the
    /// store unconfigured.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let credentials = match read_credentials(&path) {
            Ok(credentials) => credentials,
            Err(e) => {
                tracing::error!("Unable to load {}: {}", path.display(), e);
                Credentials::default()
            }
        };
        Self {
            path: Some(path),
            base_url: DEFAULT_BASE_URL.to_string(),
            credentials: RwLock::new(credentials),
        }
    }

    /// File store at `INTRINIO_CONF` (or the default path), with
    /// `INTRINIO_USERNAME`/`INTRINIO_PASSWORD`/`INTRINIO_BASE_URL` overrides.
    pub fn from_env() -> Self {
        let path = std::env::var("INTRINIO_CONF")
            .ok()
            .map(PathBuf::from)
            .or_else(Self::default_path);
        let mut store = match path {
            Some(path) => Self::load(path),
            None => Self::in_memory(Credentials::default()),
        };

        if let (Ok(username), Ok(password)) = (
            std::env::var("INTRINIO_USERNAME"),
            std::env::var("INTRINIO_PASSWORD"),
        ) {
            let cacerts = store.credentials().cacerts;
            store.credentials = RwLock::new(Credentials {
                username,
                password,
                cacerts,
            });
        }
        if let Ok(base_url) = std::env::var("INTRINIO_BASE_URL") {
            store.base_url = base_url;
        }
        store
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn credentials(&self) -> Credentials {
        self.credentials
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// First half of the username followed by one `*` per hidden character.
    pub fn masked_user(&self) -> String {
        let username = self.credentials().username;
        let half = username.chars().count() / 2;
        let shown: String = username.chars().take(half).collect();
        format!("{}{}", shown, "*".repeat(half))
    }

    fn persist(&self, credentials: &Credentials) -> IntrinioResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(|e| IntrinioError::Config(e.to_string()))?;
        }
        let json = serde_json::to_string_pretty(credentials)
            .map_err(|e| IntrinioError::Config(e.to_string()))?;
        tracing::debug!("Saving configuration to {}", path.display());
        std::fs::write(path, json).map_err(|e| IntrinioError::Config(e.to_string()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
                .map_err(|e| IntrinioError::Config(e.to_string()))?;
        }
        Ok(())
    }
}

impl CredentialStore for ConfigStore {
    fn is_configured(&self) -> bool {
        self.credentials().is_complete()
    }

    fn save(&self, username: &str, password: &str) -> IntrinioResult<()> {
        let mut updated = self.credentials();
        updated.username = username.to_string();
        updated.password = password.to_string();
        self.persist(&updated)?;
        *self
            .credentials
            .write()
            .unwrap_or_else(PoisonError::into_inner) = updated;
        Ok(())
    }
}

fn read_credentials(path: &Path) -> Result<Credentials, String> {
    let text = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
    let mut credentials: Credentials = serde_json::from_str(&text).map_err(|e| e.to_string())?;
    if credentials.cacerts.as_deref().is_some_and(str::is_empty) {
        credentials.cacerts = None;
    }
    Ok(credentials)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_unconfigured() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::load(dir.path().join("intrinio.conf"));
        assert!(!store.is_configured());
        assert_eq!(store.credentials(), Credentials::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("intrinio.conf");
        let store = ConfigStore::load(&path);
        store.save("analyst", "s3cret").unwrap();
        assert!(store.is_configured());

        let reloaded = ConfigStore::load(&path);
        assert_eq!(reloaded.credentials(), Credentials::new("analyst", "s3cret"));
    }

    #[cfg(unix)]
    #[test]
    fn test_saved_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("intrinio.conf");
        ConfigStore::load(&path).save("u", "p").unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_reads_legacy_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("intrinio.conf");
        std::fs::write(&path, r#"{"user": "abc", "password": "xyz", "certifi": ""}"#).unwrap();
        let store = ConfigStore::load(&path);
        assert_eq!(store.credentials(), Credentials::new("abc", "xyz"));
    }

    #[test]
    fn test_masked_user() {
        let store = ConfigStore::in_memory(Credentials::new("abcdef", "pw"));
        assert_eq!(store.masked_user(), "abc***");
        let store = ConfigStore::in_memory(Credentials::new("abcde", "pw"));
        assert_eq!(store.masked_user(), "ab**");
    }

    #[test]
    fn test_blank_password_is_unconfigured() {
        let store = ConfigStore::in_memory(Credentials::new("abc", ""));
        assert!(!store.is_configured());
    }
}
