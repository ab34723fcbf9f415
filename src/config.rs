use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{env, fmt, fs, path::Path, path::PathBuf, time::Duration};

use crate::error::AuthError;

pub const CLIENT_ID_VAR: &str = "AZURE_CLIENT_ID";
pub const CLIENT_SECRET_VAR: &str = "AZURE_CLIENT_SECRET";
pub const CONFIG_PATH_VAR: &str = "DRIVELINK_CONFIG";

#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application (client) ID from the app registration, read from `AZURE_CLIENT_ID`
    #[serde(skip)]
    pub client_id: String,
    /// Client secret value, read from `AZURE_CLIENT_SECRET`
    #[serde(skip)]
    pub client_secret: String,
    /// Must match a redirect URI registered on the app
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
    #[serde(default = "default_token_file")]
    pub token_file: PathBuf,
    /// `common` accepts both work/school and personal Microsoft accounts
    #[serde(default = "default_tenant")]
    pub tenant: String,
    #[serde(default = "default_authority_url")]
    pub authority_url: String,
    #[serde(default = "default_graph_url")]
    pub graph_url: String,
    /// 0 waits for the redirect forever
    #[serde(default = "default_redirect_timeout")]
    pub redirect_timeout_secs: u64,
    #[serde(default = "default_redirect_buffer_size")]
    pub redirect_buffer_size: usize,
    #[serde(default = "default_true")]
    pub open_browser: bool,
}

// Defaults
fn default_redirect_uri() -> String { "http://localhost:9001".to_string() }
fn default_scopes() -> Vec<String> {
    vec![
        "files.readwrite".to_string(),
        "user.read".to_string(),
        "offline_access".to_string(),
    ]
}
fn default_token_file() -> PathBuf { PathBuf::from("refresh_token.txt") }
fn default_tenant() -> String { "common".to_string() }
fn default_authority_url() -> String { "https://login.microsoftonline.com".to_string() }
fn default_graph_url() -> String { "https://graph.microsoft.com/v1.0".to_string() }
fn default_redirect_timeout() -> u64 { 300 }
fn default_redirect_buffer_size() -> usize { 1024 }
fn default_true() -> bool { true }

impl Default for Config {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: default_redirect_uri(),
            scopes: default_scopes(),
            token_file: default_token_file(),
            tenant: default_tenant(),
            authority_url: default_authority_url(),
            graph_url: default_graph_url(),
            redirect_timeout_secs: default_redirect_timeout(),
            redirect_buffer_size: default_redirect_buffer_size(),
            open_browser: true,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[redacted]")
            .field("redirect_uri", &self.redirect_uri)
            .field("scopes", &self.scopes)
            .field("token_file", &self.token_file)
            .field("tenant", &self.tenant)
            .field("authority_url", &self.authority_url)
            .field("graph_url", &self.graph_url)
            .field("redirect_timeout_secs", &self.redirect_timeout_secs)
            .field("redirect_buffer_size", &self.redirect_buffer_size)
            .field("open_browser", &self.open_browser)
            .finish()
    }
}

impl Config {
    /// Load configuration from the optional config file and the environment
    pub fn load() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let content = match Self::locate() {
            Some(path) => {
                #[cfg(unix)]
                Self::validate_file_permissions(&path)?;

                let content = fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read config file: {}", path.display()))?;
                tracing::debug!("Using config file {}", path.display());
                Some(content)
            }
            None => None,
        };

        Self::from_sources(content.as_deref(), |name| env::var(name).ok())
    }

    /// Build a config from TOML text (if any) and a variable lookup
    pub fn from_sources<F>(file: Option<&str>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match file {
            Some(content) => {
                let content = Self::substitute_env_vars(content, &lookup);
                toml::from_str::<Config>(&content).context("Failed to parse config file")?
            }
            None => Config::default(),
        };

        config.client_id = Self::require(&lookup, CLIENT_ID_VAR)?;
        config.client_secret = Self::require(&lookup, CLIENT_SECRET_VAR)?;
        config.validate()?;

        Ok(config)
    }

    fn require<F>(lookup: &F, name: &'static str) -> Result<String, AuthError>
    where
        F: Fn(&str) -> Option<String>,
    {
        lookup(name)
            .filter(|value| !value.is_empty())
            .ok_or(AuthError::MissingEnv(name))
    }

    /// Config file search order: `$DRIVELINK_CONFIG`, then the working directory, then `~/.config`
    fn locate() -> Option<PathBuf> {
        if let Ok(path) = env::var(CONFIG_PATH_VAR) {
            return Some(PathBuf::from(path));
        }

        let mut locations = vec![PathBuf::from("./drivelink.toml")];
        if let Ok(home) = env::var("HOME") {
            locations.push(Path::new(&home).join(".config/drivelink/config.toml"));
        }

        locations.into_iter().find(|path| path.exists())
    }

    /// Substitute ${VAR_NAME} with variable values
    fn substitute_env_vars<F>(content: &str, lookup: &F) -> String
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut result = String::with_capacity(content.len());
        let mut rest = content;

        while let Some(start) = rest.find("${") {
            let Some(end) = rest[start..].find('}') else {
                break;
            };
            result.push_str(&rest[..start]);
            let var_name = &rest[start + 2..start + end];
            result.push_str(&lookup(var_name).unwrap_or_default());
            rest = &rest[start + end + 1..];
        }

        result.push_str(rest);
        result
    }

    fn validate(&self) -> Result<()> {
        self.redirect_endpoint()?;

        if self.scopes.is_empty() {
            return Err(AuthError::Config("at least one scope is required".to_string()).into());
        }
        if self.redirect_buffer_size == 0 {
            return Err(AuthError::Config("redirect_buffer_size must be positive".to_string()).into());
        }
        if !self.scopes.iter().any(|s| s.eq_ignore_ascii_case("offline_access")) {
            tracing::warn!("offline_access is not requested - no refresh token will be cached");
        }

        Ok(())
    }

    /// Host and port the redirect catcher listens on
    pub fn redirect_endpoint(&self) -> Result<(String, u16), AuthError> {
        let url = url::Url::parse(&self.redirect_uri)
            .map_err(|e| AuthError::Config(format!("invalid redirect_uri {}: {}", self.redirect_uri, e)))?;

        if url.scheme() != "http" {
            return Err(AuthError::Config(format!(
                "redirect_uri {} must use http to be caught locally",
                self.redirect_uri
            )));
        }

        let host = url
            .host_str()
            .ok_or_else(|| AuthError::Config(format!("redirect_uri {} has no host", self.redirect_uri)))?;
        let port = url.port_or_known_default().unwrap_or(80);

        Ok((host.trim_matches(|c| c == '[' || c == ']').to_string(), port))
    }

    pub fn redirect_timeout(&self) -> Option<Duration> {
        match self.redirect_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn authorize_endpoint(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/authorize",
            self.authority_url.trim_end_matches('/'),
            self.tenant
        )
    }

    pub fn token_endpoint(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.authority_url.trim_end_matches('/'),
            self.tenant
        )
    }

    /// Validate config file permissions (Unix only)
    #[cfg(unix)]
    fn validate_file_permissions(path: &Path) -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let metadata = fs::metadata(path)
            .with_context(|| format!("Failed to read metadata for config file: {}", path.display()))?;
        let mode = metadata.permissions().mode();

        if mode & 0o022 != 0 {
            anyhow::bail!(
                "Config file {} is writable by group or others (mode: {:o}). Run: chmod 600 {}",
                path.display(),
                mode & 0o777,
                path.display()
            );
        }

        Ok(())
    }
}
