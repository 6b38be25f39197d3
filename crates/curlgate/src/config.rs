//! Agent configuration: the secure key and listen port.
//!
//! Persisted as pretty JSON. A missing file is created on first start with a
//! fresh random key. The running server receives the key as an immutable
//! [`SecureKey`](crate::auth::SecureKey); rotating it with
//! [`regenerate_key`] only affects the next start.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Config file used when no path is given.
pub const DEFAULT_CONFIG_PATH: &str = "./agent_config.json";

/// Port written into newly created configs.
pub const DEFAULT_PORT: u16 = 8080;

/// Random bytes in a generated key (hex-encoded to 64 chars).
const SECURE_KEY_BYTES: usize = 32;

/// Persisted agent configuration.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Shared secret every task request must present
    pub secure_key: String,
    /// TCP port the endpoint listens on
    pub port: u16,
}

// Custom Debug masks the key so the struct is safe to log.
impl fmt::Debug for AgentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentConfig")
            .field("secure_key", &"<redacted>")
            .field("port", &self.port)
            .finish()
    }
}

/// Result of [`load_or_create`].
#[derive(Debug)]
pub struct LoadedConfig {
    /// The validated configuration
    pub config: AgentConfig,
    /// Absolute path it was read from or written to
    pub path: PathBuf,
    /// True when the file did not exist and was generated
    pub created: bool,
}

impl AgentConfig {
    /// New config with a freshly generated key and the default port.
    pub fn generate() -> Self {
        Self {
            secure_key: generate_secure_key(),
            port: DEFAULT_PORT,
        }
    }

    /// Check that the config can be served.
    pub fn validate(&self) -> Result<()> {
        if self.secure_key.is_empty() {
            return Err(Error::Config("secure key is missing".to_string()));
        }
        if self.port == 0 {
            return Err(Error::Config("invalid port: 0".to_string()));
        }
        Ok(())
    }

    /// Read and validate a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&data)
            .map_err(|e| Error::Config(format!("cannot parse {}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Write the config as pretty JSON, readable by the owner only.
    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_json::to_string_pretty(self)
            .map_err(|e| Error::Internal(format!("cannot serialize config: {e}")))?;

        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)?;
            }
        }

        write_private(path, data.as_bytes())
    }
}

/// Load the config at `path` (default [`DEFAULT_CONFIG_PATH`]), creating it if absent.
pub fn load_or_create(path: Option<&Path>) -> Result<LoadedConfig> {
    let path = absolute(path.unwrap_or(Path::new(DEFAULT_CONFIG_PATH)))?;

    if !path.exists() {
        let config = AgentConfig::generate();
        config.save(&path)?;
        return Ok(LoadedConfig {
            config,
            path,
            created: true,
        });
    }

    let config = AgentConfig::load(&path)?;
    Ok(LoadedConfig {
        config,
        path,
        created: false,
    })
}

/// Replace the persisted key with a new one and return it.
///
/// Offline operation: a server already running keeps its old key.
pub fn regenerate_key(path: Option<&Path>) -> Result<String> {
    let LoadedConfig {
        mut config, path, ..
    } = load_or_create(path)?;
    config.secure_key = generate_secure_key();
    config.save(&path)?;
    Ok(config.secure_key)
}

/// Generates a cryptographically random key (64 hex chars = 32 bytes).
pub fn generate_secure_key() -> String {
    let buf: [u8; SECURE_KEY_BYTES] = rand::random();
    hex::encode(buf)
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

#[cfg(unix)]
fn write_private(path: &Path, data: &[u8]) -> Result<()> {
    use std::io::Write;
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    // mode() only applies on creation; tighten pre-existing files too
    file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    file.write_all(data)?;
    Ok(())
}

#[cfg(not(unix))]
fn write_private(path: &Path, data: &[u8]) -> Result<()> {
    std::fs::write(path, data)?;
    Ok(())
}
