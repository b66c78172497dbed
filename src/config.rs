//! Credential store: the per-operator configuration record
//!
//! One JSON record per operator, kept in the home directory with owner-only
//! permissions. A missing file is not an error: it yields the defaults, and
//! an empty secret means the second factor has not been enrolled.

use std::fs;
use std::path::{Path, PathBuf};

use data_encoding::BASE32_NOPAD;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::error::{GateError, Result};
use crate::otp::{Algorithm, DEFAULT_DIGITS, DEFAULT_PERIOD};

/// Credential file name inside the home directory
pub const CONFIG_FILE: &str = ".shellgate.json";

/// Default total time budget for one login attempt, seconds
pub const DEFAULT_TIMEOUT: u64 = 60;

/// Default pause after a wrong code, seconds
pub const DEFAULT_DELAY: u64 = 3;

/// Per-operator settings for the login gate
///
/// Loaded once at session start and immutable for the session's lifetime.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct Config {
    /// Base32-encoded shared secret; empty until enrollment
    pub secret: String,
    /// Total time budget for one login attempt, seconds
    pub timeout: u64,
    /// Pause after a wrong code, seconds
    pub delay: u64,
    /// Accepted counters behind the current one
    pub drift_backward: u64,
    /// Accepted counters ahead of the current one
    pub drift_forward: u64,
    /// Code length in decimal digits
    pub digits: u32,
    /// Time step, seconds
    pub period: u64,
    /// HMAC hash algorithm
    pub algorithm: Algorithm,
    /// Deny logins instead of bypassing the gate when no secret is enrolled
    pub require_enrollment: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            secret: String::new(),
            timeout: DEFAULT_TIMEOUT,
            delay: DEFAULT_DELAY,
            drift_backward: 1,
            drift_forward: 1,
            digits: DEFAULT_DIGITS,
            period: DEFAULT_PERIOD,
            algorithm: Algorithm::default(),
            require_enrollment: false,
        }
    }
}

impl Config {
    /// Default credential file path, `~/.shellgate.json`
    pub fn default_path() -> Result<PathBuf> {
        dirs::home_dir()
            .map(|home| home.join(CONFIG_FILE))
            .ok_or(GateError::NoHome)
    }

    /// Load from the default path
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path()?)
    }

    /// Load from `path`; a missing file yields the defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Save to the default path
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::default_path()?)
    }

    /// Save to `path`, atomically and with owner-only permissions
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, &contents)?;
        fs::rename(&temp_path, path)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
        }

        Ok(())
    }

    /// True once a secret has been enrolled
    pub fn is_enrolled(&self) -> bool {
        !self.secret.is_empty()
    }

    /// Replace the stored secret
    pub fn set_secret(&mut self, value: impl Into<String>) {
        self.secret = value.into();
    }

    /// Remove the stored secret
    pub fn clear_secret(&mut self) {
        self.secret.clear();
    }

    /// Decode the base32 secret into raw key bytes
    ///
    /// A malformed encoding is a fatal configuration error, never retried.
    pub fn decoded_secret(&self) -> Result<Zeroizing<Vec<u8>>> {
        let normalized = self
            .secret
            .trim()
            .trim_end_matches('=')
            .to_ascii_uppercase();

        BASE32_NOPAD
            .decode(normalized.as_bytes())
            .map(Zeroizing::new)
            .map_err(|e| GateError::Secret(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::load_from(&temp_dir.path().join("absent.json")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(CONFIG_FILE);

        let mut config = Config::default();
        config.set_secret("JBSWY3DPEHPK3PXP");
        config.timeout = 90;
        config.drift_forward = 2;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(CONFIG_FILE);
        fs::write(&path, r#"{"secret": "JBSWY3DPEHPK3PXP", "window": 4}"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.secret, "JBSWY3DPEHPK3PXP");
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(CONFIG_FILE);
        fs::write(&path, "not json").unwrap();

        assert!(Config::load_from(&path).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_owner_only_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(CONFIG_FILE);
        Config::default().save_to(&path).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_set_and_clear_secret() {
        let mut config = Config::default();
        assert!(!config.is_enrolled());

        config.set_secret("JBSWY3DPEHPK3PXP");
        assert!(config.is_enrolled());

        config.clear_secret();
        assert!(!config.is_enrolled());
    }

    #[test]
    fn test_decoded_secret() {
        let mut config = Config::default();
        config.set_secret("JBSWY3DPEHPK3PXP");

        let bytes = config.decoded_secret().unwrap();
        assert_eq!(&bytes[..], b"Hello!\xde\xad\xbe\xef");
    }

    #[test]
    fn test_decoded_secret_accepts_padding_and_case() {
        let mut config = Config::default();
        config.set_secret("jbswy3dpehpk3pxp==");

        let bytes = config.decoded_secret().unwrap();
        assert_eq!(&bytes[..], b"Hello!\xde\xad\xbe\xef");
    }

    #[test]
    fn test_malformed_secret_is_an_error() {
        let mut config = Config::default();
        config.set_secret("not base32 !!!");

        assert!(matches!(
            config.decoded_secret(),
            Err(GateError::Secret(_))
        ));
    }
}
