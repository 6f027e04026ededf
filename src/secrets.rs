//! Password storage using the OS keyring.
//!
//! Connection passwords can be kept out of the config file by storing them in
//! the keyring under `user@endpoint`. They are looked up only when the config
//! and environment do not already provide one.

use crate::config::ConnectionConfig;
use crate::error::{BridgeError, Result};
use keyring::Entry;
use tracing::{debug, warn};

const SERVICE_NAME: &str = "surreal-bridge";

/// Reads and writes connection passwords in the OS keyring.
#[derive(Debug, Clone, Default)]
pub struct SecretStorage;

impl SecretStorage {
    /// Creates a new secret storage handle.
    pub fn new() -> Self {
        Self
    }

    /// Stores a secret in the keyring.
    pub fn store(&self, key: &str, secret: &str) -> Result<()> {
        let entry = Entry::new(SERVICE_NAME, key)
            .map_err(|e| BridgeError::secret(format!("Failed to create keyring entry: {e}")))?;

        entry
            .set_password(secret)
            .map_err(|e| BridgeError::secret(format!("Failed to store secret: {e}")))
    }

    /// Retrieves a secret from the keyring.
    pub fn retrieve(&self, key: &str) -> Result<Option<String>> {
        let entry = Entry::new(SERVICE_NAME, key)
            .map_err(|e| BridgeError::secret(format!("Failed to access keyring: {e}")))?;

        match entry.get_password() {
            Ok(secret) => Ok(Some(secret)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(BridgeError::secret(format!(
                "Failed to retrieve secret: {e}"
            ))),
        }
    }

    /// Generates the keyring key for a connection's password.
    ///
    /// Returns None when the connection has no user or endpoint.
    pub fn connection_password_key(config: &ConnectionConfig) -> Option<String> {
        let user = config.username.as_deref().filter(|u| !u.is_empty())?;
        let endpoint = config.endpoint.as_deref().filter(|e| !e.is_empty())?;
        Some(format!("{user}@{endpoint}"))
    }

    /// Fills in the connection password from the keyring if none is set.
    ///
    /// A keyring failure is logged and leaves the password unset; the server
    /// then reports the authentication problem on connect.
    pub fn resolve_password(&self, config: &mut ConnectionConfig) {
        if config.password.is_some() {
            return;
        }
        let Some(key) = Self::connection_password_key(config) else {
            return;
        };

        match self.retrieve(&key) {
            Ok(Some(password)) => {
                debug!("Using keyring password for {key}");
                config.password = Some(password);
            }
            Ok(None) => debug!("No keyring password stored for {key}"),
            Err(e) => warn!("{e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ConnectionConfig {
        ConnectionConfig {
            endpoint: Some("http://localhost:8000".to_string()),
            username: Some("grafana".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_connection_password_key() {
        assert_eq!(
            SecretStorage::connection_password_key(&config()).as_deref(),
            Some("grafana@http://localhost:8000")
        );
    }

    #[test]
    fn test_connection_password_key_requires_user() {
        let mut config = config();
        config.username = None;
        assert!(SecretStorage::connection_password_key(&config).is_none());
    }

    #[test]
    fn test_resolve_password_keeps_explicit_password() {
        let mut config = config();
        config.password = Some("from-config".to_string());
        SecretStorage::new().resolve_password(&mut config);
        assert_eq!(config.password.as_deref(), Some("from-config"));
    }
}
