pub mod string;

pub use string::SecretString;

use keyring::Entry;
use regex::Regex;
use sdk::errors::EngineError;
use std::sync::OnceLock;

/// Keychain service all kisum secrets live under
pub const SERVICE_NAME: &str = "kisum";

/// Keychain key of the OpenAI API key
pub const OPENAI_KEY_NAME: &str = "openai_api_key";

/// Environment variable checked before the keychain
pub const OPENAI_KEY_ENV: &str = "OPENAI_API_KEY";

/// SecretManager resolves provider credentials.
///
/// Lookup order for a credential:
/// 1. its environment variable
/// 2. the OS keychain (macOS Keychain, Windows Credential Manager,
///    Secret Service on Linux)
///
/// Nothing is ever prompted for. A summary run must fail fast with a
/// configuration error before any document work if the key is missing.
pub struct SecretManager {
    service_name: String,
}

/// Regex patterns for detecting common secret formats.
/// These are compiled once and reused for performance.
static SECRET_PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();

/// Patterns match:
/// - OpenAI API keys: sk-..., sk-proj-...
/// - Bearer tokens: Bearer\s+[^\s]{20,}
fn get_secret_patterns() -> &'static Vec<Regex> {
    SECRET_PATTERNS.get_or_init(|| {
        vec![
            Regex::new(r"sk-[a-zA-Z0-9\-_]{20,}").expect("Invalid OpenAI pattern"),
            Regex::new(r"Bearer\s+[^\s]{20,}").expect("Invalid Bearer pattern"),
        ]
    })
}

/// Replace anything that looks like a credential with `[REDACTED]`.
///
/// Applied to provider error text before it is logged.
///
/// ```
/// use kisum_engine::secrets::scrub_secrets;
///
/// let scrubbed = scrub_secrets("Incorrect API key provided: sk-1234567890abcdefghij");
/// assert_eq!(scrubbed, "Incorrect API key provided: [REDACTED]");
/// ```
pub fn scrub_secrets(text: &str) -> String {
    let mut result = text.to_string();

    for pattern in get_secret_patterns() {
        result = pattern.replace_all(&result, "[REDACTED]").to_string();
    }

    result
}

impl Default for SecretManager {
    fn default() -> Self {
        Self::new(SERVICE_NAME)
    }
}

impl SecretManager {
    /// Creates a new SecretManager with the given keychain service name.
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }

    /// Looks a secret up in the OS keychain.
    ///
    /// Returns `Ok(None)` when the keychain has no entry for `key`.
    ///
    /// # Errors
    /// Returns `EngineError::KeyringError` if keychain access fails
    pub fn get_secret(&self, key: &str) -> Result<Option<SecretString>, EngineError> {
        let entry = Entry::new(&self.service_name, key).map_err(|e| {
            EngineError::KeyringError(format!("Failed to create keyring entry: {}", e))
        })?;

        match entry.get_password() {
            Ok(secret) => {
                tracing::debug!("Retrieved secret '{}' from keychain", key);
                Ok(Some(SecretString::from(secret)))
            }
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(EngineError::KeyringError(format!(
                "Failed to retrieve secret '{}': {}",
                key, e
            ))),
        }
    }

    /// Resolve a credential from `env_var`, then from the keychain under `key`.
    ///
    /// Blank environment values are ignored.
    pub fn resolve(&self, env_var: &str, key: &str) -> Result<Option<SecretString>, EngineError> {
        if let Ok(value) = std::env::var(env_var) {
            if !value.trim().is_empty() {
                tracing::debug!("Using secret '{}' from environment", key);
                return Ok(Some(SecretString::from(value.trim())));
            }
        }

        self.get_secret(key)
    }

    /// The OpenAI API key
    ///
    /// # Errors
    /// `EngineError::Config` when neither `OPENAI_API_KEY` nor the keychain
    /// provides a key.
    pub fn openai_api_key(&self) -> Result<SecretString, EngineError> {
        match self.resolve(OPENAI_KEY_ENV, OPENAI_KEY_NAME) {
            Ok(Some(key)) => Ok(key),
            Ok(None) => Err(EngineError::Config(format!(
                "OpenAI API key not found. Set {} or store it in the keychain under service '{}', key '{}'",
                OPENAI_KEY_ENV, self.service_name, OPENAI_KEY_NAME
            ))),
            Err(e) => {
                tracing::debug!("Keychain unavailable: {}", e);
                Err(EngineError::Config(format!(
                    "OpenAI API key not found in {} and the keychain is unavailable",
                    OPENAI_KEY_ENV
                )))
            }
        }
    }

    /// Checks if a credential is available without failing.
    pub fn has_secret(&self, env_var: &str, key: &str) -> bool {
        matches!(self.resolve(env_var, key), Ok(Some(_)))
    }
}
