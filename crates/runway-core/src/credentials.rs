//! Static AWS credentials shared by the warehouse client and the S3 backend.

use crate::error::{Error, Result};

/// Environment variable holding the access key id.
pub const ACCESS_KEY_ID_ENV: &str = "AWS_ACCESS_KEY_ID";
/// Environment variable holding the secret access key.
pub const SECRET_ACCESS_KEY_ENV: &str = "AWS_SECRET_ACCESS_KEY";
/// Environment variable holding an optional session token.
pub const SESSION_TOKEN_ENV: &str = "AWS_SESSION_TOKEN";

/// Access key pair plus optional session token.
#[derive(Clone, PartialEq, Eq)]
pub struct AwsCredentials {
    access_key_id: String,
    secret_access_key: String,
    session_token: Option<String>,
}

impl std::fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"[REDACTED]")
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl AwsCredentials {
    /// Creates credentials from an explicit key pair.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if either half of the key pair is blank.
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: Option<String>,
    ) -> Result<Self> {
        let access_key_id = access_key_id.into();
        let secret_access_key = secret_access_key.into();
        if access_key_id.trim().is_empty() {
            return Err(Error::configuration(format!("{ACCESS_KEY_ID_ENV} must not be empty")));
        }
        if secret_access_key.trim().is_empty() {
            return Err(Error::configuration(format!(
                "{SECRET_ACCESS_KEY_ENV} must not be empty"
            )));
        }
        Ok(Self {
            access_key_id,
            secret_access_key,
            session_token: session_token.filter(|t| !t.trim().is_empty()),
        })
    }

    /// Loads credentials from `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY` and
    /// optionally `AWS_SESSION_TOKEN`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] naming the first missing variable.
    pub fn from_env() -> Result<Self> {
        let access_key_id = required_env(ACCESS_KEY_ID_ENV)?;
        let secret_access_key = required_env(SECRET_ACCESS_KEY_ENV)?;
        Self::new(access_key_id, secret_access_key, env_string(SESSION_TOKEN_ENV))
    }

    /// Returns the access key id.
    #[must_use]
    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    /// Returns the secret access key.
    #[must_use]
    pub fn secret_access_key(&self) -> &str {
        &self.secret_access_key
    }

    /// Returns the session token, if any.
    #[must_use]
    pub fn session_token(&self) -> Option<&str> {
        self.session_token.as_deref()
    }
}

/// Reads a trimmed, non-empty environment variable.
#[must_use]
pub fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Reads a required environment variable.
///
/// # Errors
///
/// Returns [`Error::Configuration`] when the variable is unset or blank.
pub fn required_env(name: &str) -> Result<String> {
    env_string(name)
        .ok_or_else(|| Error::configuration(format!("{name} is required but not set")))
}
