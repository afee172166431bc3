//! The long-lived secret a client presents to a server.

use crate::{error::Result, Error, Preferences, KEY_CREDENTIAL};
use rand::RngCore;
use std::fmt;

/// Number of random bytes in a credential.
pub const CREDENTIAL_BYTES: usize = 32;

/// A hex-encoded random secret, unique per installation.
///
/// `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Generate a fresh credential from the OS-seeded CSPRNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; CREDENTIAL_BYTES];
        rand::rng().fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    /// Load a credential from its stored hex form.
    pub fn from_hex(value: &str) -> Result<Self> {
        let corrupt = |reason: String| Error::CorruptPreference {
            key: KEY_CREDENTIAL.to_string(),
            reason,
        };

        let bytes = hex::decode(value).map_err(|e| corrupt(e.to_string()))?;
        if bytes.len() < CREDENTIAL_BYTES {
            return Err(corrupt(format!(
                "expected at least {} bytes, got {}",
                CREDENTIAL_BYTES,
                bytes.len()
            )));
        }
        Ok(Self(value.to_ascii_lowercase()))
    }

    /// The hex string sent on the wire and persisted.
    pub fn as_hex(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Credential").field(&"<redacted>").finish()
    }
}

/// Lazily creates and persists the local credential.
pub struct CredentialProvider<'a> {
    prefs: &'a Preferences,
}

impl<'a> CredentialProvider<'a> {
    pub fn new(prefs: &'a Preferences) -> Self {
        Self { prefs }
    }

    /// Return the stored credential, creating and persisting one first if
    /// none exists.
    ///
    /// Store failures propagate. A stored value that does not decode is an
    /// error, never a reason to regenerate: a new secret would silently
    /// invalidate every existing pairing.
    pub fn get_or_create(&self) -> Result<Credential> {
        if let Some(existing) = self.prefs.credential()? {
            return Ok(existing);
        }

        let credential = Credential::generate();
        self.prefs.set_credential(&credential)?;
        Ok(credential)
    }
}
