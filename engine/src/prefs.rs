//! Preference storage.
//!
//! The engine never reads or writes files itself. Persistence goes through a
//! [`PreferenceStore`] injected by the host, and [`Preferences`] layers typed
//! accessors for the keys the pairing logic owns on top of it.

use crate::{error::Result, CloudId, Credential, Error, PreferenceKey, ServerAddress};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

/// Key of the local credential secret.
pub const KEY_CREDENTIAL: PreferenceKey = "auth.credential";

/// Key of the server address this installation trusts.
pub const KEY_SERVER_ADDRESS: PreferenceKey = "pairing.server-address";

/// Key of the adopted cloud id.
pub const KEY_CLOUD_ID: PreferenceKey = "pairing.cloud-id";

/// Key of the client token a server has accepted.
pub const KEY_AUTHORIZED_TOKEN: PreferenceKey = "auth.authorized-token";

/// A persistent string key-value store.
///
/// Implementations must be safe to share between tasks. Each call is an
/// independent write; no transaction spans several keys.
pub trait PreferenceStore: Send + Sync {
    /// Read a value.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value, replacing any previous one.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Delete a value. Removing an absent key succeeds.
    fn remove(&self, key: &str) -> Result<()>;
}

/// In-memory preference store.
#[derive(Debug, Default)]
pub struct MemoryPreferences {
    values: RwLock<HashMap<String, String>>,
    writes: AtomicUsize,
}

impl MemoryPreferences {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `entries`.
    pub fn with_entries<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let values = entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self {
            values: RwLock::new(values),
            writes: AtomicUsize::new(0),
        }
    }

    /// Number of `set`/`remove` calls served so far.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl PreferenceStore for MemoryPreferences {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let values = self
            .values
            .read()
            .map_err(|e| Error::preferences(key, e))?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self
            .values
            .write()
            .map_err(|e| Error::preferences(key, e))?;
        values.insert(key.to_string(), value.to_string());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut values = self
            .values
            .write()
            .map_err(|e| Error::preferences(key, e))?;
        values.remove(key);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl<T: PreferenceStore + ?Sized> PreferenceStore for Arc<T> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        (**self).remove(key)
    }
}

/// Typed view over a [`PreferenceStore`].
///
/// Cheap to clone; clones share the same underlying store.
#[derive(Clone)]
pub struct Preferences {
    store: Arc<dyn PreferenceStore>,
}

impl Preferences {
    /// Wrap a store.
    pub fn new(store: impl PreferenceStore + 'static) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    /// The local credential, if one was created.
    pub fn credential(&self) -> Result<Option<Credential>> {
        match self.store.get(KEY_CREDENTIAL)? {
            Some(hex) => Credential::from_hex(&hex).map(Some),
            None => Ok(None),
        }
    }

    pub fn set_credential(&self, credential: &Credential) -> Result<()> {
        self.store.set(KEY_CREDENTIAL, credential.as_hex())
    }

    /// The server address this installation is configured to reach.
    pub fn server_address(&self) -> Result<Option<ServerAddress>> {
        match self.store.get(KEY_SERVER_ADDRESS)? {
            Some(raw) => ServerAddress::parse(&raw)
                .map(Some)
                .map_err(|e| Error::CorruptPreference {
                    key: KEY_SERVER_ADDRESS.to_string(),
                    reason: e.to_string(),
                }),
            None => Ok(None),
        }
    }

    pub fn set_server_address(&self, address: &ServerAddress) -> Result<()> {
        self.store.set(KEY_SERVER_ADDRESS, address.as_str())
    }

    pub fn clear_server_address(&self) -> Result<()> {
        self.store.remove(KEY_SERVER_ADDRESS)
    }

    /// The adopted cloud id.
    pub fn cloud_id(&self) -> Result<Option<CloudId>> {
        self.store.get(KEY_CLOUD_ID)
    }

    /// Raw write of the cloud id. Write-once semantics live in
    /// [`CloudIdentityAdopter`](crate::CloudIdentityAdopter).
    pub fn set_cloud_id(&self, cloud_id: &str) -> Result<()> {
        self.store.set(KEY_CLOUD_ID, cloud_id)
    }

    /// The client token this server has accepted.
    pub fn authorized_token(&self) -> Result<Option<String>> {
        self.store.get(KEY_AUTHORIZED_TOKEN)
    }

    pub fn set_authorized_token(&self, token: &str) -> Result<()> {
        self.store.set(KEY_AUTHORIZED_TOKEN, token)
    }
}

impl std::fmt::Debug for Preferences {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Preferences").finish_non_exhaustive()
    }
}
