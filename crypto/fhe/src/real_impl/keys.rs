//! FHE Key Management with Real TFHE-rs
//!
//! - ClientKey: encryption and decryption (held by the coprocessor's oracle)
//! - ServerKey: homomorphic operations (used for every add/sub)

use std::cell::Cell;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::{FHEConfig, FHEError, FHEResult};
use tfhe::{ConfigBuilder, generate_keys};
use tfhe::{ClientKey as TfheClientKey, ServerKey as TfheServerKey};

/// Process-unique key ids, so each thread installs a given server key once
static NEXT_KEY_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static INSTALLED_SERVER_KEY: Cell<u64> = const { Cell::new(0) };
}

/// Make `key` the server key of the current thread.
///
/// TFHE-rs resolves operators against a thread-local server key; installing
/// is skipped when this thread already runs with `key`.
pub fn install_server_key(key: &ServerKey) {
    INSTALLED_SERVER_KEY.with(|installed| {
        if installed.get() != key.key_id {
            tfhe::set_server_key(key.inner.clone());
            installed.set(key.key_id);
        }
    });
}

fn config_hash(config: &FHEConfig) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&config.security_bits.to_le_bytes());
    hasher.update(&[config.multi_threaded as u8]);
    *hasher.finalize().as_bytes()
}

/// Client key for encryption and decryption
#[derive(Clone)]
pub struct ClientKey {
    /// Inner TFHE-rs client key
    pub(crate) inner: TfheClientKey,
    /// Configuration hash for versioning
    config_hash: [u8; 32],
}

impl ClientKey {
    /// Get reference to inner TFHE key
    pub fn inner(&self) -> &TfheClientKey {
        &self.inner
    }

    /// Derive a server key from this client key
    pub fn derive_server_key(&self) -> ServerKey {
        ServerKey {
            inner: TfheServerKey::new(&self.inner),
            config_hash: self.config_hash,
            key_id: NEXT_KEY_ID.fetch_add(1, Ordering::Relaxed),
        }
    }
}

impl std::fmt::Debug for ClientKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientKey")
            .field("config_hash", &hex::encode(&self.config_hash[..8]))
            .finish()
    }
}

/// Server key for homomorphic operations
#[derive(Clone)]
pub struct ServerKey {
    /// Inner TFHE-rs server key
    pub(crate) inner: TfheServerKey,
    /// Configuration hash
    config_hash: [u8; 32],
    key_id: u64,
}

impl ServerKey {
    /// Verify this key matches the expected configuration
    pub fn verify_config(&self, config: &FHEConfig) -> bool {
        config_hash(config) == self.config_hash
    }
}

impl std::fmt::Debug for ServerKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerKey")
            .field("config_hash", &hex::encode(&self.config_hash[..8]))
            .field("key_id", &self.key_id)
            .finish()
    }
}

/// Client and server key generated together
#[derive(Clone)]
pub struct KeyPair {
    /// Client key (secret)
    pub client: ClientKey,
    /// Server key (shared with compute nodes)
    pub server: ServerKey,
}

impl KeyPair {
    /// Generate a new key pair
    ///
    /// WARNING: Key generation is slow (seconds)
    pub fn generate(config: &FHEConfig) -> FHEResult<Self> {
        if config.security_bits < 128 {
            return Err(FHEError::ConfigError(format!(
                "TFHE backend requires at least 128-bit security, got {}",
                config.security_bits
            )));
        }

        let (client_key, server_key) = generate_keys(ConfigBuilder::default().build());
        let config_hash = config_hash(config);

        Ok(Self {
            client: ClientKey {
                inner: client_key,
                config_hash,
            },
            server: ServerKey {
                inner: server_key,
                config_hash,
                key_id: NEXT_KEY_ID.fetch_add(1, Ordering::Relaxed),
            },
        })
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("server", &self.server)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_generation() {
        let config = FHEConfig::default();
        let keypair = KeyPair::generate(&config).unwrap();

        assert!(keypair.server.verify_config(&config));
    }

    #[test]
    fn test_low_security_rejected() {
        let config = FHEConfig { security_bits: 80, ..FHEConfig::default() };
        assert!(matches!(KeyPair::generate(&config), Err(FHEError::ConfigError(_))));
    }

    #[test]
    fn test_derived_server_key_gets_own_id() {
        let keypair = KeyPair::generate(&FHEConfig::default()).unwrap();
        let derived = keypair.client.derive_server_key();
        assert_ne!(derived.key_id, keypair.server.key_id);
        assert!(derived.verify_config(&FHEConfig::default()));
    }
}
