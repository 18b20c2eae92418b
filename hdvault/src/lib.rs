//! HDVault - Multi-network HD keychain core
//!
//! This library derives, stores (encrypted) and uses signing keys for
//! multiple blockchain networks from one root secret: mnemonic and seed
//! handling, per-network hierarchical-deterministic key derivation
//! (secp256k1 and ed25519 extended keys), signing/verification of raw
//! byte payloads, and a password-encrypted portable keychain blob.
//!
//! Network communication, transaction construction and fee handling are
//! out of scope; the crate only produces and consumes raw bytes.

pub mod error;
pub mod crypto;
pub mod keychain;
pub mod store;

// Re-export commonly used types for convenience
pub use error::{Error, Result};

pub use crypto::keys::Network;
pub use crypto::mnemonic::{Language, MnemonicStrength};
pub use crypto::path::{GenericKeyPath, KeyPath};
pub use keychain::manager::{KeychainManager, MnemonicInfo};
pub use keychain::Keychain;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
