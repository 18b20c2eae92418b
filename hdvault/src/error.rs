//! Error types for the hdvault library

use thiserror::Error;

use crate::crypto::keys::Network;
use crate::crypto::path::PathError;

/// Custom error type for hdvault operations
#[derive(Error, Debug)]
pub enum Error {
    /// The mnemonic phrase failed wordlist or checksum validation
    #[error("Invalid mnemonic: {0}")]
    InvalidMnemonic(String),

    /// The seed length is outside the range the registered networks accept
    #[error("Invalid seed size {0}, accepted range: {1}..={2} bytes")]
    InvalidSeedSize(usize, usize, usize),

    /// A derivation path was malformed or had out-of-range components
    #[error("Key path error: {0}")]
    Path(#[from] PathError),

    /// Child-key derivation failed
    #[error("Key derivation error: {0}")]
    KeyDerivation(String),

    /// Message signing failed
    #[error("Signing error: {0}")]
    Signing(String),

    /// Wrong password or corrupted data; the two are intentionally
    /// indistinguishable
    #[error("Authentication failed: wrong password or corrupted data")]
    AuthenticationFailed,

    /// The blob or payload version is newer than this build understands
    #[error("Unsupported data version {0}")]
    UnsupportedVersion(u16),

    /// The keychain holds no key material for the requested network
    #[error("Network {0} is not present in this keychain")]
    NetworkNotPresent(Network),

    /// `add_network` was asked to add a network the blob already holds
    #[error("Network {0} already exists in this keychain")]
    NetworkAlreadyPresent(Network),

    /// The manager build has no factory registered for the network
    #[error("Network {0} is not supported")]
    UnsupportedNetwork(Network),

    /// The blob carries no root seed, so new networks cannot be derived
    #[error("Seed is not stored in this keychain data")]
    SeedUnavailable,

    /// The blob was created from a raw seed; no mnemonic ever existed
    #[error("Mnemonic is not stored in this keychain data")]
    MnemonicUnavailable,

    /// Payload encoding or decoding failed
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for hdvault operations
pub type Result<T> = std::result::Result<T, Error>;
