//! Per-network key engines
//!
//! Each network module contributes a [`KeyFactory`] that turns a root
//! seed into storable key data and key data back into a usable
//! [`NetworkKey`]. The manager and keychain only ever speak to these
//! traits.

use std::fmt;

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::crypto::path::KeyPath;
use crate::error::Result;

#[cfg(feature = "bitcoin")]
pub mod bitcoin;
#[cfg(feature = "cardano")]
pub mod cardano;
#[cfg(feature = "ethereum")]
pub mod ethereum;

#[cfg(any(feature = "bitcoin", feature = "ethereum"))]
pub mod secp256k1;

/// Identifier of a supported blockchain key scheme
///
/// The serialized form is stored inside keychain blobs; variants must
/// never be renamed or reordered. The set of variants is the versioned
/// set of networks this build knows about; whether a particular manager
/// instance can actually derive keys for one is a separate question
/// ([`crate::KeychainManager::has_network`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Network {
    Bitcoin,
    Ethereum,
    Cardano,
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Bitcoin => write!(f, "Bitcoin"),
            Network::Ethereum => write!(f, "Ethereum"),
            Network::Cardano => write!(f, "Cardano"),
        }
    }
}

/// Seed lengths (in bytes) a network accepts
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SeedSize {
    pub min: usize,
    pub max: usize,
}

/// A root key for one network, able to derive, sign and verify along a
/// derivation path
///
/// Implementations never hand out raw private key bytes; child keys are
/// derived per call and wiped when the call returns.
pub trait NetworkKey: Send {
    fn network(&self) -> Network;

    /// Derive the public key at `path`
    fn pub_key(&self, path: &dyn KeyPath) -> Result<Vec<u8>>;

    /// Derive the private key at `path`, sign `data` with the network's
    /// canonical scheme and discard the key
    fn sign(&self, data: &[u8], path: &dyn KeyPath) -> Result<Vec<u8>>;

    /// Check `signature` over `data` with the public key at `path`
    ///
    /// A mismatched or malformed signature yields `Ok(false)`, never an
    /// error.
    fn verify(&self, data: &[u8], signature: &[u8], path: &dyn KeyPath) -> Result<bool>;
}

/// Builder of [`NetworkKey`]s for one network
pub trait KeyFactory: Send + Sync {
    fn network(&self) -> Network;

    /// Seed lengths this network tolerates
    fn seed_size(&self) -> SeedSize;

    /// Reconstruct a root key from its stored byte representation
    fn key_from_data(&self, data: &[u8]) -> Result<Box<dyn NetworkKey>>;

    /// Derive the storable root-key bytes for this network from a seed
    fn key_data_from_seed(&self, seed: &[u8]) -> Result<Zeroizing<Vec<u8>>>;
}

/// All key factories compiled into this build
pub fn all_factories() -> Vec<Box<dyn KeyFactory>> {
    let mut factories: Vec<Box<dyn KeyFactory>> = Vec::new();
    #[cfg(feature = "bitcoin")]
    {
        factories.push(Box::new(bitcoin::BitcoinKeyFactory));
    }
    #[cfg(feature = "ethereum")]
    {
        factories.push(Box::new(ethereum::EthereumKeyFactory));
    }
    #[cfg(feature = "cardano")]
    {
        factories.push(Box::new(cardano::CardanoKeyFactory));
    }
    factories
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_factories_networks_are_unique() {
        let factories = all_factories();
        assert!(!factories.is_empty());

        let networks: Vec<Network> = factories.iter().map(|f| f.network()).collect();
        let mut deduped = networks.clone();
        deduped.dedup();
        assert_eq!(networks, deduped);
    }
}
