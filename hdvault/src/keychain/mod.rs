//! The in-memory, decrypted keychain

pub mod manager;

use std::collections::HashMap;

use crate::crypto::keys::{Network, NetworkKey};
use crate::crypto::path::KeyPath;
use crate::error::{Error, Result};

/// A decrypted collection of root keys, one per active network
///
/// Created by the [`manager::KeychainManager`] from a seed, mnemonic or
/// encrypted blob. Key material is zeroized when the keychain is
/// dropped or explicitly [`wiped`](Keychain::wipe).
///
/// A `Keychain` is exclusively owned by one logical caller at a time;
/// it performs no internal locking.
pub struct Keychain {
    keys: HashMap<Network, Box<dyn NetworkKey>>,
}

impl std::fmt::Debug for Keychain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // key material is secret; expose only which networks are present
        f.debug_struct("Keychain")
            .field("networks", &self.networks())
            .finish_non_exhaustive()
    }
}

impl Keychain {
    pub(crate) fn new(keys: Vec<Box<dyn NetworkKey>>) -> Self {
        // keyed by network, so a later duplicate would replace, never coexist
        let keys: HashMap<Network, Box<dyn NetworkKey>> =
            keys.into_iter().map(|key| (key.network(), key)).collect();
        Keychain { keys }
    }

    /// Networks currently materialized in this keychain
    pub fn networks(&self) -> Vec<Network> {
        self.keys.keys().copied().collect()
    }

    /// Derive the public key at `path` under `network`'s root key
    pub fn pub_key(&self, network: Network, path: &dyn KeyPath) -> Result<Vec<u8>> {
        self.key(network)?.pub_key(path)
    }

    /// Sign `data` with the private key at `path`; the derived key is
    /// discarded as soon as the call returns
    pub fn sign(&self, network: Network, data: &[u8], path: &dyn KeyPath) -> Result<Vec<u8>> {
        self.key(network)?.sign(data, path)
    }

    /// Verify `signature` over `data` at `path`; a mismatch is
    /// `Ok(false)`, never an error
    pub fn verify(
        &self,
        network: Network,
        data: &[u8],
        signature: &[u8],
        path: &dyn KeyPath,
    ) -> Result<bool> {
        self.key(network)?.verify(data, signature, path)
    }

    /// Release all key material immediately
    ///
    /// Idempotent; dropping the keychain has the same effect. Exposed so
    /// host-language bindings can implement an explicit free call.
    pub fn wipe(&mut self) {
        self.keys.clear();
    }

    fn key(&self, network: Network) -> Result<&dyn NetworkKey> {
        self.keys
            .get(&network)
            .map(|key| key.as_ref())
            .ok_or(Error::NetworkNotPresent(network))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::all_factories;
    use crate::crypto::mnemonic::{mnemonic_to_seed, Language};
    use crate::crypto::path::GenericKeyPath;

    const MNEMONIC: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    fn test_keychain() -> Keychain {
        let seed = mnemonic_to_seed(MNEMONIC, None, Language::English).unwrap();
        let keys = all_factories()
            .iter()
            .map(|factory| {
                let data = factory.key_data_from_seed(&seed).unwrap();
                factory.key_from_data(&data).unwrap()
            })
            .collect();
        Keychain::new(keys)
    }

    #[test]
    fn test_networks_lists_all_built_in() {
        let keychain = test_keychain();
        let mut networks = keychain.networks();
        networks.sort_by_key(|n| format!("{}", n));

        #[cfg(all(feature = "bitcoin", feature = "ethereum", feature = "cardano"))]
        assert_eq!(
            networks,
            vec![Network::Bitcoin, Network::Cardano, Network::Ethereum]
        );
    }

    #[cfg(feature = "ethereum")]
    #[test]
    fn test_sign_verify_through_keychain() {
        let keychain = test_keychain();
        let path: GenericKeyPath = "m/44'/60'/0'/0/0".parse().unwrap();

        let signature = keychain.sign(Network::Ethereum, b"hello", &path).unwrap();
        assert!(keychain
            .verify(Network::Ethereum, b"hello", &signature, &path)
            .unwrap());
        assert!(!keychain
            .verify(Network::Ethereum, b"hullo", &signature, &path)
            .unwrap());
    }

    #[test]
    fn test_missing_network_is_reported() {
        let mut keychain = test_keychain();
        keychain.wipe();

        let path: GenericKeyPath = "m/44'/0'/0'/0/0".parse().unwrap();
        let err = keychain.pub_key(Network::Bitcoin, &path).unwrap_err();
        assert!(matches!(err, Error::NetworkNotPresent(Network::Bitcoin)));
    }

    #[test]
    fn test_wipe_is_idempotent() {
        let mut keychain = test_keychain();
        keychain.wipe();
        keychain.wipe();
        assert!(keychain.networks().is_empty());
    }
}
