//! Keychain creation, encryption and blob lifecycle

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::crypto::keys::{all_factories, KeyFactory, Network, SeedSize};
use crate::crypto::mnemonic::{
    generate_mnemonic, mnemonic_to_seed, validate_mnemonic, Language, MnemonicStrength,
};
use crate::error::{Error, Result};
use crate::keychain::Keychain;
use crate::store::{crypt, data};

/// The recovered human-facing origin of a keychain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MnemonicInfo {
    pub mnemonic: String,
    pub language: Language,
}

/// Entry point: creates keychains and manages their encrypted blobs
///
/// All operations are synchronous and CPU-bound; the password-based key
/// derivation inside blob encryption and decryption is deliberately slow.
/// The manager itself holds no secrets and is freely shareable between
/// threads.
pub struct KeychainManager {
    factories: HashMap<Network, Box<dyn KeyFactory>>,
    seed_range: SeedSize,
}

impl KeychainManager {
    /// Manager over every network compiled into this build
    pub fn new() -> Result<Self> {
        Self::with_factory_objs(all_factories())
    }

    /// Manager over a subset of the built-in networks
    ///
    /// Useful to create blobs that a later [`add_network`] on a fuller
    /// manager extends.
    ///
    /// [`add_network`]: KeychainManager::add_network
    pub fn with_networks(networks: &[Network]) -> Result<Self> {
        let filtered = all_factories()
            .into_iter()
            .filter(|factory| networks.contains(&factory.network()))
            .collect();
        Self::with_factory_objs(filtered)
    }

    /// Whether this build (and manager instance) supports a network at
    /// all, independent of any particular blob
    pub fn has_network(&self, network: Network) -> bool {
        self.factories.contains_key(&network)
    }

    /// Generate a fresh 12-word mnemonic in the requested language
    pub fn generate_mnemonic(&self, language: Option<Language>) -> Result<String> {
        generate_mnemonic(MnemonicStrength::Words12, language.unwrap_or_default())
    }

    /// Build an encrypted keychain blob from a raw seed
    ///
    /// The blob starts populated with key material for every network
    /// this manager holds. The seed itself is stored (encrypted) so
    /// networks can be added later without re-entering the secret; no
    /// mnemonic is recorded.
    pub fn keychain_data_from_seed(&self, seed: &[u8], password: &str) -> Result<Vec<u8>> {
        if seed.len() < self.seed_range.min || seed.len() > self.seed_range.max {
            return Err(Error::InvalidSeedSize(
                seed.len(),
                self.seed_range.min,
                self.seed_range.max,
            ));
        }
        self.build_blob(seed, None, None, password)
    }

    /// Build an encrypted keychain blob from a mnemonic phrase
    ///
    /// The phrase and its language are embedded in the blob so
    /// [`retrieve_mnemonic`] can return them verbatim later.
    ///
    /// [`retrieve_mnemonic`]: KeychainManager::retrieve_mnemonic
    pub fn keychain_data_from_mnemonic(
        &self,
        mnemonic: &str,
        password: &str,
        language: Option<Language>,
    ) -> Result<Vec<u8>> {
        let language = language.unwrap_or_default();
        validate_mnemonic(mnemonic, language)?;
        let seed = mnemonic_to_seed(mnemonic, None, language)?;
        self.build_blob(&seed, Some(mnemonic), Some(language), password)
    }

    /// Decrypt a blob and reconstitute the keychain
    ///
    /// Wrong password and corrupted data fail identically. Networks
    /// stored in the blob but unknown to this manager are skipped.
    pub fn keychain_from_data(&self, blob: &[u8], password: &str) -> Result<Keychain> {
        let wallet = self.open(blob, password)?;

        let mut keys = Vec::with_capacity(wallet.keys.len());
        for (network, key_data) in wallet.keys.iter() {
            match self.factories.get(network) {
                Some(factory) => keys.push(factory.key_from_data(key_data)?),
                None => {
                    warn!(network = %network, "no factory for stored network, skipping");
                }
            }
        }
        debug!(networks = keys.len(), "keychain decrypted");
        Ok(Keychain::new(keys))
    }

    /// Derive and insert key material for one more network, returning a
    /// new blob encrypted under the same password
    ///
    /// Pre-existing networks' key data is carried over byte-for-byte.
    /// Fails if the network is unsupported, already present, or the blob
    /// carries no seed to derive from.
    pub fn add_network(&self, blob: &[u8], password: &str, network: Network) -> Result<Vec<u8>> {
        let factory = self
            .factories
            .get(&network)
            .ok_or(Error::UnsupportedNetwork(network))?;

        let mut wallet = self.open(blob, password)?;
        if wallet.keys.contains_key(&network) {
            return Err(Error::NetworkAlreadyPresent(network));
        }
        let seed = wallet.seed.as_deref().ok_or(Error::SeedUnavailable)?;

        let key_data = factory.key_data_from_seed(seed)?;
        wallet.keys.insert(network, key_data.to_vec());
        debug!(network = %network, "network added to keychain data");

        self.seal(&wallet, password)
    }

    /// Re-encrypt a blob under a new password; key material is untouched
    pub fn change_password(
        &self,
        blob: &[u8],
        old_password: &str,
        new_password: &str,
    ) -> Result<Vec<u8>> {
        let plaintext = crypt::decrypt(blob, old_password)?;
        crypt::encrypt(&plaintext, new_password)
    }

    /// Export the raw per-network root key data after authenticating
    pub fn get_keys_data(&self, blob: &[u8], password: &str) -> Result<Vec<(Network, Vec<u8>)>> {
        let mut wallet = self.open(blob, password)?;
        Ok(wallet.keys.drain().collect())
    }

    /// Recover the mnemonic phrase and language a blob was created from
    ///
    /// This works because the phrase is persisted alongside the derived
    /// keys, not reconstructed from them; seed-only blobs fail with
    /// [`Error::MnemonicUnavailable`].
    pub fn retrieve_mnemonic(&self, blob: &[u8], password: &str) -> Result<MnemonicInfo> {
        let wallet = self.open(blob, password)?;
        match (&wallet.mnemonic, wallet.language) {
            (Some(mnemonic), Some(language)) => Ok(MnemonicInfo {
                mnemonic: mnemonic.clone(),
                language,
            }),
            _ => Err(Error::MnemonicUnavailable),
        }
    }
}

// Private methods
impl KeychainManager {
    fn with_factory_objs(factories: Vec<Box<dyn KeyFactory>>) -> Result<Self> {
        let seed_range = Self::seed_range(&factories)?;
        let factories: HashMap<Network, Box<dyn KeyFactory>> = factories
            .into_iter()
            .map(|factory| (factory.network(), factory))
            .collect();
        Ok(Self {
            factories,
            seed_range,
        })
    }

    /// Intersect all factories' accepted seed lengths
    fn seed_range(factories: &[Box<dyn KeyFactory>]) -> Result<SeedSize> {
        let mut min = 0usize;
        let mut max = usize::MAX;
        for factory in factories {
            let size = factory.seed_size();
            min = min.max(size.min);
            max = max.min(size.max);
        }
        if min == 0 || max < min {
            return Err(Error::InvalidSeedSize(0, min, max));
        }
        Ok(SeedSize { min, max })
    }

    fn open(&self, blob: &[u8], password: &str) -> Result<data::WalletData> {
        let plaintext = crypt::decrypt(blob, password)?;
        data::from_bytes(&plaintext)
    }

    fn seal(&self, wallet: &data::WalletData, password: &str) -> Result<Vec<u8>> {
        let plaintext = data::to_bytes(wallet)?;
        crypt::encrypt(&plaintext, password)
    }

    fn build_blob(
        &self,
        seed: &[u8],
        mnemonic: Option<&str>,
        language: Option<Language>,
        password: &str,
    ) -> Result<Vec<u8>> {
        let mut keys: HashMap<Network, Vec<u8>> = HashMap::new();
        for (network, factory) in self.factories.iter() {
            let key_data = factory.key_data_from_seed(seed)?;
            keys.insert(*network, key_data.to_vec());
        }

        let wallet = data::WalletData {
            seed: Some(seed.to_vec()),
            mnemonic: mnemonic.map(|phrase| phrase.to_string()),
            language,
            keys,
        };
        debug!(networks = wallet.keys.len(), "keychain data created");
        self.seal(&wallet, password)
    }
}
