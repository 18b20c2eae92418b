//! Versioned plaintext payload stored inside the encrypted blob

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, Zeroizing};

use crate::crypto::keys::Network;
use crate::crypto::mnemonic::Language;
use crate::error::{Error, Result};

/// Schema version of [`WalletData`] as written by this build
pub const DATA_VERSION: u16 = 1;

/// Decrypted keychain state
///
/// The seed enables later `add_network` calls without re-entry of the
/// original secret; mnemonic and language are the persisted redundancy
/// behind `retrieve_mnemonic` (the mapping seed → mnemonic is not
/// invertible, so the phrase is stored verbatim). All secret fields are
/// zeroized on drop.
#[derive(Debug, Serialize, Deserialize)]
pub struct WalletData {
    pub seed: Option<Vec<u8>>,
    pub mnemonic: Option<String>,
    pub language: Option<Language>,
    pub keys: HashMap<Network, Vec<u8>>,
}

impl Drop for WalletData {
    fn drop(&mut self) {
        if let Some(seed) = self.seed.as_mut() {
            seed.zeroize();
        }
        if let Some(mnemonic) = self.mnemonic.as_mut() {
            mnemonic.zeroize();
        }
        for key_data in self.keys.values_mut() {
            key_data.zeroize();
        }
    }
}

/// Envelope that lets a future schema be recognized and rejected
/// instead of misparsed
#[derive(Serialize, Deserialize)]
struct VersionedData {
    version: u16,
    payload: Vec<u8>,
}

impl Drop for VersionedData {
    fn drop(&mut self) {
        self.payload.zeroize();
    }
}

/// Serialize wallet state into versioned plaintext bytes
pub fn to_bytes(data: &WalletData) -> Result<Zeroizing<Vec<u8>>> {
    let payload = bincode::serialize(data)
        .map_err(|e| Error::Serialization(e.to_string()))?;
    let versioned = VersionedData {
        version: DATA_VERSION,
        payload,
    };
    bincode::serialize(&versioned)
        .map(Zeroizing::new)
        .map_err(|e| Error::Serialization(e.to_string()))
}

/// Parse versioned plaintext bytes back into wallet state
pub fn from_bytes(bytes: &[u8]) -> Result<WalletData> {
    let versioned: VersionedData =
        bincode::deserialize(bytes).map_err(|e| Error::Serialization(e.to_string()))?;
    if versioned.version != DATA_VERSION {
        return Err(Error::UnsupportedVersion(versioned.version));
    }
    bincode::deserialize(&versioned.payload).map_err(|e| Error::Serialization(e.to_string()))
}
