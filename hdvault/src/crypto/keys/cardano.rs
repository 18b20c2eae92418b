//! Cardano keys and derivation paths
//!
//! Ed25519 extended keys (BIP32-Ed25519, derivation scheme V2). The
//! 96-byte extended private key is kept in zeroizing storage and
//! rebuilt per operation; the public key bytes out are the 64-byte
//! extended public key (key ‖ chain code), Cardano's native encoding.

use ed25519_bip32::{DerivationScheme, Signature, XPrv, SIGNATURE_SIZE, XPRV_SIZE};
use sha2::{Digest, Sha512};
use zeroize::Zeroizing;

use super::{KeyFactory, Network, NetworkKey, SeedSize};
use crate::crypto::path::{
    check_account_levels, KeyPath, PathError, BIP44_PURPOSE, BIP44_SOFT_UPPER_BOUND,
};
use crate::error::{Error, Result};

/// BIP44 coin type for Cardano (ada)
pub const COIN_TYPE: u32 = 0x8000_0717;

const D_SCHEME: DerivationScheme = DerivationScheme::V2;

/// A Cardano derivation path, `m/44'/1815'/account'/change/address`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardanoKeyPath {
    account: u32,
    change: u32,
    address: u32,
}

impl CardanoKeyPath {
    pub fn new(account: u32, change: u32, address: u32) -> std::result::Result<Self, PathError> {
        check_account_levels(account, change, address)?;
        Ok(Self {
            account: account + BIP44_SOFT_UPPER_BOUND,
            change,
            address,
        })
    }
}

impl KeyPath for CardanoKeyPath {
    fn purpose(&self) -> u32 {
        BIP44_PURPOSE
    }

    fn coin(&self) -> u32 {
        COIN_TYPE
    }

    fn account(&self) -> u32 {
        self.account
    }

    fn change(&self) -> u32 {
        self.change
    }

    fn address(&self) -> u32 {
        self.address
    }
}

/// Root Cardano key held by a keychain, pre-derived to `m/44'/1815'`
pub struct CardanoKey {
    xprv_bytes: Zeroizing<[u8; XPRV_SIZE]>,
}

impl CardanoKey {
    pub fn from_data(data: &[u8]) -> Result<Self> {
        if data.len() != XPRV_SIZE {
            return Err(Error::KeyDerivation(format!(
                "Invalid key data size {}, expected {}",
                data.len(),
                XPRV_SIZE
            )));
        }
        let mut bytes = [0u8; XPRV_SIZE];
        bytes.copy_from_slice(data);

        let xprv = XPrv::from_bytes_verified(bytes)
            .map_err(|e| Error::KeyDerivation(format!("Invalid extended key: {:?}", e)))?
            .derive(D_SCHEME, BIP44_PURPOSE)
            .derive(D_SCHEME, COIN_TYPE);

        let mut account_root = [0u8; XPRV_SIZE];
        account_root.copy_from_slice(xprv.as_ref());
        Ok(Self {
            xprv_bytes: Zeroizing::new(account_root),
        })
    }

    /// Build the storable 96-byte extended root key from a 64-byte seed
    ///
    /// SHA-512 of the first seed half, clamped for Ed25519 with the
    /// third-highest bit cleared; the second half becomes the chain code.
    pub fn data_from_seed(seed: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        if seed.len() < 64 {
            return Err(Error::KeyDerivation(format!(
                "Seed too short for extended key: {} bytes",
                seed.len()
            )));
        }

        let mut out = Zeroizing::new([0u8; XPRV_SIZE]);
        let digest = Sha512::digest(&seed[0..32]);
        out[0..64].copy_from_slice(&digest);
        out[0] &= 248;
        out[31] &= 63;
        out[31] |= 64;
        out[31] &= 0b1101_1111;
        out[64..96].copy_from_slice(&seed[32..64]);

        XPrv::from_bytes_verified(*out)
            .map_err(|e| Error::KeyDerivation(format!("Invalid extended key: {:?}", e)))
            .map(|xprv| Zeroizing::new(xprv.as_ref().to_vec()))
    }

    fn derive_private(&self, path: &dyn KeyPath) -> Result<XPrv> {
        if path.purpose() != BIP44_PURPOSE {
            return Err(PathError::InvalidPurpose(path.purpose(), BIP44_PURPOSE).into());
        }
        if path.coin() != COIN_TYPE {
            return Err(PathError::InvalidCoin(path.coin(), COIN_TYPE).into());
        }
        if path.account() < BIP44_SOFT_UPPER_BOUND {
            return Err(PathError::InvalidAccount(path.account()).into());
        }
        if path.change() != 0 && path.change() != 1 {
            return Err(PathError::InvalidChange(path.change()).into());
        }
        if path.address() >= BIP44_SOFT_UPPER_BOUND {
            return Err(PathError::InvalidAddress(path.address()).into());
        }

        let root = XPrv::from_bytes_verified(*self.xprv_bytes)
            .map_err(|e| Error::KeyDerivation(format!("Invalid extended key: {:?}", e)))?;
        Ok(root
            .derive(D_SCHEME, path.account())
            .derive(D_SCHEME, path.change())
            .derive(D_SCHEME, path.address()))
    }
}

impl NetworkKey for CardanoKey {
    fn network(&self) -> Network {
        Network::Cardano
    }

    fn pub_key(&self, path: &dyn KeyPath) -> Result<Vec<u8>> {
        self.derive_private(path)
            .map(|key| key.public().as_ref().to_vec())
    }

    fn sign(&self, data: &[u8], path: &dyn KeyPath) -> Result<Vec<u8>> {
        self.derive_private(path).map(|key| {
            let signature: Signature<Vec<u8>> = key.sign(data);
            signature.as_ref().to_vec()
        })
    }

    fn verify(&self, data: &[u8], signature: &[u8], path: &dyn KeyPath) -> Result<bool> {
        if signature.len() != SIGNATURE_SIZE {
            return Ok(false);
        }
        let mut bytes = [0u8; SIGNATURE_SIZE];
        bytes.copy_from_slice(signature);

        self.derive_private(path).map(|key| {
            let signature: Signature<Vec<u8>> = Signature::from_bytes(bytes);
            key.verify(data, &signature)
        })
    }
}

/// Factory registered with the manager for [`Network::Cardano`]
pub struct CardanoKeyFactory;

impl KeyFactory for CardanoKeyFactory {
    fn network(&self) -> Network {
        Network::Cardano
    }

    fn seed_size(&self) -> SeedSize {
        SeedSize { min: 64, max: 64 }
    }

    fn key_from_data(&self, data: &[u8]) -> Result<Box<dyn NetworkKey>> {
        CardanoKey::from_data(data).map(|key| Box::new(key) as Box<dyn NetworkKey>)
    }

    fn key_data_from_seed(&self, seed: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        CardanoKey::data_from_seed(seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::mnemonic::{mnemonic_to_seed, Language};

    const MNEMONIC: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    fn test_key() -> CardanoKey {
        let seed = mnemonic_to_seed(MNEMONIC, None, Language::English).unwrap();
        let data = CardanoKey::data_from_seed(&seed).unwrap();
        CardanoKey::from_data(&data).unwrap()
    }

    #[test]
    fn test_path_factory() {
        let path = CardanoKeyPath::new(0, 1, 9).unwrap();
        assert_eq!(path.purpose(), BIP44_PURPOSE);
        assert_eq!(path.coin(), COIN_TYPE);
        assert_eq!(path.account(), BIP44_SOFT_UPPER_BOUND);
        assert_eq!(path.change(), 1);
        assert_eq!(path.address(), 9);

        assert!(CardanoKeyPath::new(0x8000_0000, 0, 0).is_err());
        assert!(CardanoKeyPath::new(0, 3, 0).is_err());
    }

    #[test]
    fn test_data_from_seed_is_deterministic() {
        let seed = mnemonic_to_seed(MNEMONIC, None, Language::English).unwrap();
        let a = CardanoKey::data_from_seed(&seed).unwrap();
        let b = CardanoKey::data_from_seed(&seed).unwrap();
        assert_eq!(*a, *b);
        assert_eq!(a.len(), XPRV_SIZE);
    }

    #[test]
    fn test_data_from_seed_rejects_short_seed() {
        assert!(CardanoKey::data_from_seed(&[0u8; 32]).is_err());
    }

    #[test]
    fn test_pub_key_shape() {
        let key = test_key();
        let path = CardanoKeyPath::new(0, 0, 0).unwrap();
        let pub_key = key.pub_key(&path).unwrap();
        // extended public key: 32-byte key plus 32-byte chain code
        assert_eq!(pub_key.len(), 64);
    }

    #[test]
    fn test_sign_verify_round_trip() {
        let key = test_key();
        let path = CardanoKeyPath::new(0, 0, 0).unwrap();

        let signature = key.sign(b"ada payload", &path).unwrap();
        assert_eq!(signature.len(), SIGNATURE_SIZE);
        assert!(key.verify(b"ada payload", &signature, &path).unwrap());
        assert!(!key.verify(b"tampered", &signature, &path).unwrap());

        let mut tampered = signature.clone();
        tampered[10] ^= 0x01;
        assert!(!key.verify(b"ada payload", &tampered, &path).unwrap());

        // wrong length is a mismatch, not an error
        assert!(!key.verify(b"ada payload", &signature[..32], &path).unwrap());
    }

    #[test]
    fn test_rejects_foreign_path() {
        let key = test_key();
        let path: crate::crypto::path::GenericKeyPath = "m/44'/0'/0'/0/0".parse().unwrap();
        assert!(key.pub_key(&path).is_err());
    }
}
