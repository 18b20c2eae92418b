//! Bitcoin keys and derivation paths
//!
//! BIP44/49/84 account paths over BIP32 secp256k1 extended keys. All
//! five path levels are derived per call because the purpose and coin
//! levels vary (legacy/wrapped/native segwit, mainnet/testnet).

use zeroize::Zeroizing;

use super::secp256k1::XPrv;
use super::{KeyFactory, Network, NetworkKey, SeedSize};
use crate::crypto::path::{check_account_levels, KeyPath, PathError, BIP44_PURPOSE, BIP44_SOFT_UPPER_BOUND};
use crate::error::Result;

/// BIP44 coin type for mainnet
pub const COIN_TYPE: u32 = 0x8000_0000;

/// BIP44 coin type for testnet
pub const COIN_TYPE_TESTNET: u32 = 0x8000_0001;

/// BIP49 purpose (P2WPKH-nested-in-P2SH)
pub const BIP49_PURPOSE: u32 = 0x8000_0031;

/// BIP84 purpose (native segwit)
pub const BIP84_PURPOSE: u32 = 0x8000_0054;

/// A Bitcoin derivation path with a BIP44/49/84 purpose
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitcoinKeyPath {
    purpose: u32,
    coin: u32,
    account: u32,
    change: u32,
    address: u32,
}

impl BitcoinKeyPath {
    #[inline]
    fn coin(testnet: bool) -> u32 {
        if testnet {
            COIN_TYPE_TESTNET
        } else {
            COIN_TYPE
        }
    }

    fn with_purpose(
        purpose: u32,
        testnet: bool,
        account: u32,
        change: u32,
        address: u32,
    ) -> std::result::Result<Self, PathError> {
        check_account_levels(account, change, address)?;
        Ok(Self {
            purpose,
            coin: Self::coin(testnet),
            account: account + BIP44_SOFT_UPPER_BOUND,
            change,
            address,
        })
    }

    /// Legacy P2PKH path, `m/44'/coin'/account'/change/address`
    pub fn bip44(
        testnet: bool,
        account: u32,
        change: u32,
        address: u32,
    ) -> std::result::Result<Self, PathError> {
        Self::with_purpose(BIP44_PURPOSE, testnet, account, change, address)
    }

    /// Wrapped segwit path, `m/49'/coin'/account'/change/address`
    pub fn bip49(
        testnet: bool,
        account: u32,
        change: u32,
        address: u32,
    ) -> std::result::Result<Self, PathError> {
        Self::with_purpose(BIP49_PURPOSE, testnet, account, change, address)
    }

    /// Native segwit path, `m/84'/coin'/account'/change/address`
    pub fn bip84(
        testnet: bool,
        account: u32,
        change: u32,
        address: u32,
    ) -> std::result::Result<Self, PathError> {
        Self::with_purpose(BIP84_PURPOSE, testnet, account, change, address)
    }
}

impl KeyPath for BitcoinKeyPath {
    fn purpose(&self) -> u32 {
        self.purpose
    }

    fn coin(&self) -> u32 {
        self.coin
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

/// Root Bitcoin key held by a keychain
pub struct BitcoinKey {
    xprv: XPrv,
}

impl BitcoinKey {
    pub fn from_data(data: &[u8]) -> Result<Self> {
        XPrv::from_data(data).map(|xprv| Self { xprv })
    }

    pub fn data_from_seed(seed: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        XPrv::from_seed(seed).map(|xprv| Zeroizing::new(xprv.serialize()))
    }

    fn derive_private(&self, path: &dyn KeyPath) -> Result<XPrv> {
        if path.purpose() != BIP44_PURPOSE
            && path.purpose() != BIP49_PURPOSE
            && path.purpose() != BIP84_PURPOSE
        {
            return Err(PathError::InvalidPurpose(path.purpose(), BIP44_PURPOSE).into());
        }
        if path.coin() != COIN_TYPE && path.coin() != COIN_TYPE_TESTNET {
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

        self.xprv
            .derive(path.purpose())
            .and_then(|key| key.derive(path.coin()))
            .and_then(|key| key.derive(path.account()))
            .and_then(|key| key.derive(path.change()))
            .and_then(|key| key.derive(path.address()))
    }
}

impl NetworkKey for BitcoinKey {
    fn network(&self) -> Network {
        Network::Bitcoin
    }

    fn pub_key(&self, path: &dyn KeyPath) -> Result<Vec<u8>> {
        self.derive_private(path).map(|key| key.public().serialize())
    }

    fn sign(&self, data: &[u8], path: &dyn KeyPath) -> Result<Vec<u8>> {
        self.derive_private(path)?.sign(data)
    }

    fn verify(&self, data: &[u8], signature: &[u8], path: &dyn KeyPath) -> Result<bool> {
        self.derive_private(path)?.public().verify(data, signature)
    }
}

/// Factory registered with the manager for [`Network::Bitcoin`]
pub struct BitcoinKeyFactory;

impl KeyFactory for BitcoinKeyFactory {
    fn network(&self) -> Network {
        Network::Bitcoin
    }

    fn seed_size(&self) -> SeedSize {
        SeedSize { min: 16, max: 64 }
    }

    fn key_from_data(&self, data: &[u8]) -> Result<Box<dyn NetworkKey>> {
        BitcoinKey::from_data(data).map(|key| Box::new(key) as Box<dyn NetworkKey>)
    }

    fn key_data_from_seed(&self, seed: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        BitcoinKey::data_from_seed(seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::mnemonic::{mnemonic_to_seed, Language};

    const MNEMONIC: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    fn test_key() -> BitcoinKey {
        let seed = mnemonic_to_seed(MNEMONIC, None, Language::English).unwrap();
        let data = BitcoinKey::data_from_seed(&seed).unwrap();
        BitcoinKey::from_data(&data).unwrap()
    }

    #[test]
    fn test_path_factories() {
        let path = BitcoinKeyPath::bip44(false, 0, 0, 0).unwrap();
        assert_eq!(path.purpose(), BIP44_PURPOSE);
        assert_eq!(path.coin(), COIN_TYPE);
        assert_eq!(path.account(), BIP44_SOFT_UPPER_BOUND);

        let path = BitcoinKeyPath::bip49(true, 1, 1, 7).unwrap();
        assert_eq!(path.purpose(), BIP49_PURPOSE);
        assert_eq!(path.coin(), COIN_TYPE_TESTNET);
        assert_eq!(path.address(), 7);

        let path = BitcoinKeyPath::bip84(false, 0, 0, 0).unwrap();
        assert_eq!(path.purpose(), BIP84_PURPOSE);
    }

    #[test]
    fn test_path_rejects_out_of_range() {
        assert!(BitcoinKeyPath::bip44(false, 0x8000_0000, 0, 0).is_err());
        assert!(BitcoinKeyPath::bip44(false, 0, 2, 0).is_err());
        assert!(BitcoinKeyPath::bip44(false, 0, 0, 0x8000_0000).is_err());
    }

    #[test]
    fn test_pub_key_is_deterministic() {
        let key = test_key();
        let path = BitcoinKeyPath::bip44(true, 0, 0, 0).unwrap();

        let a = key.pub_key(&path).unwrap();
        let b = key.pub_key(&path).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 65);
        assert_eq!(a[0], 0x04);
    }

    #[test]
    fn test_mainnet_and_testnet_keys_differ() {
        let key = test_key();
        let mainnet = key
            .pub_key(&BitcoinKeyPath::bip44(false, 0, 0, 0).unwrap())
            .unwrap();
        let testnet = key
            .pub_key(&BitcoinKeyPath::bip44(true, 0, 0, 0).unwrap())
            .unwrap();
        assert_ne!(mainnet, testnet);
    }

    #[test]
    fn test_sign_verify_round_trip() {
        let key = test_key();
        let path = BitcoinKeyPath::bip84(false, 0, 0, 3).unwrap();

        let signature = key.sign(b"transfer", &path).unwrap();
        assert!(key.verify(b"transfer", &signature, &path).unwrap());
        assert!(!key.verify(b"transfer!", &signature, &path).unwrap());
    }

    #[test]
    fn test_rejects_foreign_path() {
        let key = test_key();
        // ethereum-shaped generic path has the wrong coin
        let path: crate::crypto::path::GenericKeyPath = "m/44'/60'/0'/0/0".parse().unwrap();
        assert!(key.pub_key(&path).is_err());
    }
}
