//! Ethereum keys and derivation paths
//!
//! Account-style BIP44 paths over secp256k1 extended keys. The purpose
//! and coin levels are fixed, so the root key pre-derives them once at
//! load time; only account/change/address are walked per call.

use zeroize::Zeroizing;

use super::secp256k1::XPrv;
use super::{KeyFactory, Network, NetworkKey, SeedSize};
use crate::crypto::path::{KeyPath, PathError, BIP44_PURPOSE, BIP44_SOFT_UPPER_BOUND};
use crate::error::Result;

/// BIP44 coin type for Ethereum
pub const COIN_TYPE: u32 = 0x8000_003C;

/// An Ethereum derivation path, `m/44'/60'/...`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EthereumKeyPath {
    account: u32,
    address: u32,
}

impl EthereumKeyPath {
    /// Ledger-style path: hardened account, change and address 0
    pub fn new(account: u32) -> std::result::Result<Self, PathError> {
        if account >= BIP44_SOFT_UPPER_BOUND {
            return Err(PathError::InvalidAccount(account));
        }
        Ok(Self {
            account: account + BIP44_SOFT_UPPER_BOUND,
            address: 0,
        })
    }

    /// MetaMask-style path: account 0', index in the address slot
    pub fn new_metamask(account: u32) -> std::result::Result<Self, PathError> {
        if account >= BIP44_SOFT_UPPER_BOUND {
            return Err(PathError::InvalidAccount(account));
        }
        Ok(Self {
            account: BIP44_SOFT_UPPER_BOUND,
            address: account,
        })
    }
}

impl KeyPath for EthereumKeyPath {
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
        0
    }

    fn address(&self) -> u32 {
        self.address
    }
}

/// Root Ethereum key held by a keychain, pre-derived to `m/44'/60'`
pub struct EthereumKey {
    xprv: XPrv,
}

impl EthereumKey {
    pub fn from_data(data: &[u8]) -> Result<Self> {
        XPrv::from_data(data)
            .and_then(|key| key.derive(BIP44_PURPOSE))
            .and_then(|key| key.derive(COIN_TYPE))
            .map(|xprv| Self { xprv })
    }

    pub fn data_from_seed(seed: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        XPrv::from_seed(seed).map(|xprv| Zeroizing::new(xprv.serialize()))
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

        self.xprv
            .derive(path.account())
            .and_then(|key| key.derive(path.change()))
            .and_then(|key| key.derive(path.address()))
    }
}

impl NetworkKey for EthereumKey {
    fn network(&self) -> Network {
        Network::Ethereum
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

/// Factory registered with the manager for [`Network::Ethereum`]
pub struct EthereumKeyFactory;

impl KeyFactory for EthereumKeyFactory {
    fn network(&self) -> Network {
        Network::Ethereum
    }

    fn seed_size(&self) -> SeedSize {
        SeedSize { min: 16, max: 64 }
    }

    fn key_from_data(&self, data: &[u8]) -> Result<Box<dyn NetworkKey>> {
        EthereumKey::from_data(data).map(|key| Box::new(key) as Box<dyn NetworkKey>)
    }

    fn key_data_from_seed(&self, seed: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        EthereumKey::data_from_seed(seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::mnemonic::{mnemonic_to_seed, Language};
    use crate::crypto::path::GenericKeyPath;

    const MNEMONIC: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    fn test_key() -> EthereumKey {
        let seed = mnemonic_to_seed(MNEMONIC, None, Language::English).unwrap();
        let data = EthereumKey::data_from_seed(&seed).unwrap();
        EthereumKey::from_data(&data).unwrap()
    }

    #[test]
    fn test_path_shapes() {
        let ledger = EthereumKeyPath::new(3).unwrap();
        assert_eq!(ledger.purpose(), BIP44_PURPOSE);
        assert_eq!(ledger.coin(), COIN_TYPE);
        assert_eq!(ledger.account(), 3 + BIP44_SOFT_UPPER_BOUND);
        assert_eq!(ledger.address(), 0);

        let metamask = EthereumKeyPath::new_metamask(3).unwrap();
        assert_eq!(metamask.account(), BIP44_SOFT_UPPER_BOUND);
        assert_eq!(metamask.address(), 3);

        assert!(EthereumKeyPath::new(0x8000_0000).is_err());
    }

    #[test]
    fn test_matches_generic_path() {
        let key = test_key();
        let typed = key.pub_key(&EthereumKeyPath::new_metamask(0).unwrap()).unwrap();
        let generic: GenericKeyPath = "m/44'/60'/0'/0/0".parse().unwrap();
        assert_eq!(typed, key.pub_key(&generic).unwrap());
    }

    #[test]
    fn test_accounts_differ() {
        let key = test_key();
        let a = key.pub_key(&EthereumKeyPath::new(0).unwrap()).unwrap();
        let b = key.pub_key(&EthereumKeyPath::new(1).unwrap()).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_sign_verify_round_trip() {
        let key = test_key();
        let path = EthereumKeyPath::new(0).unwrap();

        let signature = key.sign(b"eth payload", &path).unwrap();
        assert_eq!(signature.len(), 65);
        assert!(key.verify(b"eth payload", &signature, &path).unwrap());
        assert!(!key.verify(b"eth payload2", &signature, &path).unwrap());
    }

    #[test]
    fn test_rejects_wrong_coin() {
        let key = test_key();
        let bitcoin_shaped: GenericKeyPath = "m/44'/0'/0'/0/0".parse().unwrap();
        assert!(key.pub_key(&bitcoin_shaped).is_err());
    }
}
