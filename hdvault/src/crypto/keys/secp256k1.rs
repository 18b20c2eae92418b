//! BIP32 extended keys on the secp256k1 curve
//!
//! Shared by the Bitcoin and Ethereum engines. Derivation follows the
//! BIP32 standard bit-for-bit so derived keys interoperate with other
//! implementations; on the (astronomically unlikely) invalid tweak the
//! next index is used, as the standard prescribes.

use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use ripemd::Ripemd160;
use secp256k1::ecdsa::Signature;
use secp256k1::{Message, PublicKey, Scalar, Secp256k1, SecretKey};
use sha2::{Digest, Sha256, Sha512};
use sha3::Keccak256;
use zeroize::Zeroize;

use crate::crypto::path::BIP44_SOFT_UPPER_BOUND;
use crate::error::{Error, Result};

const HMAC_KEY: &[u8] = b"Bitcoin seed";

/// Length of the full compact signature: r ‖ s ‖ recovery id
pub const SIGNATURE_SIZE: usize = 65;

/// Byte layout of the stored extended-key data
mod data_layout {
    pub const DEPTH_SIZE: usize = 1;
    pub const FINGERPRINT_SIZE: usize = 4;
    pub const INDEX_SIZE: usize = 4;
    pub const CHAIN_CODE_SIZE: usize = 32;
    pub const KEY_SIZE: usize = 32;
    pub const CHECKSUM_SIZE: usize = 4;

    pub const KEY_DATA_SIZE: usize =
        DEPTH_SIZE + FINGERPRINT_SIZE + INDEX_SIZE + CHAIN_CODE_SIZE + KEY_SIZE + CHECKSUM_SIZE;

    pub const DEPTH_START: usize = 0;
    pub const FINGERPRINT_START: usize = DEPTH_START + DEPTH_SIZE;
    pub const INDEX_START: usize = FINGERPRINT_START + FINGERPRINT_SIZE;
    pub const CHAIN_CODE_START: usize = INDEX_START + INDEX_SIZE;
    pub const KEY_START: usize = CHAIN_CODE_START + CHAIN_CODE_SIZE;
    pub const CHECKSUM_START: usize = KEY_START + KEY_SIZE;
}

/// Extended private key: secret key plus chain code and tree position
pub struct XPrv {
    key: SecretKey,
    chain_code: [u8; data_layout::CHAIN_CODE_SIZE],
    parent_fingerprint: [u8; data_layout::FINGERPRINT_SIZE],
    depth: u8,
    index: u32,
}

impl Drop for XPrv {
    fn drop(&mut self) {
        self.key.non_secure_erase();
        self.chain_code.zeroize();
    }
}

fn double_sha256(data: &[u8]) -> [u8; 32] {
    let first = Sha256::digest(data);
    Sha256::digest(first).into()
}

fn keccak256(data: &[u8]) -> [u8; 32] {
    Keccak256::digest(data).into()
}

fn hmac_sha512(key: &[u8], data: &[u8]) -> Result<[u8; 64]> {
    let mut mac = <Hmac<Sha512> as KeyInit>::new_from_slice(key)
        .map_err(|_| Error::KeyDerivation("HMAC error".to_string()))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().into())
}

impl XPrv {
    /// Master key from a seed, per BIP32
    pub fn from_seed(seed: &[u8]) -> Result<Self> {
        use self::data_layout::*;

        let mut entropy = hmac_sha512(HMAC_KEY, seed)?;

        let key = SecretKey::from_slice(&entropy[..KEY_SIZE])
            .map_err(|e| Error::KeyDerivation(format!("Invalid master key: {}", e)))?;
        let mut chain_code = [0u8; CHAIN_CODE_SIZE];
        chain_code.copy_from_slice(&entropy[KEY_SIZE..]);
        entropy.zeroize();

        Ok(Self {
            key,
            chain_code,
            parent_fingerprint: [0u8; FINGERPRINT_SIZE],
            depth: 0,
            index: 0,
        })
    }

    /// Reconstruct a key from its checksummed stored representation
    pub fn from_data(data: &[u8]) -> Result<Self> {
        use self::data_layout::*;

        if data.len() != KEY_DATA_SIZE {
            return Err(Error::KeyDerivation(format!(
                "Invalid key data size {}, expected {}",
                data.len(),
                KEY_DATA_SIZE
            )));
        }

        let checksum = double_sha256(&data[..CHECKSUM_START]);
        if data[CHECKSUM_START..] != checksum[..CHECKSUM_SIZE] {
            return Err(Error::KeyDerivation("Key data checksum mismatch".to_string()));
        }

        let depth = data[DEPTH_START];
        let mut parent_fingerprint = [0u8; FINGERPRINT_SIZE];
        parent_fingerprint.copy_from_slice(&data[FINGERPRINT_START..INDEX_START]);
        let mut index_bytes = [0u8; INDEX_SIZE];
        index_bytes.copy_from_slice(&data[INDEX_START..CHAIN_CODE_START]);
        let index = u32::from_be_bytes(index_bytes);
        let mut chain_code = [0u8; CHAIN_CODE_SIZE];
        chain_code.copy_from_slice(&data[CHAIN_CODE_START..KEY_START]);

        let key = SecretKey::from_slice(&data[KEY_START..CHECKSUM_START])
            .map_err(|e| Error::KeyDerivation(format!("Invalid secret key: {}", e)))?;

        Ok(Self {
            key,
            chain_code,
            parent_fingerprint,
            depth,
            index,
        })
    }

    /// Serialize with a trailing double-SHA256 checksum
    pub fn serialize(&self) -> Vec<u8> {
        use self::data_layout::*;

        let mut data = Vec::with_capacity(KEY_DATA_SIZE);
        data.push(self.depth);
        data.extend_from_slice(&self.parent_fingerprint);
        data.extend_from_slice(&self.index.to_be_bytes());
        data.extend_from_slice(&self.chain_code);
        data.extend_from_slice(&self.key.secret_bytes());

        let checksum = double_sha256(&data);
        data.extend_from_slice(&checksum[..CHECKSUM_SIZE]);
        data
    }

    pub fn public(&self) -> XPub {
        let secp = Secp256k1::new();
        XPub(PublicKey::from_secret_key(&secp, &self.key))
    }

    /// Derive one child level; hardened when `index` has the high bit set
    pub fn derive(&self, index: u32) -> Result<Self> {
        use self::data_layout::*;

        if self.depth == u8::MAX {
            return Err(Error::KeyDerivation("Derivation depth overflow".to_string()));
        }

        let hardened = index >= BIP44_SOFT_UPPER_BOUND;
        let mut input = Vec::with_capacity(KEY_SIZE + INDEX_SIZE + 1);
        if hardened {
            input.push(0x00);
            input.extend_from_slice(&self.key.secret_bytes());
        } else {
            input.extend_from_slice(&self.public().serialize_compressed());
        }
        input.extend_from_slice(&index.to_be_bytes());

        let mut entropy = hmac_sha512(&self.chain_code, &input)?;
        input.zeroize();

        let mut chain_code = [0u8; CHAIN_CODE_SIZE];
        chain_code.copy_from_slice(&entropy[KEY_SIZE..]);

        let mut tweak_bytes = [0u8; KEY_SIZE];
        tweak_bytes.copy_from_slice(&entropy[..KEY_SIZE]);
        entropy.zeroize();
        let tweak = Scalar::from_be_bytes(tweak_bytes);
        tweak_bytes.zeroize();

        let child_key = tweak
            .ok()
            .and_then(|tweak| self.key.add_tweak(&tweak).ok());

        let child_key = match child_key {
            Some(key) => key,
            None => {
                // invalid tweak, move on to the next index per BIP32
                if (hardened && index < u32::MAX) || (!hardened && index < BIP44_SOFT_UPPER_BOUND - 1)
                {
                    return self.derive(index + 1);
                }
                return Err(Error::KeyDerivation("Tweak out of range".to_string()));
            }
        };

        Ok(Self {
            key: child_key,
            chain_code,
            parent_fingerprint: self.fingerprint(),
            depth: self.depth + 1,
            index,
        })
    }

    /// Sign `data`: Keccak-256 digest, deterministic recoverable ECDSA
    pub fn sign(&self, data: &[u8]) -> Result<Vec<u8>> {
        let secp = Secp256k1::new();
        let message = Message::from_digest(keccak256(data));
        let signature = secp.sign_ecdsa_recoverable(&message, &self.key);

        let (recovery_id, compact) = signature.serialize_compact();
        let mut out = Vec::with_capacity(SIGNATURE_SIZE);
        out.extend_from_slice(&compact);
        out.push(recovery_id.to_i32() as u8);
        Ok(out)
    }

    /// RIPEMD160(SHA256(compressed pubkey)) truncated to 4 bytes
    fn fingerprint(&self) -> [u8; data_layout::FINGERPRINT_SIZE] {
        let hash = Ripemd160::digest(Sha256::digest(self.public().serialize_compressed()));
        let mut fingerprint = [0u8; data_layout::FINGERPRINT_SIZE];
        fingerprint.copy_from_slice(&hash[..data_layout::FINGERPRINT_SIZE]);
        fingerprint
    }
}

/// Public half of an extended key
pub struct XPub(PublicKey);

impl XPub {
    /// 65-byte uncompressed SEC1 encoding
    pub fn serialize(&self) -> Vec<u8> {
        self.0.serialize_uncompressed().to_vec()
    }

    pub fn serialize_compressed(&self) -> [u8; 33] {
        self.0.serialize()
    }

    /// Check a compact signature over the Keccak-256 digest of `data`
    ///
    /// Accepts 64-byte `r ‖ s` or 65-byte `r ‖ s ‖ recovery id` input; a
    /// trailing recovery byte is ignored. Anything else is a mismatch,
    /// reported as `Ok(false)`.
    pub fn verify(&self, data: &[u8], signature: &[u8]) -> Result<bool> {
        let compact = match signature.len() {
            64 => signature,
            65 => &signature[..64],
            _ => return Ok(false),
        };
        let signature = match Signature::from_compact(compact) {
            Ok(signature) => signature,
            Err(_) => return Ok(false),
        };

        let secp = Secp256k1::new();
        let message = Message::from_digest(keccak256(data));
        Ok(secp.verify_ecdsa(&message, &signature, &self.0).is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // BIP32 test vector 1
    const VECTOR_SEED: &str = "000102030405060708090a0b0c0d0e0f";

    fn vector_master() -> XPrv {
        XPrv::from_seed(&hex::decode(VECTOR_SEED).unwrap()).unwrap()
    }

    #[test]
    fn test_master_key_matches_bip32_vector_1() {
        let master = vector_master();
        assert_eq!(
            hex::encode(master.key.secret_bytes()),
            "e8f32e723decf4051aefac8e2c93c9c5b214313817cdb01a1494b917c8436b35"
        );
        assert_eq!(
            hex::encode(master.chain_code),
            "873dff81c02f525623fd1fe5167eac3a55a049de3d314bb42ee227ffed37d508"
        );
        assert_eq!(
            hex::encode(master.public().serialize_compressed()),
            "0339a36013301597daef41fbe593a02cc513d0b55527ec2df1050e2e8ff49c85c2"
        );
    }

    #[test]
    fn test_hardened_child_matches_bip32_vector_1() {
        // m/0'
        let child = vector_master().derive(BIP44_SOFT_UPPER_BOUND).unwrap();
        assert_eq!(
            hex::encode(child.key.secret_bytes()),
            "edb2e14f9ee77d26dd93b4ecede8d16ed408ce149b6cd80b0715a2d911a0afea"
        );
        assert_eq!(
            hex::encode(child.chain_code),
            "47fdacbd0f1097043b78c63c20c34ef4ed9a111d980047ad16282c7ae6236141"
        );
        assert_eq!(child.depth, 1);
        assert_eq!(child.index, BIP44_SOFT_UPPER_BOUND);
    }

    #[test]
    fn test_deep_chain_matches_bip32_vector_1() {
        // m/0'/1/2'/2/1000000000
        let key = vector_master()
            .derive(BIP44_SOFT_UPPER_BOUND)
            .and_then(|key| key.derive(1))
            .and_then(|key| key.derive(2 + BIP44_SOFT_UPPER_BOUND))
            .and_then(|key| key.derive(2))
            .and_then(|key| key.derive(1_000_000_000))
            .unwrap();
        assert_eq!(
            hex::encode(key.key.secret_bytes()),
            "471b76e389e528d6de6d816857e012c5455051cad6660850e58372a6c3e6e7c8"
        );
        assert_eq!(
            hex::encode(key.chain_code),
            "c783e67b921d2beb8f6b389cc646d7263b4145701dadd2161548a8b078e65e9e"
        );
        assert_eq!(key.depth, 5);
    }

    #[test]
    fn test_serialize_round_trip() {
        let master = vector_master();
        let data = master.serialize();
        assert_eq!(data.len(), data_layout::KEY_DATA_SIZE);

        let restored = XPrv::from_data(&data).unwrap();
        assert_eq!(restored.key, master.key);
        assert_eq!(restored.chain_code, master.chain_code);
        assert_eq!(restored.depth, master.depth);
        assert_eq!(restored.index, master.index);
    }

    #[test]
    fn test_from_data_rejects_corrupted_checksum() {
        let mut data = vector_master().serialize();
        let last = data.len() - 1;
        data[last] ^= 0xFF;
        assert!(XPrv::from_data(&data).is_err());

        // flipping a payload byte must break the checksum too
        let mut data = vector_master().serialize();
        data[10] ^= 0x01;
        assert!(XPrv::from_data(&data).is_err());
    }

    #[test]
    fn test_from_data_rejects_wrong_size() {
        assert!(XPrv::from_data(&[0u8; 10]).is_err());
    }

    #[test]
    fn test_sign_and_verify_round_trip() {
        let key = vector_master().derive(BIP44_SOFT_UPPER_BOUND).unwrap();
        let message = b"payload to sign";

        let signature = key.sign(message).unwrap();
        assert_eq!(signature.len(), SIGNATURE_SIZE);
        assert!(key.public().verify(message, &signature).unwrap());
        // r || s without the recovery byte is accepted as well
        assert!(key.public().verify(message, &signature[..64]).unwrap());
    }

    #[test]
    fn test_sign_is_deterministic() {
        let key = vector_master();
        let a = key.sign(b"message").unwrap();
        let b = key.sign(b"message").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_verify_rejects_tampering() {
        let key = vector_master();
        let mut signature = key.sign(b"message").unwrap();

        assert!(!key.public().verify(b"other message", &signature).unwrap());

        signature[3] ^= 0x40;
        assert!(!key.public().verify(b"message", &signature).unwrap());

        // garbage length is a mismatch, not an error
        assert!(!key.public().verify(b"message", &[0u8; 7]).unwrap());
    }

    #[test]
    fn test_sibling_keys_differ() {
        let master = vector_master();
        let a = master.derive(0).unwrap();
        let b = master.derive(1).unwrap();
        assert_ne!(a.key, b.key);
        assert_ne!(a.chain_code, b.chain_code);
    }
}
