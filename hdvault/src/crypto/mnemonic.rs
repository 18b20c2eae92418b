//! Mnemonic phrase generation and seed derivation

use bip39::Mnemonic;
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::error::{Error, Result};

/// BIP39 seeds are 512 bits
pub const SEED_SIZE: usize = 64;

/// Wordlist languages supported by the keychain
///
/// The numeric discriminants are part of the stored blob format and must
/// not be reordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Language {
    English = 0,
    French = 1,
    Japanese = 2,
    Korean = 3,
    ChineseSimplified = 4,
    ChineseTraditional = 5,
    Italian = 6,
    Spanish = 7,
}

impl Language {
    fn wordlist(&self) -> bip39::Language {
        match self {
            Language::English => bip39::Language::English,
            Language::French => bip39::Language::French,
            Language::Japanese => bip39::Language::Japanese,
            Language::Korean => bip39::Language::Korean,
            Language::ChineseSimplified => bip39::Language::SimplifiedChinese,
            Language::ChineseTraditional => bip39::Language::TraditionalChinese,
            Language::Italian => bip39::Language::Italian,
            Language::Spanish => bip39::Language::Spanish,
        }
    }
}

impl Default for Language {
    fn default() -> Self {
        Language::English
    }
}

/// Supported mnemonic strengths
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MnemonicStrength {
    /// 12 words (128 bits)
    Words12,
    /// 24 words (256 bits)
    Words24,
}

impl MnemonicStrength {
    /// Get entropy length in bytes
    fn entropy_bytes(&self) -> usize {
        match self {
            Self::Words12 => 16, // 128 bits = 16 bytes
            Self::Words24 => 32, // 256 bits = 32 bytes
        }
    }
}

/// Generate a new random mnemonic phrase in the requested language
pub fn generate_mnemonic(strength: MnemonicStrength, language: Language) -> Result<String> {
    let mut entropy = Zeroizing::new(vec![0u8; strength.entropy_bytes()]);
    OsRng.fill_bytes(&mut entropy);

    let mnemonic = Mnemonic::from_entropy_in(language.wordlist(), &entropy)
        .map_err(|e| Error::InvalidMnemonic(e.to_string()))?;

    Ok(mnemonic.to_string())
}

/// Validate a mnemonic phrase against a wordlist
pub fn validate_mnemonic(phrase: &str, language: Language) -> Result<()> {
    Mnemonic::parse_in_normalized(language.wordlist(), phrase)
        .map(|_| ())
        .map_err(|e| Error::InvalidMnemonic(e.to_string()))
}

/// Derive the 64-byte BIP39 seed from a mnemonic phrase and optional
/// passphrase
///
/// Deterministic: equal inputs always produce the same seed. An empty or
/// absent passphrase means "no extra secret".
pub fn mnemonic_to_seed(
    phrase: &str,
    passphrase: Option<&str>,
    language: Language,
) -> Result<Zeroizing<Vec<u8>>> {
    let mnemonic = Mnemonic::parse_in_normalized(language.wordlist(), phrase)
        .map_err(|e| Error::InvalidMnemonic(e.to_string()))?;

    let seed = Zeroizing::new(mnemonic.to_seed(passphrase.unwrap_or("")));
    Ok(Zeroizing::new(seed.to_vec()))
}
