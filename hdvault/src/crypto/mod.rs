//! Cryptographic functionality for the keychain
//!
//! This module covers mnemonic handling, derivation paths and the
//! per-network key engines.

pub mod keys;
pub mod mnemonic;
pub mod path;
