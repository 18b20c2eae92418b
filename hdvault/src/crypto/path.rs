//! BIP44-style derivation paths
//!
//! A path is the five-level `purpose / coin / account / change / address`
//! shape. Hardened indices carry the high bit, BIP32 style. Network
//! modules provide their own path factories; this module holds the
//! shared trait and the generic textual form.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// BIP44 purpose index (hardened 44)
pub const BIP44_PURPOSE: u32 = 0x8000_002C;

/// Soft derivation indices are below this bound; hardened at or above
pub const BIP44_SOFT_UPPER_BOUND: u32 = 0x8000_0000;

/// Number of `/`-separated parts in a textual path, marker included
pub const KEY_PATH_PARTS_COUNT: usize = 6;

/// Errors from parsing or constructing derivation paths
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("Invalid parts count {0}, expected {expected}", expected = KEY_PATH_PARTS_COUNT)]
    InvalidPartsCount(usize),

    #[error("Invalid path marker '{0}', expected 'm'")]
    InvalidPathMarker(String),

    #[error("Invalid purpose {0:#x}, expected {1:#x}")]
    InvalidPurpose(u32, u32),

    #[error("Invalid coin {0:#x}, expected {1:#x}")]
    InvalidCoin(u32, u32),

    #[error("Invalid account index {0}")]
    InvalidAccount(u32),

    #[error("Invalid change index {0}, expected 0 or 1")]
    InvalidChange(u32),

    #[error("Invalid address index {0}")]
    InvalidAddress(u32),

    #[error("Component {1} at index {0} is out of range")]
    ComponentOutOfRange(usize, u32),

    #[error("Empty value at index {0}")]
    EmptyComponent(usize),

    #[error("Can't parse number at index {0}: {1}")]
    ParseError(usize, std::num::ParseIntError),
}

/// Read-only view of a five-level derivation path
///
/// Every network-specific path type exposes the same accessors, so
/// callers never need to know which network produced a path to read it.
pub trait KeyPath {
    fn purpose(&self) -> u32;
    fn coin(&self) -> u32;
    fn account(&self) -> u32;
    fn change(&self) -> u32;
    fn address(&self) -> u32;
}

/// Shared range validation for the account/change/address levels
///
/// `account` is given unhardened; the factories add the hardened bit.
pub(crate) fn check_account_levels(
    account: u32,
    change: u32,
    address: u32,
) -> Result<(), PathError> {
    if account >= BIP44_SOFT_UPPER_BOUND {
        return Err(PathError::InvalidAccount(account));
    }
    if change != 0 && change != 1 {
        return Err(PathError::InvalidChange(change));
    }
    if address >= BIP44_SOFT_UPPER_BOUND {
        return Err(PathError::InvalidAddress(address));
    }
    Ok(())
}

/// A path parsed from its textual representation, e.g. `m/44'/0'/0'/0/0`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenericKeyPath {
    purpose: u32,
    coin: u32,
    account: u32,
    change: u32,
    address: u32,
}

impl GenericKeyPath {
    fn parse_component(index: usize, s: &str) -> Result<u32, PathError> {
        if s.is_empty() {
            return Err(PathError::EmptyComponent(index));
        }
        let (digits, hardened) = match s.strip_suffix('\'') {
            Some(rest) => (rest, true),
            None => (s, false),
        };
        if digits.is_empty() {
            return Err(PathError::EmptyComponent(index));
        }
        let value = digits
            .parse::<u32>()
            .map_err(|err| PathError::ParseError(index, err))?;
        if value >= BIP44_SOFT_UPPER_BOUND {
            return Err(PathError::ComponentOutOfRange(index, value));
        }
        if hardened {
            Ok(value + BIP44_SOFT_UPPER_BOUND)
        } else {
            Ok(value)
        }
    }

    fn print_component(value: u32) -> String {
        if value >= BIP44_SOFT_UPPER_BOUND {
            format!("{}'", value - BIP44_SOFT_UPPER_BOUND)
        } else {
            value.to_string()
        }
    }
}

impl FromStr for GenericKeyPath {
    type Err = PathError;

    fn from_str(path: &str) -> Result<Self, PathError> {
        let parts: Vec<&str> = path.split('/').map(|s| s.trim()).collect();
        if parts.len() != KEY_PATH_PARTS_COUNT {
            return Err(PathError::InvalidPartsCount(parts.len()));
        }
        if parts[0] != "m" {
            return Err(PathError::InvalidPathMarker(parts[0].to_owned()));
        }

        Ok(GenericKeyPath {
            purpose: Self::parse_component(1, parts[1])?,
            coin: Self::parse_component(2, parts[2])?,
            account: Self::parse_component(3, parts[3])?,
            change: Self::parse_component(4, parts[4])?,
            address: Self::parse_component(5, parts[5])?,
        })
    }
}

impl fmt::Display for GenericKeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "m/{}/{}/{}/{}/{}",
            Self::print_component(self.purpose),
            Self::print_component(self.coin),
            Self::print_component(self.account),
            Self::print_component(self.change),
            Self::print_component(self.address),
        )
    }
}

impl KeyPath for GenericKeyPath {
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
