//! The encrypted, portable blob format
//!
//! A blob is `crypt`'s authenticated envelope around `data`'s versioned
//! plaintext payload. Blobs are only ever produced whole; no operation
//! mutates one in place.

pub mod crypt;
pub mod data;
