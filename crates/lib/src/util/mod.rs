//! Shared utilities.
//!
//! Content hashing, wildcard matching and test helpers.

pub mod glob;
pub mod hash;

#[cfg(test)]
pub mod testutil;
