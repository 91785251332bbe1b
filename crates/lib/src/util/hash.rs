//! Content hashing for the hierarchy log.

use std::fs;
use std::io::{self, Read};
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A full 64-character SHA256 hash, lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub String);

impl std::fmt::Display for ContentHash {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Hash a file's contents, streaming it in fixed-size chunks.
pub fn hash_file(path: &Path) -> io::Result<ContentHash> {
  let mut file = fs::File::open(path)?;
  let mut hasher = Sha256::new();
  let mut buffer = [0u8; 8192];

  loop {
    let bytes_read = file.read(&mut buffer)?;
    if bytes_read == 0 {
      break;
    }
    hasher.update(&buffer[..bytes_read]);
  }

  Ok(ContentHash(hex::encode(hasher.finalize())))
}

pub fn hash_bytes(data: &[u8]) -> ContentHash {
  ContentHash(hex::encode(Sha256::digest(data)))
}
