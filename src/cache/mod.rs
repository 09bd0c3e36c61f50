//! The local repository: artifacts and cached metadata under a single root.

mod local;

pub use local::{CachedArtifact, LocalCache};

use sha1::{Digest, Sha1};

/// Suffix of checksum sidecar files.
pub const CHECKSUM_SUFFIX: &str = ".sha1";

/// Lowercase hex SHA-1 of `bytes`.
pub fn sha1_hex(bytes: &[u8]) -> String {
    hex::encode(Sha1::digest(bytes))
}

/// Extracts the digest from a `.sha1` sidecar.
///
/// Sidecars hold either the bare digest or `<digest>  <file name>`.
pub fn parse_checksum(contents: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(contents);
    let digest = text.split_whitespace().next()?.to_ascii_lowercase();
    (digest.len() == 40 && digest.chars().all(|c| c.is_ascii_hexdigit())).then_some(digest)
}
