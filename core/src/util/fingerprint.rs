use std::hash::Hasher;

use twox_hash::XxHash64;

/// Fast content hash used with the document version to detect stale cache entries.
pub fn content_fingerprint(content: &str) -> u64 {
    let mut hasher = XxHash64::default();
    hasher.write(content.as_bytes());
    hasher.finish()
}
