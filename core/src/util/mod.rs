mod fast_map;
mod fingerprint;

pub use fast_map::{FastHashMap, FastHashSet, fast_hash_map_new};
pub use fingerprint::content_fingerprint;
