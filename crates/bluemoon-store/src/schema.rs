//! Column families and on-disk key encoding for `RocksDB` storage.

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// Plain values: primary records and lookup index entries, keyed by logical key.
    pub const VALUES: &str = "values";

    /// Identifier counters, keyed by counter name. Value is a big-endian `u64`.
    pub const COUNTERS: &str = "counters";

    /// Listing entries, keyed by `listing || 0x00 || score (8 bytes) || member`.
    /// Value is empty (index only).
    pub const LISTING_ENTRIES: &str = "listing_entries";

    /// Listing member scores, keyed by `listing || 0x00 || member`.
    /// Value is the encoded score, used to find an entry again for moves and removals.
    pub const LISTING_SCORES: &str = "listing_scores";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![
        cf::VALUES,
        cf::COUNTERS,
        cf::LISTING_ENTRIES,
        cf::LISTING_SCORES,
    ]
}

/// Separator between a listing name and the rest of the key.
const SEPARATOR: u8 = 0x00;

/// Prefix of every key belonging to `listing`.
#[must_use]
pub fn listing_prefix(listing: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(listing.len() + 1);
    key.extend_from_slice(listing.as_bytes());
    key.push(SEPARATOR);
    key
}

/// Encode a score so that byte order matches numeric order.
///
/// Flipping the sign bit maps `i64::MIN..=i64::MAX` onto `0..=u64::MAX` monotonically.
#[must_use]
#[allow(clippy::cast_sign_loss)]
pub fn encode_score(score: i64) -> [u8; 8] {
    ((score as u64) ^ (1 << 63)).to_be_bytes()
}

/// Decode a score written by [`encode_score`].
#[must_use]
#[allow(clippy::cast_possible_wrap)]
pub fn decode_score(bytes: [u8; 8]) -> i64 {
    (u64::from_be_bytes(bytes) ^ (1 << 63)) as i64
}

/// Entry key: `listing || 0x00 || score || member`.
#[must_use]
pub fn listing_entry_key(listing: &str, score: i64, member: &str) -> Vec<u8> {
    let mut key = listing_prefix(listing);
    key.extend_from_slice(&encode_score(score));
    key.extend_from_slice(member.as_bytes());
    key
}

/// Score key: `listing || 0x00 || member`.
#[must_use]
pub fn listing_score_key(listing: &str, member: &str) -> Vec<u8> {
    let mut key = listing_prefix(listing);
    key.extend_from_slice(member.as_bytes());
    key
}

/// Extract the member from an entry key of a listing whose prefix is `prefix_len` bytes.
///
/// Returns `None` if the key is too short or the member is not UTF-8.
#[must_use]
pub fn member_from_entry_key(key: &[u8], prefix_len: usize) -> Option<String> {
    let member = key.get(prefix_len + 8..)?;
    String::from_utf8(member.to_vec()).ok()
}

/// Extract the listing name from any listing key.
#[must_use]
pub fn listing_name_from_key(key: &[u8]) -> Option<String> {
    let end = key.iter().position(|b| *b == SEPARATOR)?;
    String::from_utf8(key[..end].to_vec()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_encoding_preserves_order() {
        let scores = [i64::MIN, -5, -1, 0, 1, 1_700_000_000_000, i64::MAX];
        let encoded: Vec<[u8; 8]> = scores.iter().map(|s| encode_score(*s)).collect();

        let mut sorted = encoded.clone();
        sorted.sort_unstable();
        assert_eq!(encoded, sorted);

        for score in scores {
            assert_eq!(decode_score(encode_score(score)), score);
        }
    }

    #[test]
    fn entry_key_layout() {
        let key = listing_entry_key("all:form", 7, "12");
        let prefix = listing_prefix("all:form");

        assert!(key.starts_with(&prefix));
        assert_eq!(member_from_entry_key(&key, prefix.len()).as_deref(), Some("12"));
        assert_eq!(listing_name_from_key(&key).as_deref(), Some("all:form"));
    }
}
