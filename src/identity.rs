//! Identity normalization.
//!
//! Every identity is normalized before it is looked up or stored, so
//! `ABCD-1234` and `abcd1234` address the same license record.

/// Separator stripped from identities.
pub const IDENTITY_SEPARATOR: char = '-';

/// Number of identity characters kept by [`redact`].
const REDACTED_PREFIX_LEN: usize = 8;

/// Canonical form of an identity: lower-cased, every `-` removed and
/// surrounding whitespace trimmed.
///
/// ```
/// use argus::identity::normalize;
///
/// assert_eq!(normalize("ABCD-1234-EFGH-5678"), "abcd1234efgh5678");
/// assert_eq!(normalize("abcd1234efgh5678"), "abcd1234efgh5678");
/// assert_eq!(normalize(" abcd1234 "), "abcd1234");
/// ```
pub fn normalize(identity: &str) -> String {
    let stripped: String = identity
        .to_lowercase()
        .chars()
        .filter(|c| *c != IDENTITY_SEPARATOR)
        .collect();
    stripped.trim().to_string()
}

/// Shortened identity for logs and denial responses, e.g. `abcd1234...`.
pub fn redact(identity: &str) -> String {
    let prefix: String = identity.chars().take(REDACTED_PREFIX_LEN).collect();
    format!("{prefix}...")
}
