//! Raw key parsing.
//!
//! A key is hierarchical iff it starts with the `|` delimiter; everything
//! between delimiters is one segment. A key without a leading delimiter
//! is a flat key: a single opaque token immune to every hierarchical
//! operation, including root deletes.
//!
//! `!` is reserved for the internal key encoding and may appear in
//! neither keys nor tags.

use std::collections::BTreeSet;

use crate::error::CacheError;

/// Separates path segments in hierarchical keys.
pub const HIERARCHY_DELIMITER: char = '|';

/// Reserved for the internal encoding of node keys; rejected in input.
pub const RESERVED_CHAR: char = '!';

/// A fully parsed cache address: path segments plus tag set.
///
/// Two addresses are the same item only if their paths *and* tag sets
/// match exactly. Tags are an identity component, not a query filter:
/// `(P, {a})` and `(P, {a, b})` are entirely distinct items living in
/// entirely distinct generation namespaces.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LogicalAddress {
    raw: String,
    segments: Vec<String>,
    hierarchical: bool,
    tags: BTreeSet<String>,
}

impl LogicalAddress {
    /// Parse a raw key string and tag set into an address.
    ///
    /// Fails with [`CacheError::InvalidKey`] if the key or any tag
    /// contains the reserved encoding character, or if a tag is empty.
    pub fn parse<I, S>(raw: &str, tags: I) -> Result<Self, CacheError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if raw.contains(RESERVED_CHAR) {
            return Err(CacheError::invalid_key(
                raw,
                format!("reserved character {RESERVED_CHAR:?} in key"),
            ));
        }

        let mut tag_set = BTreeSet::new();
        for tag in tags {
            let tag = tag.as_ref();
            if tag.is_empty() {
                return Err(CacheError::invalid_key(raw, "empty tag"));
            }
            if tag.contains(RESERVED_CHAR) {
                return Err(CacheError::invalid_key(
                    raw,
                    format!("reserved character {RESERVED_CHAR:?} in tag {tag:?}"),
                ));
            }
            tag_set.insert(tag.to_string());
        }

        let hierarchical = raw.starts_with(HIERARCHY_DELIMITER);
        let segments = if !hierarchical {
            // Flat key: a single self-segment. A non-leading delimiter
            // does not make a key hierarchical.
            vec![raw.to_string()]
        } else if raw.len() == 1 {
            // The bare root addresses the hierarchy itself.
            Vec::new()
        } else {
            // Empty segments are kept: `|a|` and `|a` are different
            // addresses.
            raw[1..]
                .split(HIERARCHY_DELIMITER)
                .map(String::from)
                .collect()
        };

        Ok(Self {
            raw: raw.to_string(),
            segments,
            hierarchical,
            tags: tag_set,
        })
    }

    /// The raw key string as the caller supplied it.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Ordered path segments. Empty for the bare root; the whole raw key
    /// as a single segment for flat keys.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Whether the key had a leading delimiter.
    pub fn is_hierarchical(&self) -> bool {
        self.hierarchical
    }

    /// The tag set selecting this address's generation namespace.
    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    /// Whether this address lies at or below `prefix` within the same
    /// tag-scope. Matching is on whole segments only, so `cc` never
    /// matches `ccc`. Flat addresses descend from nothing.
    pub fn descends_from(&self, prefix: &[String], scope: &BTreeSet<String>) -> bool {
        self.hierarchical && self.tags == *scope && self.segments.starts_with(prefix)
    }
}
