//! Physical key derivation.
//!
//! The physical key for a hierarchical address folds in the generation
//! stamp of every ancestor prefix (the root included) under the
//! address's tag-scope. Node keys are themselves chained through the
//! generations of shallower prefixes, so bumping an ancestor orphans the
//! whole descendant generation subtree: fresh node keys appear and start
//! back at the initial stamp. Deletion never walks anything.
//!
//! Flat keys consult no generations: an untagged flat key hits the
//! backend verbatim, and a tagged one is keyed under its tag-scope so
//! distinct tag sets stay distinct items.

use std::collections::BTreeSet;
use std::fmt;

use sha2::{Digest, Sha256};

use crate::backend::CacheBackend;
use crate::error::CacheError;
use crate::generation::GenerationStore;
use crate::key::path::{LogicalAddress, RESERVED_CHAR};

/// Namespace prefix for generation records. Contains the reserved
/// character, so it can never collide with a caller's flat key.
const NODE_KEY_NAMESPACE: &str = "hc!gen!";

/// Pseudo-segment for the hierarchy root, so the root carries a
/// generation of its own and `delete("|")` has something to bump.
const ROOT_LEVEL: &str = "root";

fn digest(input: &str) -> String {
    hex::encode(Sha256::digest(input.as_bytes()))
}

/// The derived, generation-dependent key used against the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PhysicalKey(String);

impl PhysicalKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PhysicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A derivation result: the physical key plus, for hierarchical
/// addresses, the generation node key of the full path (the node a
/// delete bumps).
#[derive(Debug, Clone)]
pub struct DerivedKey {
    pub physical: PhysicalKey,
    pub leaf_node: Option<String>,
}

/// Canonical tag-scope identifier: order-independent, set-equal tag sets
/// always map to the identical scope, and the empty set has a scope of
/// its own.
pub fn tag_scope_id(tags: &BTreeSet<String>) -> String {
    let mut canonical = format!("{}", tags.len());
    for tag in tags {
        canonical.push(RESERVED_CHAR);
        canonical.push_str(tag);
    }
    digest(&canonical)
}

/// Derives physical keys, lazily creating generation records along the
/// way.
pub struct KeyEncoder<B> {
    generations: GenerationStore<B>,
}

impl<B: CacheBackend> KeyEncoder<B> {
    pub fn new(generations: GenerationStore<B>) -> Self {
        Self { generations }
    }

    pub fn generations(&self) -> &GenerationStore<B> {
        &self.generations
    }

    /// Derive the physical key for an address.
    ///
    /// For every prefix length 0..=len(path), the prefix's generation is
    /// fetched (and created at 0 if absent) and folded into both the
    /// running accumulator and the node key of the next level. The
    /// result changes iff the address or any consulted generation
    /// changes.
    pub async fn derive(&self, addr: &LogicalAddress) -> Result<DerivedKey, CacheError> {
        if !addr.is_hierarchical() {
            // Tags partition flat keys too; only an untagged flat key
            // hits the backend verbatim.
            let physical = if addr.tags().is_empty() {
                PhysicalKey(addr.raw().to_string())
            } else {
                let mut keyed = tag_scope_id(addr.tags());
                keyed.push(RESERVED_CHAR);
                keyed.push_str(addr.raw());
                PhysicalKey(digest(&keyed))
            };
            return Ok(DerivedKey {
                physical,
                leaf_node: None,
            });
        }

        let mut acc = tag_scope_id(addr.tags());
        acc.push(RESERVED_CHAR);

        let mut leaf_node = None;
        let levels =
            std::iter::once(ROOT_LEVEL).chain(addr.segments().iter().map(String::as_str));
        for level in levels {
            acc.push_str(level);
            let node_key = format!("{NODE_KEY_NAMESPACE}{}", digest(&acc));
            let generation = self.generations.get(&node_key).await?;
            acc.push(RESERVED_CHAR);
            acc.push_str(&generation.to_string());
            acc.push(RESERVED_CHAR);
            leaf_node = Some(node_key);
        }

        Ok(DerivedKey {
            physical: PhysicalKey(digest(&acc)),
            leaf_node,
        })
    }
}
