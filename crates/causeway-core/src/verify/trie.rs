use std::collections::HashMap;

use crate::codec::{self, Item};
use crate::hash::keccak256;
use crate::types::proof::TrieProof;

/// Number of children in a branch node, plus one value slot.
const BRANCH_ITEMS: usize = 17;

/// Verify that (key, proof.value) is present in a Merkle-Patricia trie
/// with the given root digest.
///
/// Every step treats the proof as adversarial: each node's digest is
/// recomputed from its own bytes before it is trusted as the root or as a
/// referenced child — a claimed digest is never taken at face value. The
/// walk succeeds only when the key is fully consumed at a terminal node
/// whose stored value equals `proof.value` byte for byte.
///
/// Returns false (never an error) on any structural mismatch: a missing
/// referenced node, a malformed node, a diverging path, dangling key
/// nibbles, or a value mismatch. Used identically for the transaction
/// trie and the receipt trie.
pub fn verify_trie_proof(root: &[u8; 32], key: &[u8], proof: &TrieProof) -> bool {
    walk(root, key, proof).is_ok()
}

/// Why a walk stopped. Internal only — the public contract is boolean.
#[derive(Debug)]
enum WalkFailure {
    /// A referenced node digest has no matching node in the supplied set.
    MissingNode,
    /// A node failed to decode or has an impossible shape.
    Malformed,
    /// The key diverges from the path stored in the trie.
    PathMismatch,
    /// The terminal value does not equal the claimed value.
    ValueMismatch,
}

fn walk(root: &[u8; 32], key: &[u8], proof: &TrieProof) -> Result<(), WalkFailure> {
    if proof.nodes.is_empty() {
        return Err(WalkFailure::MissingNode);
    }

    // Index every supplied node by the digest of its own bytes
    let mut by_digest: HashMap<[u8; 32], &[u8]> = HashMap::with_capacity(proof.nodes.len());
    for node in &proof.nodes {
        by_digest.insert(keccak256(node), node.as_slice());
    }

    let nibbles = to_nibbles(key);
    let mut consumed = 0usize;

    let root_bytes = by_digest.get(root).copied().ok_or(WalkFailure::MissingNode)?;
    let mut current = decode_node(root_bytes)?;

    loop {
        let items = match current {
            Item::List(items) => items,
            Item::Bytes(_) => return Err(WalkFailure::Malformed),
        };

        match items.len() {
            BRANCH_ITEMS => {
                if consumed == nibbles.len() {
                    // Key ends at this branch: the value lives in slot 16
                    return check_value(&items[16], &proof.value);
                }
                let child_index = nibbles[consumed] as usize;
                consumed += 1;
                current = resolve_child(items[child_index].clone(), &by_digest)?;
            }
            2 => {
                let path_bytes = items[0].as_bytes().ok_or(WalkFailure::Malformed)?;
                let (path, is_leaf) = decode_compact_path(path_bytes)?;
                let remaining = &nibbles[consumed..];

                if is_leaf {
                    if remaining != path.as_slice() {
                        return Err(WalkFailure::PathMismatch);
                    }
                    return check_value(&items[1], &proof.value);
                }

                // Extension: consume the shared prefix, follow the child
                if path.is_empty() || !remaining.starts_with(&path) {
                    return Err(WalkFailure::PathMismatch);
                }
                consumed += path.len();
                current = resolve_child(items[1].clone(), &by_digest)?;
            }
            _ => return Err(WalkFailure::Malformed),
        }
    }
}

/// Follow a child reference. A 32-byte string is a digest to look up among
/// the supplied nodes (recomputed, never trusted); a nested list is a node
/// short enough (< 32 encoded bytes) to be embedded inline; anything else
/// — including the empty string marking an absent child — ends the walk.
fn resolve_child(
    child: Item,
    by_digest: &HashMap<[u8; 32], &[u8]>,
) -> Result<Item, WalkFailure> {
    match child {
        Item::Bytes(bytes) => {
            if bytes.len() != 32 {
                return Err(WalkFailure::PathMismatch);
            }
            let mut digest = [0u8; 32];
            digest.copy_from_slice(&bytes);
            let node = by_digest.get(&digest).copied().ok_or(WalkFailure::MissingNode)?;
            decode_node(node)
        }
        Item::List(_) => Ok(child),
    }
}

fn decode_node(bytes: &[u8]) -> Result<Item, WalkFailure> {
    codec::decode(bytes).map_err(|_| WalkFailure::Malformed)
}

fn check_value(stored: &Item, claimed: &[u8]) -> Result<(), WalkFailure> {
    let stored = stored.as_bytes().ok_or(WalkFailure::Malformed)?;
    if stored.is_empty() {
        return Err(WalkFailure::PathMismatch);
    }
    if stored == claimed {
        Ok(())
    } else {
        Err(WalkFailure::ValueMismatch)
    }
}

/// Split a key into 4-bit nibbles, high nibble first.
fn to_nibbles(key: &[u8]) -> Vec<u8> {
    let mut nibbles = Vec::with_capacity(key.len() * 2);
    for &byte in key {
        nibbles.push(byte >> 4);
        nibbles.push(byte & 0x0f);
    }
    nibbles
}

/// Decode the hex-prefix compact encoding used for extension and leaf
/// paths. Returns (nibbles, is_leaf). Flag nibbles above 3 and even-length
/// paths with a dirty padding nibble are rejected.
fn decode_compact_path(encoded: &[u8]) -> Result<(Vec<u8>, bool), WalkFailure> {
    let first = *encoded.first().ok_or(WalkFailure::Malformed)?;
    let flag = first >> 4;
    if flag > 3 {
        return Err(WalkFailure::Malformed);
    }
    let is_leaf = flag >= 2;
    let is_odd = flag & 1 == 1;

    let mut nibbles = Vec::with_capacity(encoded.len() * 2);
    if is_odd {
        nibbles.push(first & 0x0f);
    } else if first & 0x0f != 0 {
        return Err(WalkFailure::Malformed);
    }
    for &byte in &encoded[1..] {
        nibbles.push(byte >> 4);
        nibbles.push(byte & 0x0f);
    }
    Ok((nibbles, is_leaf))
}
