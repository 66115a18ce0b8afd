use crate::hash::hash_pair;
use crate::types::header::Header;
use crate::types::proof::HeaderInclusionProof;

/// Build the binary Merkle root over an ordered run of child headers.
///
/// Leaves are header digests in block order. Each level pairs
/// left-and-right with `keccak256(left ‖ right)`; an odd-length level is
/// right-padded by duplicating its last node. Both rules are pinned: any
/// alternate convention yields an incompatible root with no loud error.
///
/// Returns None for an empty header run — a checkpoint over zero blocks
/// is not representable.
pub fn build_checkpoint_root(headers: &[Header]) -> Option<[u8; 32]> {
    if headers.is_empty() {
        return None;
    }
    let mut level: Vec<[u8; 32]> = headers.iter().map(|h| h.digest()).collect();
    while level.len() > 1 {
        if level.len() % 2 == 1 {
            level.push(level[level.len() - 1]);
        }
        level = level
            .chunks(2)
            .map(|pair| hash_pair(&pair[0], &pair[1]))
            .collect();
    }
    Some(level[0])
}

/// Produce the sibling-hash path for `headers[index]`, leaf level first.
/// None if the index is outside the header run.
pub fn header_inclusion_proof(
    headers: &[Header],
    index: usize,
) -> Option<HeaderInclusionProof> {
    if index >= headers.len() {
        return None;
    }
    let mut level: Vec<[u8; 32]> = headers.iter().map(|h| h.digest()).collect();
    let mut position = index;
    let mut siblings = Vec::new();
    while level.len() > 1 {
        if level.len() % 2 == 1 {
            level.push(level[level.len() - 1]);
        }
        let sibling = if position % 2 == 0 { position + 1 } else { position - 1 };
        siblings.push(level[sibling]);
        level = level
            .chunks(2)
            .map(|pair| hash_pair(&pair[0], &pair[1]))
            .collect();
        position /= 2;
    }
    Some(HeaderInclusionProof { siblings })
}

/// Verify a single leaf's membership against a checkpoint root.
///
/// Recomputes the path from `leaf_digest` upward: at each level, bit `i`
/// of `index` decides whether the running node is the left (bit 0) or
/// right (bit 1) operand. An index outside the leaf count implied by the
/// proof depth is rejected outright.
pub fn verify_header_inclusion(
    root: &[u8; 32],
    leaf_digest: &[u8; 32],
    index: u64,
    siblings: &[[u8; 32]],
) -> bool {
    if siblings.len() >= 64 || index >> siblings.len() != 0 {
        return false;
    }
    let mut acc = *leaf_digest;
    let mut position = index;
    for sibling in siblings {
        acc = if position & 1 == 0 {
            hash_pair(&acc, sibling)
        } else {
            hash_pair(sibling, &acc)
        };
        position >>= 1;
    }
    acc == *root
}
