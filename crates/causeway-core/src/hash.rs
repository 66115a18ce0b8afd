use tiny_keccak::{Hasher, Keccak};

/// Compute keccak256 hash of data — the child chain's native hash function.
///
/// Every digest in the system (header identity, trie node references,
/// checkpoint tree levels) is produced by this function. Using any other
/// hash silently breaks every proof rather than producing a loud error.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    let mut output = [0u8; 32];
    hasher.update(data);
    hasher.finalize(&mut output);
    output
}

/// Hash two 32-byte digests concatenated left-then-right.
/// This is the interior-node rule of the checkpoint tree.
pub fn hash_pair(left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
    let mut buf = [0u8; 64];
    buf[..32].copy_from_slice(left);
    buf[32..].copy_from_slice(right);
    keccak256(&buf)
}
