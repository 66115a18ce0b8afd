pub mod bundle;
pub mod checkpoint;
pub mod event;
pub mod trie;
