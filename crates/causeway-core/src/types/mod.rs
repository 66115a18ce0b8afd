pub mod header;
pub mod proof;
