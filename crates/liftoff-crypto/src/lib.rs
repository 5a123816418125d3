//! Content addressing for liftoff.
//!
//! Provides the [`ContentAddressing`] capability consumed by the publish
//! pipeline: chunking byte streams into BLAKE3 hash trees (the ledger's
//! Merkle root), and encoding directory manifests as UnixFS-style directory
//! nodes with CIDv1 identifiers.
//!
//! All hashing wraps established libraries; no custom cryptography.

pub mod addressing;
pub mod dirnode;
pub mod error;
pub mod merkle;

pub use addressing::{ChunkedContent, ContentAddressing, DefaultAddressing};
pub use dirnode::{cid_for, encode_dir_node, DirNode, DAG_JSON_CODEC, RAW_CODEC};
pub use error::{AddressingError, AddressingResult};
pub use merkle::ChunkTree;
