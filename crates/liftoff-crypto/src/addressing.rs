use liftoff_types::{ContentId, DirectoryManifest, MerkleRoot};

use crate::dirnode::{cid_for, encode_dir_node, DirNode, RAW_CODEC};
use crate::error::{AddressingError, AddressingResult};
use crate::merkle::ChunkTree;

/// Result of chunking a byte stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChunkedContent {
    pub merkle: MerkleRoot,
    pub size: u64,
    pub chunks: usize,
}

/// Content addressing capability consumed by the publish pipeline.
pub trait ContentAddressing: Send + Sync {
    /// Chunk `data` with the ledger's chunk size and compute its Merkle root.
    fn chunk(&self, data: &[u8], chunk_size: u64) -> AddressingResult<ChunkedContent>;

    /// Identifier of `data` as a raw leaf, used as a hint in ledger memos.
    fn raw_cid(&self, data: &[u8]) -> ContentId;

    /// Build and serialize a directory node from a manifest.
    fn build_dir_node(&self, manifest: &DirectoryManifest) -> AddressingResult<DirNode>;
}

/// BLAKE3 chunk trees with SHA2-256 CIDv1 identifiers.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultAddressing;

impl ContentAddressing for DefaultAddressing {
    fn chunk(&self, data: &[u8], chunk_size: u64) -> AddressingResult<ChunkedContent> {
        let chunk_size = usize::try_from(chunk_size)
            .ok()
            .filter(|size| *size > 0)
            .ok_or(AddressingError::InvalidChunkSize)?;
        let tree = ChunkTree::build(data, chunk_size);
        Ok(ChunkedContent {
            merkle: MerkleRoot::new(tree.root().to_vec())?,
            size: tree.size(),
            chunks: tree.leaf_count(),
        })
    }

    fn raw_cid(&self, data: &[u8]) -> ContentId {
        cid_for(RAW_CODEC, data)
    }

    fn build_dir_node(&self, manifest: &DirectoryManifest) -> AddressingResult<DirNode> {
        encode_dir_node(manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_chunk_size_is_rejected() {
        assert_eq!(
            DefaultAddressing.chunk(b"abc", 0),
            Err(AddressingError::InvalidChunkSize)
        );
    }

    #[test]
    fn chunk_reports_size_and_count() {
        let out = DefaultAddressing.chunk(&[1u8; 2500], 1024).unwrap();
        assert_eq!(out.size, 2500);
        assert_eq!(out.chunks, 3);
        assert_eq!(out.merkle.as_bytes().len(), 32);
    }

    #[test]
    fn same_bytes_same_merkle() {
        let a = DefaultAddressing.chunk(b"payload", 4).unwrap();
        let b = DefaultAddressing.chunk(b"payload", 4).unwrap();
        assert_eq!(a.merkle, b.merkle);
    }

    #[test]
    fn works_through_trait_object() {
        let addressing: Box<dyn ContentAddressing> = Box::new(DefaultAddressing);
        let node = addressing.build_dir_node(&DirectoryManifest::new()).unwrap();
        assert!(!node.bytes.is_empty());
        assert_ne!(addressing.raw_cid(b"x"), addressing.raw_cid(b"y"));
    }
}
