/// Binary hash tree over fixed-size chunks of a byte stream.
///
/// Leaves are domain-separated BLAKE3 hashes of `(index, chunk)`; interior
/// nodes hash their two children, and an odd node is paired with itself.
/// Empty input is treated as a single empty chunk so every stream has a
/// non-empty root.
#[derive(Clone, Debug)]
pub struct ChunkTree {
    root: [u8; 32],
    leaf_count: usize,
    size: u64,
}

impl ChunkTree {
    /// Chunk `data` into `chunk_size`-byte pieces and build the tree.
    ///
    /// `chunk_size` must be non-zero; callers validate it first.
    pub fn build(data: &[u8], chunk_size: usize) -> Self {
        debug_assert!(chunk_size > 0);
        let mut current: Vec<[u8; 32]> = if data.is_empty() {
            vec![hash_leaf(0, &[])]
        } else {
            data.chunks(chunk_size)
                .enumerate()
                .map(|(i, chunk)| hash_leaf(i as u64, chunk))
                .collect()
        };
        let leaf_count = current.len();

        while current.len() > 1 {
            current = current
                .chunks(2)
                .map(|pair| hash_pair(&pair[0], pair.get(1).unwrap_or(&pair[0])))
                .collect();
        }

        Self {
            root: current[0],
            leaf_count,
            size: data.len() as u64,
        }
    }

    /// The root hash of the tree.
    pub fn root(&self) -> [u8; 32] {
        self.root
    }

    /// Number of chunks (leaves).
    pub fn leaf_count(&self) -> usize {
        self.leaf_count
    }

    /// Length of the chunked input in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }
}

fn hash_leaf(index: u64, chunk: &[u8]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    hasher.update(b"liftoff-chunk-v1:");
    hasher.update(&index.to_be_bytes());
    hasher.update(chunk);
    *hasher.finalize().as_bytes()
}

fn hash_pair(left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    hasher.update(b"liftoff-merkle-v1:");
    hasher.update(left);
    hasher.update(right);
    *hasher.finalize().as_bytes()
}
