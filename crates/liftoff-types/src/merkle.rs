use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Root hash of a chunked file's hash tree.
///
/// The ledger keys storage proofs by this value, and providers receive it
/// hex-encoded alongside every upload. Length depends on the tree hash in
/// use, so it is kept as an owned byte vector.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MerkleRoot(Vec<u8>);

impl MerkleRoot {
    /// Wrap raw root bytes. An empty root is rejected.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self, TypeError> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(TypeError::EmptyMerkle);
        }
        Ok(Self(bytes))
    }

    /// The raw root bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Hex-encoded string representation.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Short hex representation (first 8 characters).
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..self.0.len().min(4)])
    }

    /// Parse from a hex string.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        Self::new(bytes)
    }
}

impl fmt::Debug for MerkleRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MerkleRoot({})", self.short_hex())
    }
}

impl fmt::Display for MerkleRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl TryFrom<String> for MerkleRoot {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

impl From<MerkleRoot> for String {
    fn from(root: MerkleRoot) -> Self {
        root.to_hex()
    }
}

impl AsRef<[u8]> for MerkleRoot {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_root_is_rejected() {
        assert_eq!(MerkleRoot::new(Vec::new()), Err(TypeError::EmptyMerkle));
        assert_eq!(MerkleRoot::from_hex(""), Err(TypeError::EmptyMerkle));
    }

    #[test]
    fn hex_is_lowercase_and_parses_back() {
        let root = MerkleRoot::new(vec![0xAB, 0x01, 0xFF]).unwrap();
        assert_eq!(root.to_hex(), "ab01ff");
        assert_eq!(MerkleRoot::from_hex("AB01FF").unwrap(), root);
    }

    #[test]
    fn invalid_hex() {
        assert!(matches!(MerkleRoot::from_hex("xyz"), Err(TypeError::InvalidHex(_))));
    }

    #[test]
    fn short_hex_handles_short_roots() {
        let root = MerkleRoot::new(vec![1, 2]).unwrap();
        assert_eq!(root.short_hex(), "0102");
        let long = MerkleRoot::new(vec![7; 64]).unwrap();
        assert_eq!(long.short_hex().len(), 8);
    }

    #[test]
    fn serde_uses_hex() {
        let root = MerkleRoot::new(vec![0x10, 0x20]).unwrap();
        let json = serde_json::to_string(&root).unwrap();
        assert_eq!(json, "\"1020\"");
        let back: MerkleRoot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, root);
        let empty: Result<MerkleRoot, _> = serde_json::from_str("\"\"");
        assert!(empty.is_err());
    }
}
