use std::fmt;

use serde::{Deserialize, Serialize};

use crate::content_id::ContentId;
use crate::merkle::MerkleRoot;

/// What a registered object represents on the ledger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentKind {
    File,
    Folder,
}

impl ContentKind {
    /// Numeric flag carried by the register-content message.
    pub fn ledger_flag(self) -> i64 {
        match self {
            Self::File => 0,
            Self::Folder => 1,
        }
    }

    pub fn is_folder(self) -> bool {
        matches!(self, Self::Folder)
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File => write!(f, "file"),
            Self::Folder => write!(f, "folder"),
        }
    }
}

/// Outcome of publishing one object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishResult {
    /// Identifiers returned by every provider that accepted the upload, in
    /// the order the uploads succeeded. A ledger dedup hit yields exactly
    /// the recorded identifier.
    pub cids: Vec<ContentId>,
    /// Merkle root of the published bytes.
    pub merkle: MerkleRoot,
    /// `true` when the ledger already held a proof and nothing was uploaded.
    pub deduplicated: bool,
}

impl PublishResult {
    /// The identifier recorded in the parent manifest.
    pub fn primary(&self) -> Option<&ContentId> {
        self.cids.first()
    }
}
