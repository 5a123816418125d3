use serde::{Deserialize, Serialize};

use liftoff_types::{ContentId, ContentKind, MerkleRoot};

use crate::error::{LedgerError, LedgerResult};

/// Blocks between storage proofs requested for every registration.
pub const DEFAULT_PROOF_INTERVAL: i64 = 40;
/// Number of providers the ledger should assign.
pub const DEFAULT_REDUNDANCY: i64 = 3;
/// Average block time used to turn the storage term into a block count.
pub const BLOCK_TIME_SECS: i64 = 6;
/// Storage term in years.
pub const DEFAULT_TERM_YEARS: i64 = 100;

/// Number of blocks covering `years` of storage.
pub fn term_in_blocks(years: i64) -> LedgerResult<i64> {
    years
        .checked_mul(365 * 24 * 60 * 60)
        .map(|secs| secs / BLOCK_TIME_SECS)
        .ok_or_else(|| LedgerError::Validation(format!("storage term of {years} years is too long")))
}

/// Height at which a registration made at `height` lapses.
pub fn expiry_height(height: i64, years: i64) -> LedgerResult<i64> {
    height
        .checked_add(term_in_blocks(years)?)
        .ok_or_else(|| LedgerError::Validation(format!("expiry overflows at height {height}")))
}

/// Free-form note attached to a registration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Memo {
    pub memo: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cid: Option<ContentId>,
}

impl Memo {
    pub fn new(memo: impl Into<String>, cid: Option<ContentId>) -> Self {
        Self {
            memo: memo.into(),
            cid,
        }
    }

    pub fn to_json(&self) -> LedgerResult<String> {
        serde_json::to_string(self).map_err(|e| LedgerError::Serialization(e.to_string()))
    }
}

/// Ledger message announcing new content and requesting storage.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterContent {
    /// Account submitting (and paying for) the registration.
    pub creator: String,
    pub merkle: MerkleRoot,
    pub file_size: i64,
    pub proof_interval: i64,
    /// Folder flag: `0` for files, `1` for directory nodes.
    pub proof_type: i64,
    /// Redundancy target.
    pub max_proofs: i64,
    /// Block height after which the registration lapses.
    pub expires: i64,
    /// JSON memo, see [`Memo`].
    pub note: String,
}

impl RegisterContent {
    /// Build a registration with the default proof interval and redundancy.
    pub fn new(
        creator: impl Into<String>,
        merkle: MerkleRoot,
        file_size: u64,
        kind: ContentKind,
        expires: i64,
        note: String,
    ) -> Self {
        Self {
            creator: creator.into(),
            merkle,
            file_size: i64::try_from(file_size).unwrap_or(i64::MAX),
            proof_interval: DEFAULT_PROOF_INTERVAL,
            proof_type: kind.ledger_flag(),
            max_proofs: DEFAULT_REDUNDANCY,
            expires,
            note,
        }
    }

    pub fn with_redundancy(mut self, max_proofs: i64) -> Self {
        self.max_proofs = max_proofs;
        self
    }

    pub fn with_proof_interval(mut self, proof_interval: i64) -> Self {
        self.proof_interval = proof_interval;
        self
    }

    pub fn kind(&self) -> ContentKind {
        if self.proof_type == 1 {
            ContentKind::Folder
        } else {
            ContentKind::File
        }
    }

    /// Stateless checks performed before the message is queued.
    pub fn validate_basic(&self) -> LedgerResult<()> {
        if self.creator.trim().is_empty() {
            return Err(LedgerError::Validation("creator is empty".into()));
        }
        if self.creator.chars().any(char::is_whitespace) {
            return Err(LedgerError::Validation(format!(
                "creator {:?} contains whitespace",
                self.creator
            )));
        }
        if self.file_size < 0 {
            return Err(LedgerError::Validation("file size is negative".into()));
        }
        if self.proof_interval <= 0 {
            return Err(LedgerError::Validation("proof interval must be positive".into()));
        }
        if !matches!(self.proof_type, 0 | 1) {
            return Err(LedgerError::Validation(format!(
                "unknown proof type {}",
                self.proof_type
            )));
        }
        if self.max_proofs <= 0 {
            return Err(LedgerError::Validation("redundancy must be positive".into()));
        }
        if self.expires <= 0 {
            return Err(LedgerError::Validation("expiry must be a positive height".into()));
        }
        match serde_json::from_str::<serde_json::Value>(&self.note) {
            Ok(serde_json::Value::Object(_)) => Ok(()),
            _ => Err(LedgerError::Validation("note must be a JSON object".into())),
        }
    }
}

/// Per-message result data of a committed registration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterContentResponse {
    /// Endpoints of the providers the ledger assigned.
    #[serde(default)]
    pub provider_ips: Vec<String>,
    /// Height from which storage proofs are due.
    pub start_block: i64,
}

/// Fee selection for a broadcast.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeMode {
    /// The signer estimates the fee from the gas limit and gas price.
    #[default]
    Auto,
    Fixed(u64),
}

/// One transaction worth of registrations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxBatch {
    pub messages: Vec<RegisterContent>,
    pub gas_limit: u64,
    pub fee: FeeMode,
}

/// Result of a committed transaction.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxResponse {
    /// `0` on success; any other value means the transaction failed.
    pub code: u32,
    pub tx_hash: String,
    pub height: i64,
    #[serde(default)]
    pub raw_log: String,
    /// One entry per message, in message order.
    #[serde(default)]
    pub responses: Vec<RegisterContentResponse>,
}

impl TxResponse {
    pub fn is_success(&self) -> bool {
        self.code == 0
    }
}

/// A registration already present on the ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub merkle: MerkleRoot,
    pub owner: String,
    pub start: i64,
    /// Providers that have posted a storage proof.
    #[serde(default)]
    pub proofs: Vec<String>,
    /// Identifier recorded for the content, if any.
    #[serde(default)]
    pub cid: Option<ContentId>,
}

impl FileRecord {
    pub fn is_proven(&self) -> bool {
        !self.proofs.is_empty()
    }
}

/// Chain storage parameters relevant to publishing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageParams {
    pub chunk_size: u64,
}
