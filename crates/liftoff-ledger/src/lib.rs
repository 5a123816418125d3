//! Ledger boundary for liftoff.
//!
//! This crate owns everything that talks to the storage ledger:
//! - [`RegisterContent`] and the other message and response records
//! - the [`LedgerClient`] trait boundary (signing lives behind it)
//! - [`LedgerQueue`], which batches concurrent registrations into a single
//!   serialized stream of transactions and routes each committed response
//!   back to its caller
//! - [`InMemoryLedger`] for tests and embedding
//! - [`GatewayLedgerClient`] for a signing HTTP gateway

pub mod error;
pub mod gateway;
pub mod memory;
pub mod queue;
pub mod records;
pub mod traits;

pub use error::{LedgerError, LedgerResult};
pub use gateway::{GatewayConfig, GatewayLedgerClient};
pub use memory::{InMemoryLedger, DEFAULT_CHUNK_SIZE};
pub use queue::{BatchReceipt, LedgerQueue, QueueConfig};
pub use records::{
    expiry_height, term_in_blocks, FeeMode, FileRecord, Memo, RegisterContent, RegisterContentResponse,
    StorageParams, TxBatch, TxResponse, BLOCK_TIME_SECS, DEFAULT_PROOF_INTERVAL,
    DEFAULT_REDUNDANCY, DEFAULT_TERM_YEARS,
};
pub use traits::LedgerClient;
