//! Foundation types for liftoff.
//!
//! Every other liftoff crate depends on `liftoff-types`.
//!
//! # Key Types
//!
//! - [`ContentId`]: content identifier returned by providers and built for directory nodes
//! - [`MerkleRoot`]: root of a chunked file's hash tree, the ledger's dedup key
//! - [`DirectoryManifest`]: sorted name → identifier mapping for one directory
//! - [`ProviderRecord`]: storage provider endpoint and account
//! - [`PublishResult`]: identifiers and Merkle root of one published object

pub mod content_id;
pub mod error;
pub mod manifest;
pub mod merkle;
pub mod provider;
pub mod publish;

pub use content_id::ContentId;
pub use error::TypeError;
pub use manifest::{is_hidden, DirectoryManifest, HIDDEN_PREFIX};
pub use merkle::MerkleRoot;
pub use provider::ProviderRecord;
pub use publish::{ContentKind, PublishResult};
