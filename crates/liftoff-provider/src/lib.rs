//! Redundant storage uploads for liftoff.
//!
//! [`UploadProtocol`] takes registered content (bytes, Merkle root, start
//! block, submitter) and stores copies on a shuffled subset of the active
//! providers, skipping providers that decline and blacklisting providers
//! that fail. The HTTP wire format lives in [`HttpTransport`]; tests use
//! [`ScriptedTransport`].

pub mod error;
pub mod http;
pub mod memory;
pub mod protocol;
pub mod registry;
pub mod transport;

pub use error::{ProviderError, ProviderResult, UploadError};
pub use http::HttpTransport;
pub use memory::{Scripted, ScriptedTransport};
pub use protocol::{UploadConfig, UploadJob, UploadProtocol};
pub use registry::ProviderRegistry;
pub use transport::{classify_response, ProviderTransport, UploadRequest, HOSTING_IPFS};
