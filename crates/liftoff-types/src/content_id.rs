use std::fmt;
use std::str::FromStr;

use cid::Cid;
use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Content identifier for any published object.
///
/// Wraps a parsed [`Cid`]. Two identifiers are equal exactly when their
/// binary CID encodings are equal, so a CIDv0 and the CIDv1 of the same
/// multihash are distinct identifiers.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentId(Cid);

impl ContentId {
    /// Parse a textual CID (base58btc v0 or multibase v1).
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(TypeError::InvalidCid {
                input: s.to_string(),
                reason: "empty".into(),
            });
        }
        Cid::try_from(trimmed)
            .map(Self)
            .map_err(|e| TypeError::InvalidCid {
                input: s.to_string(),
                reason: e.to_string(),
            })
    }

    /// Wrap an already-constructed [`Cid`].
    pub fn from_cid(cid: Cid) -> Self {
        Self(cid)
    }

    /// The underlying CID.
    pub fn as_cid(&self) -> &Cid {
        &self.0
    }

    /// Binary encoding of the CID.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.to_bytes()
    }

    /// Multicodec of the addressed content.
    pub fn codec(&self) -> u64 {
        self.0.codec()
    }
}

impl fmt::Debug for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentId({})", self.0)
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ContentId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ContentId {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ContentId> for String {
    fn from(id: ContentId) -> Self {
        id.to_string()
    }
}

impl From<Cid> for ContentId {
    fn from(cid: Cid) -> Self {
        Self(cid)
    }
}
