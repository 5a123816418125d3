use serde::{Deserialize, Serialize};

/// A storage provider as advertised by the ledger.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProviderRecord {
    /// Base URL of the provider's HTTP endpoint.
    pub endpoint: String,
    /// The provider's ledger account address.
    pub account: String,
    /// Set when the provider failed during this run; never persisted.
    #[serde(default, skip_serializing)]
    pub blacklisted: bool,
}

impl ProviderRecord {
    pub fn new(endpoint: impl Into<String>, account: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            account: account.into(),
            blacklisted: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blacklist_flag_is_not_serialized() {
        let mut p = ProviderRecord::new("https://p1.example", "acct1");
        p.blacklisted = true;
        let json = serde_json::to_string(&p).unwrap();
        assert!(!json.contains("blacklisted"));
        let back: ProviderRecord = serde_json::from_str(&json).unwrap();
        assert!(!back.blacklisted);
        assert_eq!(back.endpoint, "https://p1.example");
    }
}
