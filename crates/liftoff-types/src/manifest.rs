use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::content_id::ContentId;
use crate::error::TypeError;

/// Entries whose name starts with this prefix are never published.
pub const HIDDEN_PREFIX: &str = ".";

/// Returns `true` if a directory entry name is hidden.
pub fn is_hidden(name: &str) -> bool {
    name.starts_with(HIDDEN_PREFIX)
}

/// Mapping from directory entry name to the entry's content identifier.
///
/// Names are unique and never hidden. Entries are kept sorted by name so
/// that serialization is byte-stable no matter the order in which sibling
/// publishes completed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DirectoryManifest {
    entries: BTreeMap<String, ContentId>,
}

impl DirectoryManifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry. Fails on hidden, empty, or path-like names and on
    /// duplicates; the existing entry is left untouched.
    pub fn insert(&mut self, name: impl Into<String>, id: ContentId) -> Result<(), TypeError> {
        let name = name.into();
        if name.is_empty() || name.contains('/') || name == ".." {
            return Err(TypeError::InvalidName(name));
        }
        if is_hidden(&name) {
            return Err(TypeError::HiddenEntry(name));
        }
        if self.entries.contains_key(&name) {
            return Err(TypeError::DuplicateEntry(name));
        }
        self.entries.insert(name, id);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ContentId> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ContentId)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    /// Pretty JSON (4-space indent) used for the local audit artifact.
    pub fn to_audit_json(&self) -> Result<Vec<u8>, TypeError> {
        let mut out = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut out, formatter);
        self.serialize(&mut ser)
            .map_err(|e| TypeError::Serialization(e.to_string()))?;
        Ok(out)
    }

    /// Parse an audit artifact back into a manifest, re-checking names.
    pub fn from_audit_json(data: &[u8]) -> Result<Self, TypeError> {
        let raw: BTreeMap<String, ContentId> =
            serde_json::from_slice(data).map_err(|e| TypeError::Serialization(e.to_string()))?;
        let mut manifest = Self::new();
        for (name, id) in raw {
            manifest.insert(name, id)?;
        }
        Ok(manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const CIDS: [&str; 3] = [
        "bafybeihdxnfgloqg26ztcaawxijkbibgyt6uykhhdtyk4spuamub2tgnfm",
        "bafybeia6dhanrmza6pidqt6abieejmytcvf6wtlhqshwb5hv2zvvfrdefy",
        "bafybeieudrr6744fdpybgrxadl2elqcncvfakzqyipake5milgleihldre",
    ];

    fn cid(i: usize) -> ContentId {
        ContentId::parse(CIDS[i % CIDS.len()]).unwrap()
    }

    #[test]
    fn hidden_names() {
        assert!(is_hidden(".git"));
        assert!(is_hidden(".DS_Store"));
        assert!(!is_hidden("readme.md"));
    }

    #[test]
    fn rejects_hidden_duplicate_and_invalid() {
        let mut m = DirectoryManifest::new();
        m.insert("a.txt", cid(0)).unwrap();
        assert_eq!(
            m.insert("a.txt", cid(1)),
            Err(TypeError::DuplicateEntry("a.txt".into()))
        );
        assert_eq!(m.get("a.txt"), Some(&cid(0)));
        assert_eq!(
            m.insert(".env", cid(1)),
            Err(TypeError::HiddenEntry(".env".into()))
        );
        assert!(matches!(m.insert("", cid(1)), Err(TypeError::InvalidName(_))));
        assert!(matches!(m.insert("a/b", cid(1)), Err(TypeError::InvalidName(_))));
        assert_eq!(m.len(), 1);
    }

    #[test]
    fn audit_json_is_sorted_and_indented() {
        let mut m = DirectoryManifest::new();
        m.insert("b", cid(1)).unwrap();
        m.insert("a", cid(0)).unwrap();
        let json = String::from_utf8(m.to_audit_json().unwrap()).unwrap();
        let expected = format!("{{\n    \"a\": \"{}\",\n    \"b\": \"{}\"\n}}", CIDS[0], CIDS[1]);
        assert_eq!(json, expected);
        assert_eq!(DirectoryManifest::from_audit_json(json.as_bytes()).unwrap(), m);
    }

    #[test]
    fn empty_manifest_serializes() {
        let m = DirectoryManifest::new();
        assert_eq!(m.to_audit_json().unwrap(), b"{}");
    }

    proptest! {
        #[test]
        fn serialization_ignores_insertion_order(
            names in proptest::collection::btree_set("[a-z][a-z0-9_]{0,8}", 1..12)
        ) {
            let names: Vec<String> = names.into_iter().collect();
            let mut forward = DirectoryManifest::new();
            for (i, n) in names.iter().enumerate() {
                forward.insert(n.clone(), cid(i)).unwrap();
            }
            let mut backward = DirectoryManifest::new();
            for (i, n) in names.iter().enumerate().rev() {
                backward.insert(n.clone(), cid(i)).unwrap();
            }
            prop_assert_eq!(forward.to_audit_json().unwrap(), backward.to_audit_json().unwrap());
            prop_assert_eq!(forward.len(), names.len());
        }
    }
}
