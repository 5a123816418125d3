use base64::Engine;
use cid::Cid;
use multihash_codetable::{Code, MultihashDigest};
use serde::Serialize;

use liftoff_types::{ContentId, DirectoryManifest};

use crate::error::{AddressingError, AddressingResult};

/// Multicodec for raw leaf content.
pub const RAW_CODEC: u64 = 0x55;
/// Multicodec for DAG-JSON encoded nodes.
pub const DAG_JSON_CODEC: u64 = 0x0129;

/// UnixFS `Data { Type: Directory }` protobuf payload.
const UNIXFS_DIR_DATA: [u8; 2] = [0x08, 0x01];

/// A serialized directory node and its identifier.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirNode {
    pub cid: ContentId,
    pub bytes: Vec<u8>,
}

#[derive(Serialize)]
struct NodeJson<'a> {
    data: String,
    links: Vec<LinkJson<'a>>,
}

#[derive(Serialize)]
struct LinkJson<'a> {
    #[serde(rename = "Cid")]
    cid: CidRef,
    #[serde(rename = "Name")]
    name: &'a str,
    #[serde(rename = "Size")]
    size: u64,
}

#[derive(Serialize)]
struct CidRef {
    #[serde(rename = "/")]
    link: String,
}

/// Encode a manifest as a UnixFS-style directory node.
///
/// Links appear in manifest (name) order, so the same manifest always
/// yields the same bytes and identifier.
pub fn encode_dir_node(manifest: &DirectoryManifest) -> AddressingResult<DirNode> {
    let node = NodeJson {
        data: base64::engine::general_purpose::STANDARD.encode(UNIXFS_DIR_DATA),
        links: manifest
            .iter()
            .map(|(name, id)| LinkJson {
                cid: CidRef {
                    link: id.to_string(),
                },
                name,
                size: 0,
            })
            .collect(),
    };
    let bytes =
        serde_json::to_vec(&node).map_err(|e| AddressingError::Serialization(e.to_string()))?;
    let cid = cid_for(DAG_JSON_CODEC, &bytes);
    Ok(DirNode { cid, bytes })
}

/// CIDv1 over the SHA2-256 multihash of `data`.
pub fn cid_for(codec: u64, data: &[u8]) -> ContentId {
    let hash = Code::Sha2_256.digest(data);
    ContentId::from_cid(Cid::new_v1(codec, hash))
}
