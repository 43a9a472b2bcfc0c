//! Request and reply messages
//!
//! Defines the JSON shapes exchanged by the service and its clients.

use super::Bytes;
use serde::{Deserialize, Deserializer, Serialize};

/// Decode a list that may be sent as `null` when empty.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Request to the get, delete, and size methods
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeyRequest {
    pub key: Bytes,
}

/// Request to the put method
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PutRequest {
    pub key: Bytes,
    pub data: Bytes,
    #[serde(default)]
    pub replace: bool,
}

/// Request to the cas.put and cas.key methods
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DataRequest {
    pub data: Bytes,
    /// Prepended to the derived key on the service side
    #[serde(default, skip_serializing_if = "<[u8]>::is_empty")]
    pub prefix: Bytes,
    /// Appended to the derived key on the service side
    #[serde(default, skip_serializing_if = "<[u8]>::is_empty")]
    pub suffix: Bytes,
}

/// Request to the list method
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListRequest {
    #[serde(default)]
    pub start: Bytes,
    /// Maximum keys per page; the service picks a default when <= 0
    #[serde(default)]
    pub count: i64,
}

/// Reply from the list method
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListReply {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub keys: Vec<Bytes>,
    /// First key after this page, present iff more keys remain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<Bytes>,
}

/// Reply from rpc.serverInfo
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfo {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub methods: Vec<String>,
}
