//! Wire protocol shared by the service and its clients
//!
//! Both sides must agree on method names and message shapes, so they are
//! defined once here.
//!
//! ```text
//! Method    Request                                       Reply
//! get       {"key":<b64>}                                 <b64>
//! put       {"key":<b64>,"data":<b64>,"replace":bool}     null
//! delete    {"key":<b64>}                                 null
//! size      {"key":<b64>}                                 <integer>
//! len       null                                          <integer>
//! list      {"start":<b64>,"count":<integer>}             {"keys":[<b64>,...],"next":<b64>}
//! cas.put   {"data":<b64>,"prefix":<b64>,"suffix":<b64>}  <b64>
//! cas.key   {"data":<b64>,"prefix":<b64>,"suffix":<b64>}  <b64>
//! ```
//!
//! Byte fields and the `keys` list may arrive as `null`; both decode as
//! empty.

mod bytes;
mod types;

pub use bytes::{base64_serde, Bytes};
pub use types::*;

pub const METHOD_GET: &str = "get";
pub const METHOD_PUT: &str = "put";
pub const METHOD_DELETE: &str = "delete";
pub const METHOD_SIZE: &str = "size";
pub const METHOD_LEN: &str = "len";
pub const METHOD_LIST: &str = "list";
pub const METHOD_CAS_PUT: &str = "cas.put";
pub const METHOD_CAS_KEY: &str = "cas.key";

/// Every method a service exports, in registration order
pub const METHODS: [&str; 8] = [
    METHOD_GET,
    METHOD_PUT,
    METHOD_DELETE,
    METHOD_SIZE,
    METHOD_LEN,
    METHOD_LIST,
    METHOD_CAS_PUT,
    METHOD_CAS_KEY,
];

/// Page size used when a list request does not name one
pub const DEFAULT_PAGE_LIMIT: usize = 64;
