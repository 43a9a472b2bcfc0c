//! RPC seam
//!
//! The transport that carries calls between processes lives outside this
//! crate. This module defines what the service and the proxies need from it:
//! a [`Caller`] that issues named calls with JSON params, and an
//! [`Assigner`] that resolves method names to handlers on the serving side.

mod local;

pub use local::LocalClient;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

/// JSON-RPC code for an unknown method
pub const CODE_METHOD_NOT_FOUND: i64 = -32601;

/// JSON-RPC code for params that do not match the method
pub const CODE_INVALID_PARAMS: i64 = -32602;

/// Method names the server reserves for itself
pub const RESERVED_PREFIX: &str = "rpc.";

/// Reserved introspection method answered by the server itself
pub const METHOD_SERVER_INFO: &str = "rpc.serverInfo";

/// Error reply carried across the RPC boundary
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct RpcError {
    /// Numeric code, if the error has one
    pub code: Option<i64>,
    pub message: String,
}

impl RpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            message: message.into(),
        }
    }

    /// An error with a message and no code
    pub fn opaque(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(
            CODE_METHOD_NOT_FOUND,
            format!("method not found: {}", method),
        )
    }

    pub fn invalid_params(err: impl std::fmt::Display) -> Self {
        Self::new(CODE_INVALID_PARAMS, format!("invalid parameters: {}", err))
    }
}

/// A registered method: JSON params in, JSON result or error out
pub type Handler = Arc<dyn Fn(Value) -> Result<Value, RpcError> + Send + Sync>;

/// Wrap a typed function as a [`Handler`].
///
/// Params are decoded into `Req`; a decoding failure is reported as
/// invalid params without calling `f`.
pub fn handler<Req, Rep, E, F>(f: F) -> Handler
where
    Req: DeserializeOwned + 'static,
    Rep: Serialize + 'static,
    E: Into<RpcError> + 'static,
    F: Fn(Req) -> Result<Rep, E> + Send + Sync + 'static,
{
    Arc::new(move |params: Value| {
        let req: Req = serde_json::from_value(params).map_err(RpcError::invalid_params)?;
        let rep = f(req).map_err(Into::into)?;
        serde_json::to_value(rep).map_err(|e| RpcError::opaque(format!("encoding reply: {}", e)))
    })
}

/// Resolves method names to handlers
pub trait Assigner: Send + Sync {
    /// Handler for method, if one is registered.
    fn assign(&self, method: &str) -> Option<Handler>;

    /// Names of all registered methods, sorted.
    fn names(&self) -> Vec<String>;
}

/// Flat table of named handlers
#[derive(Clone, Default)]
pub struct MethodMap {
    handlers: BTreeMap<String, Handler>,
}

impl MethodMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler, returning the one it replaces.
    pub fn insert(&mut self, method: impl Into<String>, handler: Handler) -> Option<Handler> {
        self.handlers.insert(method.into(), handler)
    }

    pub fn contains(&self, method: &str) -> bool {
        self.handlers.contains_key(method)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl Assigner for MethodMap {
    fn assign(&self, method: &str) -> Option<Handler> {
        self.handlers.get(method).cloned()
    }

    fn names(&self) -> Vec<String> {
        self.handlers.keys().cloned().collect()
    }
}

/// Routes `"<service>.<method>"` to the assigner mounted as `<service>`
///
/// This is how several stores share one transport: each is mounted under
/// its own name and clients address it with a method prefix.
#[derive(Clone, Default)]
pub struct ServiceMap {
    services: BTreeMap<String, Arc<dyn Assigner>>,
}

impl ServiceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mount assigner under name, returning the assigner it replaces.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        assigner: Arc<dyn Assigner>,
    ) -> Option<Arc<dyn Assigner>> {
        self.services.insert(name.into(), assigner)
    }
}

impl Assigner for ServiceMap {
    fn assign(&self, method: &str) -> Option<Handler> {
        let (service, rest) = method.split_once('.')?;
        self.services.get(service)?.assign(rest)
    }

    fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .services
            .iter()
            .flat_map(|(service, assigner)| {
                assigner
                    .names()
                    .into_iter()
                    .map(move |method| format!("{}.{}", service, method))
            })
            .collect();
        names.sort();
        names
    }
}

/// Client side of a connection
pub trait Caller: Send + Sync {
    /// Issue a call and wait for its reply.
    fn call(&self, method: &str, params: Value) -> Result<Value, RpcError>;

    /// Shut down the connection.
    fn close(&self) -> Result<(), RpcError> {
        Ok(())
    }
}

/// Issue a call with typed params and decode the typed result.
pub fn call_result<P, R>(caller: &dyn Caller, method: &str, params: &P) -> Result<R, RpcError>
where
    P: Serialize + ?Sized,
    R: DeserializeOwned,
{
    let params = serde_json::to_value(params)
        .map_err(|e| RpcError::opaque(format!("encoding params: {}", e)))?;
    let result = caller.call(method, params)?;
    serde_json::from_value(result).map_err(|e| RpcError::opaque(format!("decoding result: {}", e)))
}
