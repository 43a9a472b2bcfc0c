//! In-process client
//!
//! Connects a client directly to an assigner without a network in between.
//! Params and results are still encoded to JSON text and back, so a call
//! sees exactly what it would see over a real transport.

use super::{Assigner, Caller, RpcError, METHOD_SERVER_INFO};
use crate::protocol::ServerInfo;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Client bound to an in-process assigner
pub struct LocalClient {
    assigner: Arc<dyn Assigner>,
    closed: AtomicBool,
}

impl LocalClient {
    pub fn new(assigner: Arc<dyn Assigner>) -> Self {
        Self {
            assigner,
            closed: AtomicBool::new(false),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn dispatch(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        if method == METHOD_SERVER_INFO {
            let info = ServerInfo {
                methods: self.assigner.names(),
            };
            return serde_json::to_value(info).map_err(|e| RpcError::opaque(e.to_string()));
        }

        let handler = self
            .assigner
            .assign(method)
            .ok_or_else(|| RpcError::method_not_found(method))?;
        handler(params)
    }
}

impl Caller for LocalClient {
    fn call(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        if self.is_closed() {
            return Err(RpcError::opaque("client is closed"));
        }
        log::trace!("Local call {}", method);

        let params = reencode(&params)?;
        let result = self.dispatch(method, params)?;
        reencode(&result)
    }

    fn close(&self) -> Result<(), RpcError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

fn reencode(value: &Value) -> Result<Value, RpcError> {
    let text = serde_json::to_vec(value).map_err(|e| RpcError::opaque(e.to_string()))?;
    serde_json::from_slice(&text).map_err(|e| RpcError::opaque(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::{call_result, handler, MethodMap, CODE_METHOD_NOT_FOUND};

    fn client() -> LocalClient {
        let mut methods = MethodMap::new();
        methods.insert("add", handler(|(a, b): (i64, i64)| Ok::<_, RpcError>(a + b)));
        LocalClient::new(Arc::new(methods))
    }

    #[test]
    fn test_call() {
        let client = client();
        let sum: i64 = call_result(&client, "add", &(2, 3)).unwrap();
        assert_eq!(sum, 5);
    }

    #[test]
    fn test_unknown_method() {
        let client = client();
        let err = call_result::<_, i64>(&client, "sub", &(2, 3)).unwrap_err();
        assert_eq!(err.code, Some(CODE_METHOD_NOT_FOUND));
    }

    #[test]
    fn test_server_info() {
        let client = client();
        let info: ServerInfo = call_result(&client, METHOD_SERVER_INFO, &()).unwrap();
        assert_eq!(info.methods, vec!["add"]);
    }

    #[test]
    fn test_closed_client() {
        let client = client();
        client.close().unwrap();
        assert!(client.is_closed());

        let err = call_result::<_, i64>(&client, "add", &(1, 1)).unwrap_err();
        assert_eq!(err.code, None);
        assert_eq!(err.message, "client is closed");
    }
}
