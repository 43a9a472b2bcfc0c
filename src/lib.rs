//! Blob store over RPC
//!
//! This crate exports a blob store as a set of RPC methods and provides a
//! client store that implements the same interface by calling them. A
//! [`StoreService`] serves a local backend; an [`RpcStore`] (or [`RpcCas`]
//! for content-addressed backends) is the client-side proxy.
//!
//! Keys and data are arbitrary bytes and travel base64-encoded. Key-not-found
//! and key-exists errors keep their identity across the wire.

pub mod blob;
pub mod client;
pub mod config;
pub mod errcode;
pub mod protocol;
pub mod rpc;
pub mod service;

pub use blob::{BlobError, BlobResult, BlobStore, ContentAddressable};
pub use client::{RpcCas, RpcStore};
pub use config::{Config, ConfigError, ServiceOptions, StoreOptions};
pub use service::{Backend, StoreService};
