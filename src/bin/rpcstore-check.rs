//! Store check binary
//!
//! Wires an in-memory store to a service and a client proxy in one process
//! and runs a short session through the proxy. Useful for checking a
//! configuration file before deploying it.

use anyhow::{bail, ensure, Context, Result};
use clap::Parser;
use env_logger::Env;
use rpcstore::blob::{CasPutOptions, HashCas, MemStore, PutOptions};
use rpcstore::rpc::{Assigner, LocalClient, ServiceMap};
use rpcstore::{
    Backend, BlobStore, Config, ContentAddressable, RpcCas, RpcStore, StoreService,
};
use std::ops::ControlFlow;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "rpcstore-check")]
#[command(about = "Exercise a blob store through the RPC proxy", long_about = None)]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Back the service with a content-addressable store
    #[arg(long)]
    cas: bool,

    /// Number of keys to write
    #[arg(short, long, default_value = "100")]
    keys: usize,

    /// Override the client page limit
    #[arg(long)]
    page_limit: Option<usize>,
}

fn main() {
    // Initialize logging
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        log::error!("Check failed: {:#}", e);
        process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(limit) = args.page_limit {
        config.store.page_limit = limit;
    }
    config.validate().context("validating config")?;

    log::info!("Starting store check");
    log::info!("  Method prefix: {:?}", config.store.method_prefix);
    log::info!("  Key prefix: {:?}", config.store.key_prefix);
    log::info!("  Page limit: {}", config.store.page_limit);
    log::info!("  Content addressing: {}", args.cas);

    let mem = MemStore::new();
    let backend = if args.cas {
        Backend::content_addressable(Arc::new(HashCas::blake3(mem.clone())))
    } else {
        Backend::plain(Arc::new(mem.clone()))
    };
    let service = StoreService::new(backend, config.service.clone());
    let assigner = mount(&service, &config.store.method_prefix)?;
    let client = Arc::new(LocalClient::new(assigner));
    let store = RpcCas::new(client, config.store.clone());

    let info = store.server_info().context("querying server info")?;
    log::info!("Server exports {} methods", info.methods.len());
    for method in &info.methods {
        log::debug!("  {}", method);
    }

    exercise(&store, args.keys)?;
    if args.cas {
        exercise_cas(&store)?;
    }

    log::info!("Backend holds {} keys", mem.snapshot().len());
    store.close().context("closing client")?;
    log::info!("Store check passed");
    Ok(())
}

/// Mount the service methods where the configured prefix expects them.
fn mount(service: &StoreService, prefix: &str) -> Result<Arc<dyn Assigner>> {
    if prefix.is_empty() {
        return Ok(Arc::new(service.methods()));
    }
    match prefix.strip_suffix('.') {
        Some(name) if !name.is_empty() && !name.contains('.') => {
            let mut services = ServiceMap::new();
            services.insert(name, Arc::new(service.methods()));
            Ok(Arc::new(services))
        }
        _ => bail!("method prefix {:?} must have the form \"<name>.\"", prefix),
    }
}

fn exercise(store: &RpcStore, count: usize) -> Result<()> {
    for i in 0..count {
        let key = format!("key-{:06}", i);
        let data = format!("value {}", i);
        store
            .put(PutOptions {
                key: key.as_bytes(),
                data: data.as_bytes(),
                replace: false,
            })
            .with_context(|| format!("put {}", key))?;
    }
    log::info!("Wrote {} keys", count);

    if count > 0 {
        let data = store.get(b"key-000000").context("get key-000000")?;
        ensure!(data == b"value 0", "get returned {:?}", String::from_utf8_lossy(&data));
        let size = store.size(b"key-000000").context("size key-000000")?;
        ensure!(size == 7, "size returned {}", size);

        let err = store
            .put(PutOptions {
                key: b"key-000000",
                data: b"other",
                replace: false,
            })
            .err();
        ensure!(
            err.as_ref().is_some_and(|e| e.is_key_exists()),
            "duplicate put returned {:?}",
            err
        );
    }

    let mut listed = 0usize;
    let mut last: Option<Vec<u8>> = None;
    store
        .list(&[], &mut |key| {
            if let Some(prev) = &last {
                if prev.as_slice() >= key {
                    return Err(rpcstore::BlobError::Backend(format!(
                        "list out of order at {}",
                        String::from_utf8_lossy(key)
                    )));
                }
            }
            last = Some(key.to_vec());
            listed += 1;
            Ok(ControlFlow::Continue(()))
        })
        .context("list")?;
    ensure!(listed == count, "listed {} keys, wrote {}", listed, count);

    let len = store.len().context("len")?;
    ensure!(len == count as u64, "len returned {}, wrote {}", len, count);
    log::info!("Listed {} keys", listed);

    for i in 0..count {
        let key = format!("key-{:06}", i);
        store
            .delete(key.as_bytes())
            .with_context(|| format!("delete {}", key))?;
    }
    let missing = store.get(b"key-000000").err();
    ensure!(
        missing.as_ref().is_some_and(|e| e.is_key_not_found()),
        "get after delete returned {:?}",
        missing
    );
    log::info!("Deleted {} keys", count);
    Ok(())
}

fn exercise_cas(store: &RpcCas) -> Result<()> {
    let data = b"content addressed data\n";
    let key = store
        .cas_put(CasPutOptions::new(data))
        .context("cas.put")?;
    let derived = store
        .cas_key(CasPutOptions::new(data))
        .context("cas.key")?;
    ensure!(key == derived, "cas.put and cas.key disagree");

    let stored = store.get(&key).context("get content-addressed key")?;
    ensure!(stored == data, "content-addressed data mismatch");
    log::info!("Stored content at {}", hex::encode(&key));

    store.delete(&key).context("delete content-addressed key")?;
    Ok(())
}
