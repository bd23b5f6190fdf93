//! # credbridge-cli -- Operator CLI for credbridge
//!
//! ## Subcommands
//!
//! - `credbridge check <HASH>`: read a credential back from the registry.
//! - `credbridge subject <DID>`: list the credentials stored for a subject.
//! - `credbridge hash <FILE>`: compute the credential hash the bridge would
//!   write for a JSON payload.
//!
//! Registry lookups are read-only: `RPC_URL`, `CHAIN_ID` and
//! `REGISTRY_ADDRESS` must be set, `PRIVATE_KEY` is not needed.
//!
//! ```bash
//! credbridge check 0x3b1f...c0de
//! credbridge hash ./succeeded-event.json --show-input
//! ```

pub mod check;
pub mod hash;

use std::future::Future;

/// Run a registry call to completion on a single-threaded runtime.
pub(crate) fn block_on<F: Future>(future: F) -> anyhow::Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    Ok(runtime.block_on(future))
}
