//! Command handlers behind the `vega` subcommands.

pub mod config;
pub mod session;

use std::path::PathBuf;

use anyhow::Context as _;

use crate::utils::storage::local::LocalBlobStore;

/// Options shared by every subcommand.
#[derive(Debug, Default, Clone)]
pub struct Context {
    pub data_dir: Option<PathBuf>,
}

impl Context {
    /// Open the session store under the selected data directory.
    pub fn open_store(&self) -> anyhow::Result<LocalBlobStore> {
        let store = match &self.data_dir {
            Some(dir) => LocalBlobStore::new(dir.clone()),
            None => LocalBlobStore::open_default(),
        };
        store.context("failed to open session store")
    }
}

fn working_dir() -> anyhow::Result<PathBuf> {
    std::env::current_dir().context("failed to resolve current directory")
}
