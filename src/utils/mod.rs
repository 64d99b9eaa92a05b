//! Utilities module aggregator exposing path resolution and blob storage.

pub mod path;
pub mod storage;
