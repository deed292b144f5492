// src/ingest/registry.rs
//! Source registry snapshot.
//!
//! Read once at cycle start with a single statement; the pooled connection is
//! back in the pool before any worker touches the network. Activation changes
//! made after this point only affect the next cycle.

use crate::ingest::types::SourceDescriptor;
use crate::store::{Store, StoreResult};

pub async fn snapshot(store: &Store) -> StoreResult<Vec<SourceDescriptor>> {
    let sources = store.active_sources().await?;
    Ok(sources
        .into_iter()
        .map(|s| SourceDescriptor {
            id: s.id,
            name: s.name,
            url: s.url,
        })
        .collect())
}
