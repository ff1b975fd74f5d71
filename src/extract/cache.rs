//! Per-batch extraction cache keyed by `context-check` id

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::document::BlockKind;
use crate::error::{GateError, Location};

#[derive(Debug, Clone)]
struct CacheEntry {
    kind: BlockKind,
    fingerprint: String,
    location: Location,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheLookup {
    /// First sighting; the caller must parse the block
    Miss,
    /// Identical block already seen; reuse what was parsed
    Hit,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub parsed: usize,
    pub hits: usize,
}

/// Identity registry for one extraction batch. Routing and verification ids
/// share the namespace.
#[derive(Debug, Default)]
pub struct BatchCache {
    entries: HashMap<String, CacheEntry>,
    stats: CacheStats,
}

impl BatchCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        id: &str,
        kind: BlockKind,
        fingerprint: &str,
        location: Location,
    ) -> Result<CacheLookup, GateError> {
        match self.entries.get(id) {
            Some(existing) if existing.kind == kind && existing.fingerprint == fingerprint => {
                debug!(id, at = %location, first = %existing.location, "cache hit");
                self.stats.hits += 1;
                Ok(CacheLookup::Hit)
            }
            Some(existing) => {
                let detail = if existing.kind != kind {
                    format!(
                        "declared as <{}> at {} and as <{}> here",
                        existing.kind.tag(),
                        existing.location,
                        kind.tag()
                    )
                } else {
                    format!("first declared at {} with different content", existing.location)
                };
                Err(GateError::structural(
                    location,
                    format!("ambiguous identity for context-check '{id}': {detail}"),
                ))
            }
            None => {
                self.entries.insert(
                    id.to_string(),
                    CacheEntry {
                        kind,
                        fingerprint: fingerprint.to_string(),
                        location,
                    },
                );
                self.stats.parsed += 1;
                Ok(CacheLookup::Miss)
            }
        }
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}
