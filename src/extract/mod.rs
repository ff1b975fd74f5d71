//! Extraction of verification blocks from routed documents.
//!
//! Every block id is registered in a [`BatchCache`] first. Identical repeats
//! are cache hits and are not parsed again; a repeat with different content
//! aborts the batch.

pub mod block;
pub mod cache;
pub mod validation;

use tracing::debug;

use crate::document::{BlockKind, BlockScanner, Document};
use crate::error::{GateError, Location};
use crate::models::VerificationBlock;
use crate::policy::CommandPolicy;

pub use block::BlockParser;
pub use cache::{BatchCache, CacheLookup, CacheStats};

/// Output of one extraction batch
#[derive(Debug, Clone)]
pub struct Extraction {
    /// Verification blocks in first-appearance order
    pub blocks: Vec<VerificationBlock>,
    pub stats: CacheStats,
}

impl Extraction {
    pub fn test_count(&self) -> usize {
        self.blocks.iter().map(|b| b.tests.len()).sum()
    }
}

pub struct Extractor<'a> {
    scanner: &'a BlockScanner,
    policy: &'a CommandPolicy,
    parser: BlockParser,
    cache: BatchCache,
}

impl<'a> Extractor<'a> {
    pub fn new(scanner: &'a BlockScanner, policy: &'a CommandPolicy) -> Self {
        Self {
            scanner,
            policy,
            parser: BlockParser::new(),
            cache: BatchCache::new(),
        }
    }

    pub fn extract(mut self, documents: &[Document]) -> Result<Extraction, GateError> {
        let mut blocks = Vec::new();
        for doc in documents {
            self.extract_document(doc, &mut blocks)?;
        }

        let extraction = Extraction {
            blocks,
            stats: self.cache.stats(),
        };
        debug!(
            blocks = extraction.blocks.len(),
            tests = extraction.test_count(),
            parsed = extraction.stats.parsed,
            hits = extraction.stats.hits,
            "extraction complete"
        );
        Ok(extraction)
    }

    fn extract_document(
        &mut self,
        doc: &Document,
        blocks: &mut Vec<VerificationBlock>,
    ) -> Result<(), GateError> {
        // Routing ids come from the whole document, test blocks only from its scope
        for raw in self.scanner.scan(&doc.content, &doc.path)? {
            if raw.kind == BlockKind::Conditional {
                let id = raw.require_attribute("context-check", &doc.path)?;
                validation::validate_id(id).map_err(|e| {
                    GateError::structural(
                        Location::at_line(&doc.path, raw.line),
                        format!("invalid context-check: {e}"),
                    )
                })?;
                self.cache.register(
                    id,
                    BlockKind::Conditional,
                    &raw.fingerprint(),
                    Location::at_line(&doc.path, raw.line),
                )?;
            }
        }

        let scoped = doc.scoped_content()?;
        for raw in self.scanner.scan(&scoped, &doc.path)? {
            if raw.kind != BlockKind::Verification {
                continue;
            }
            let id = raw.require_attribute("context-check", &doc.path)?;
            let location = Location::at_line(&doc.path, raw.line);
            match self
                .cache
                .register(id, BlockKind::Verification, &raw.fingerprint(), location)?
            {
                CacheLookup::Hit => continue,
                CacheLookup::Miss => {}
            }

            let block = self.parser.parse(&raw, &doc.path)?;
            for test in &block.tests {
                self.policy.enforce(
                    test.command.source(),
                    &Location::at_line(&doc.path, test.line),
                )?;
            }
            blocks.push(block);
        }
        Ok(())
    }
}
