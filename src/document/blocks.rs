//! Low-level scanning of `<conditional-block>` and `<verification-block>` tags.
//!
//! The scanner only finds tag boundaries and attributes. Interpreting block
//! bodies is left to the router (routing rules) and the extractor (tests).

use std::collections::BTreeMap;
use std::path::Path;

use regex::Regex;
use sha2::{Digest, Sha256};

use crate::error::{GateError, Location};

use super::sections::mask_code_fences;

pub const CONDITIONAL_TAG: &str = "conditional-block";
pub const VERIFICATION_TAG: &str = "verification-block";

/// Which kind of block a tag declares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    Conditional,
    Verification,
}

impl BlockKind {
    pub fn tag(&self) -> &'static str {
        match self {
            BlockKind::Conditional => CONDITIONAL_TAG,
            BlockKind::Verification => VERIFICATION_TAG,
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            CONDITIONAL_TAG => Some(BlockKind::Conditional),
            VERIFICATION_TAG => Some(BlockKind::Verification),
            _ => None,
        }
    }
}

/// A block as found in the document text, before interpretation
#[derive(Debug, Clone)]
pub struct RawBlock {
    pub kind: BlockKind,
    pub attributes: BTreeMap<String, String>,
    pub body: String,
    /// 1-based line of the opening tag
    pub line: usize,
}

impl RawBlock {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Required attribute lookup, failing with the block location.
    pub fn require_attribute(&self, name: &str, path: &Path) -> Result<&str, GateError> {
        match self.attribute(name).map(str::trim) {
            Some(value) if !value.is_empty() => Ok(value),
            _ => Err(GateError::structural(
                Location::at_line(path, self.line),
                format!("<{}> is missing the '{name}' attribute", self.kind.tag()),
            )),
        }
    }

    /// Stable content hash of the block.
    ///
    /// Attributes are hashed in sorted order and the body with per-line
    /// whitespace trimmed and blank lines dropped, so re-indenting a block
    /// does not change its identity.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.kind.tag().as_bytes());
        for (key, value) in &self.attributes {
            hasher.update(b"\0");
            hasher.update(key.as_bytes());
            hasher.update(b"=");
            hasher.update(value.trim().as_bytes());
        }
        hasher.update(b"\0");
        hasher.update(normalize_body(&self.body).as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// Whitespace-normalised body text used for fingerprints.
pub fn normalize_body(body: &str) -> String {
    body.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Compiled patterns for block scanning
pub struct BlockScanner {
    open_tag: Regex,
    attribute: Regex,
}

impl Default for BlockScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockScanner {
    pub fn new() -> Self {
        Self {
            open_tag: Regex::new(r"<(conditional-block|verification-block)\b([^>]*)>")
                .expect("static block tag pattern"),
            attribute: Regex::new(r#"([A-Za-z_][A-Za-z0-9_-]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
                .expect("static attribute pattern"),
        }
    }

    /// Find every block in `content`, skipping fenced code regions.
    pub fn scan(&self, content: &str, path: &Path) -> Result<Vec<RawBlock>, GateError> {
        let masked = mask_code_fences(content);
        let mut blocks = Vec::new();
        let mut cursor = 0;

        while let Some(caps) = self.open_tag.captures_at(&masked, cursor) {
            let whole = caps.get(0).expect("group 0 always present");
            let tag = &caps[1];
            let kind = BlockKind::from_tag(tag).expect("pattern only matches known tags");
            let line = line_of(&masked, whole.start());
            check_no_stray_close(&masked, cursor, whole.start(), path)?;

            let close = format!("</{tag}>");
            let body_start = whole.end();
            let close_pos = masked[body_start..]
                .find(&close)
                .map(|p| body_start + p)
                .ok_or_else(|| {
                    GateError::structural(
                        Location::at_line(path, line),
                        format!("unterminated <{tag}>: missing {close}"),
                    )
                })?;

            let body = &masked[body_start..close_pos];
            if let Some(nested) = self.open_tag.find(body) {
                return Err(GateError::structural(
                    Location::at_line(path, line_of(&masked, body_start + nested.start())),
                    format!("blocks cannot be nested inside <{tag}>"),
                ));
            }

            let attributes = self.parse_attributes(&caps[2], path, line)?;

            blocks.push(RawBlock {
                kind,
                attributes,
                body: body.to_string(),
                line,
            });
            cursor = close_pos + close.len();
        }

        check_no_stray_close(&masked, cursor, masked.len(), path)?;

        Ok(blocks)
    }

    fn parse_attributes(
        &self,
        raw: &str,
        path: &Path,
        line: usize,
    ) -> Result<BTreeMap<String, String>, GateError> {
        let mut attributes = BTreeMap::new();
        for caps in self.attribute.captures_iter(raw) {
            let key = caps[1].to_string();
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .map(|m| m.as_str().to_string())
                .unwrap_or_default();
            if attributes.insert(key.clone(), value).is_some() {
                return Err(GateError::structural(
                    Location::at_line(path, line),
                    format!("duplicate attribute '{key}'"),
                ));
            }
        }
        Ok(attributes)
    }
}

fn check_no_stray_close(masked: &str, from: usize, to: usize, path: &Path) -> Result<(), GateError> {
    let gap = &masked[from..to];
    let stray = [CONDITIONAL_TAG, VERIFICATION_TAG]
        .iter()
        .filter_map(|tag| gap.find(&format!("</{tag}>")))
        .min();
    match stray {
        Some(pos) => Err(GateError::structural(
            Location::at_line(path, line_of(masked, from + pos)),
            "closing tag without a matching opening tag",
        )),
        None => Ok(()),
    }
}

/// 1-based line number of a byte offset
pub fn line_of(content: &str, offset: usize) -> usize {
    content[..offset].matches('\n').count() + 1
}
