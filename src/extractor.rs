//! Original-message header extraction
//!
//! A bounce notification usually carries the user's original outbound
//! email as an embedded `message/rfc822` MIME part. Finding it is
//! heuristic, so extraction is an ordered list of strategies tried in
//! sequence, first success wins:
//!
//! 1. walk the BODYSTRUCTURE tree for a `message/rfc822` part and
//!    fetch it,
//! 2. try the fixed part numbers `2` and `3` (common multipart DSN
//!    layouts put the returned message there),
//! 3. fall back to the bounce message's own top-level headers.
//!
//! A failed fetch inside a strategy means "not found", never a hard
//! error; only exhausting every strategy fails.

use crate::error::{Error, Result};
use crate::imap::MailboxSession;
use imap_proto::types::BodyStructure;
use regex::RegexBuilder;
use std::fmt;
use tracing::debug;

/// Where an extracted header block came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderSource {
    /// A `message/rfc822` part located via BODYSTRUCTURE.
    EmbeddedPart(String),
    /// One of the fixed fallback part numbers.
    FixedPart(String),
    /// The bounce message's own headers (lowest fidelity).
    OwnHeaders,
}

impl fmt::Display for HeaderSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmbeddedPart(part) => write!(f, "embedded part {part}"),
            Self::FixedPart(part) => write!(f, "fallback part {part}"),
            Self::OwnHeaders => f.write_str("top-level headers"),
        }
    }
}

/// An extracted header block plus the strategy that produced it.
#[derive(Debug, Clone)]
pub struct OriginalHeaders {
    pub block: String,
    pub source: HeaderSource,
}

/// Extract the header block of the original message embedded in the
/// bounce at `uid`.
///
/// # Errors
///
/// Returns [`Error::Extraction`] only when every strategy comes up
/// empty, including the message's own headers.
pub async fn extract_original_headers<S: MailboxSession>(
    session: &mut S,
    uid: u32,
) -> Result<OriginalHeaders> {
    // Strategy 1: locate the embedded message via BODYSTRUCTURE.
    match session.embedded_part_path(uid).await {
        Ok(Some(part)) => {
            if let Some(block) = fetch_headers_from_part(session, uid, &part).await {
                return Ok(OriginalHeaders {
                    block,
                    source: HeaderSource::EmbeddedPart(part),
                });
            }
        }
        Ok(None) => {}
        Err(e) => debug!("Structure lookup failed for UID {}: {}", uid, e),
    }

    // Strategy 2: common DSN layouts put the returned message at a
    // fixed part number.
    for part in ["2", "3"] {
        if let Some(block) = fetch_headers_from_part(session, uid, part).await {
            return Ok(OriginalHeaders {
                block,
                source: HeaderSource::FixedPart(part.to_string()),
            });
        }
    }

    // Strategy 3: the bounce's own headers.
    match session.fetch_header_block(uid).await {
        Ok(Some(raw)) => {
            let block = header_block(&raw);
            if !block.trim().is_empty() {
                return Ok(OriginalHeaders {
                    block,
                    source: HeaderSource::OwnHeaders,
                });
            }
        }
        Ok(None) => {}
        Err(e) => debug!("Header fetch failed for UID {}: {}", uid, e),
    }

    Err(Error::Extraction(format!(
        "no header block recoverable for UID {uid}"
    )))
}

async fn fetch_headers_from_part<S: MailboxSession>(
    session: &mut S,
    uid: u32,
    part: &str,
) -> Option<String> {
    match session.fetch_part(uid, part).await {
        Ok(Some(raw)) => {
            let block = header_block(&raw);
            if block.trim().is_empty() { None } else { Some(block) }
        }
        Ok(None) => None,
        Err(e) => {
            debug!("Part {} fetch failed for UID {}: {}", part, uid, e);
            None
        }
    }
}

/// Part identifier of the first `message/rfc822` part in a
/// BODYSTRUCTURE tree, in IMAP dotted-path form.
///
/// A top-level `message/rfc822` (the bounce *is* a forwarded
/// message) maps to part `1` per RFC 3501 part numbering.
#[must_use]
pub fn embedded_message_part(structure: &BodyStructure<'_>) -> Option<String> {
    fn walk(node: &BodyStructure<'_>, path: &mut Vec<u32>) -> Option<String> {
        match node {
            BodyStructure::Message { common, .. }
                if common.ty.ty.eq_ignore_ascii_case("message")
                    && common.ty.subtype.eq_ignore_ascii_case("rfc822") =>
            {
                if path.is_empty() {
                    Some("1".to_string())
                } else {
                    Some(
                        path.iter()
                            .map(ToString::to_string)
                            .collect::<Vec<_>>()
                            .join("."),
                    )
                }
            }
            BodyStructure::Multipart { bodies, .. } => {
                for (index, child) in bodies.iter().enumerate() {
                    path.push(u32::try_from(index + 1).unwrap_or(u32::MAX));
                    if let Some(found) = walk(child, path) {
                        return Some(found);
                    }
                    path.pop();
                }
                None
            }
            _ => None,
        }
    }

    walk(structure, &mut Vec::new())
}

/// Everything before the first blank line (CRLF-CRLF or LF-LF),
/// decoded lossily. Input without a blank line is all headers.
#[must_use]
pub fn header_block(raw: &[u8]) -> String {
    let text = String::from_utf8_lossy(raw);
    let end = text
        .find("\r\n\r\n")
        .or_else(|| text.find("\n\n"))
        .unwrap_or(text.len());
    text[..end].to_string()
}

/// Undo RFC 5322 folding: a line starting with space or tab continues
/// the previous header line.
#[must_use]
pub fn unfold(block: &str) -> String {
    let mut out = String::with_capacity(block.len());
    for line in block.lines() {
        if (line.starts_with(' ') || line.starts_with('\t')) && !out.is_empty() {
            out.push(' ');
            out.push_str(line.trim_start());
        } else {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(line);
        }
    }
    out
}

/// All values of `name:` headers in the block, unfolded and trimmed.
#[must_use]
pub fn header_values(block: &str, name: &str) -> Vec<String> {
    let pattern = format!(r"(?mi)^{}:[ \t]*(.*)$", regex::escape(name));
    let Ok(re) = RegexBuilder::new(&pattern).build() else {
        return Vec::new();
    };
    re.captures_iter(&unfold(block))
        .map(|cap| cap[1].trim().to_string())
        .collect()
}

/// First `To:` value in the block.
#[must_use]
pub fn first_to_address(block: &str) -> Option<String> {
    header_values(block, "To").into_iter().find(|v| !v.is_empty())
}

/// All `Cc:` addresses in the block: comma-split, trimmed, empties
/// discarded.
#[must_use]
pub fn cc_addresses(block: &str) -> Vec<String> {
    header_values(block, "Cc")
        .iter()
        .flat_map(|v| crate::settings::split_addresses(v))
        .collect()
}
