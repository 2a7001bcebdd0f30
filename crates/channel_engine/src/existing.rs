use std::path::Path;

use channel_core::{
    render_document, scan_existing, DocumentHeader, ExistingOutput, ExistingPolicy, FilterRules,
};
use channel_logging::{channel_info, channel_warn};
use encoding_rs::Encoding;

use crate::decode::{decode_file, DecodeError};
use crate::persist::{write_atomic, PersistError};

#[derive(Debug, thiserror::Error)]
pub enum ExistingError {
    #[error("existing output could not be read: {0}")]
    Decode(#[from] DecodeError),
    #[error("pruned output could not be written: {0}")]
    Persist(#[from] PersistError),
}

/// Loads the dedup baseline from a previous output document.
///
/// Under [`ExistingPolicy::Prune`] the document is rewritten in place with
/// only the retained entries whenever anything was dropped.
pub fn load_existing(
    path: &Path,
    policy: ExistingPolicy,
    rules: &FilterRules,
    header: &DocumentHeader,
    encodings: &[&'static Encoding],
) -> Result<ExistingOutput, ExistingError> {
    if !path.exists() {
        channel_info!("No existing output at {:?}; starting fresh", path);
        return Ok(ExistingOutput::default());
    }

    let decoded = decode_file(path, encodings)?;
    let existing = scan_existing(decoded.lines.iter().map(String::as_str), policy, rules);
    channel_info!(
        "Existing output {:?}: {} known URLs, {} entries ({})",
        path,
        existing.known_urls.len(),
        existing.entry_count(),
        decoded.encoding_label
    );
    if !existing.had_header {
        channel_warn!("Existing output {:?} does not start with a playlist header", path);
    }

    if policy == ExistingPolicy::Prune && existing.needs_rewrite() {
        write_atomic(path, render_document(header, &existing.items).as_bytes())?;
        channel_info!(
            "Pruned {:?}: dropped {} invalid and {} duplicate entries",
            path,
            existing.pruned,
            existing.duplicates
        );
    }
    Ok(existing)
}
