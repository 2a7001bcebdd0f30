use std::collections::HashSet;

use crate::entry::{ChannelEntry, PlaylistItem};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MergeOutcome {
    pub items: Vec<PlaylistItem>,
    pub from_primary: usize,
    pub from_secondary: usize,
}

impl MergeOutcome {
    pub fn entry_count(&self) -> usize {
        self.from_primary + self.from_secondary
    }

    pub fn is_empty(&self) -> bool {
        self.entry_count() == 0
    }
}

/// Merges both sources in order, keeping the first occurrence of each URL.
///
/// Accepted URLs are added to `known_urls` as they are kept, so later entries
/// are deduplicated against earlier ones as well as against history.
pub fn merge_sources(
    known_urls: &mut HashSet<String>,
    primary: Vec<ChannelEntry>,
    secondary: Vec<ChannelEntry>,
) -> MergeOutcome {
    let mut items = Vec::with_capacity(primary.len() + secondary.len() + 1);
    let from_primary = admit(known_urls, primary, &mut items);

    let mut tail = Vec::with_capacity(secondary.len());
    let from_secondary = admit(known_urls, secondary, &mut tail);

    if from_primary > 0 && from_secondary > 0 {
        items.push(PlaylistItem::GroupBreak);
    }
    items.extend(tail);

    MergeOutcome {
        items,
        from_primary,
        from_secondary,
    }
}

fn admit(
    known_urls: &mut HashSet<String>,
    entries: Vec<ChannelEntry>,
    out: &mut Vec<PlaylistItem>,
) -> usize {
    let before = out.len();
    for entry in entries {
        if known_urls.insert(entry.stream_url.clone()) {
            out.push(PlaylistItem::Entry(entry));
        }
    }
    out.len() - before
}
