use std::collections::HashSet;

use crate::config::{ExistingPolicy, FilterRules};
use crate::document::starts_with_header;
use crate::entry::{is_directive, ChannelEntry, PlaylistItem};

/// What a previously written output document contributes to the next run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExistingOutput {
    /// Reconstructed entries in file order, with group breaks preserved.
    pub items: Vec<PlaylistItem>,
    /// Dedup baseline for the merge.
    pub known_urls: HashSet<String>,
    /// Entries dropped for failing the rules, and URL lines without a
    /// directive (prune policy only).
    pub pruned: usize,
    /// Entries dropped because their URL appeared earlier in the file.
    pub duplicates: usize,
    pub had_header: bool,
}

impl ExistingOutput {
    pub fn entry_count(&self) -> usize {
        self.items.iter().filter(|item| item.entry().is_some()).count()
    }

    /// Whether the document on disk differs from what `items` would render.
    pub fn needs_rewrite(&self) -> bool {
        self.pruned > 0 || self.duplicates > 0
    }
}

/// Rebuilds the baseline from the lines of an existing output document.
pub fn scan_existing<'a, I>(lines: I, policy: ExistingPolicy, rules: &FilterRules) -> ExistingOutput
where
    I: IntoIterator<Item = &'a str>,
{
    let mut out = ExistingOutput::default();
    let mut retained: HashSet<String> = HashSet::new();
    let mut pending: Option<&str> = None;
    let mut blank_seen = false;

    for (idx, raw) in lines.into_iter().enumerate() {
        let line = if idx == 0 {
            out.had_header = starts_with_header(raw);
            raw.trim_start_matches('\u{feff}').trim()
        } else {
            raw.trim()
        };
        if line.is_empty() {
            blank_seen = true;
            continue;
        }
        if line.starts_with('#') {
            if is_directive(line) {
                pending = Some(line);
            }
            continue;
        }

        if policy == ExistingPolicy::Scan {
            out.known_urls.insert(line.to_string());
        }
        let item = match pending.take().and_then(|d| ChannelEntry::from_directive(d, line)) {
            Some(entry) if policy == ExistingPolicy::Prune && !rules.is_valid(&entry) => {
                out.pruned += 1;
                continue;
            }
            Some(entry) => PlaylistItem::Entry(entry),
            None if policy == ExistingPolicy::Prune => {
                out.pruned += 1;
                continue;
            }
            None => PlaylistItem::Bare(line.to_string()),
        };
        if !retained.insert(line.to_string()) {
            out.duplicates += 1;
            continue;
        }
        if blank_seen && !out.items.is_empty() {
            out.items.push(PlaylistItem::GroupBreak);
        }
        blank_seen = false;
        out.items.push(item);
    }

    if policy == ExistingPolicy::Prune {
        out.known_urls = retained;
    }
    out
}
