//! Channel core: pure parsing, filtering and merge logic for playlist sources.
mod config;
mod delimited;
mod document;
mod entry;
mod existing;
mod merge;
mod tagged;

pub use config::{ExistingPolicy, FilterRules, WriteMode};
pub use delimited::{parse_delimited_list, SECTION_MARKER_SUFFIX};
pub use document::{
    has_entries, render_document, render_items, starts_with_header, DocumentHeader,
    EMPTY_PLAYLIST_MARKER, HEADER_MARKER,
};
pub use entry::{display_name, group_title, is_directive, ChannelEntry, PlaylistItem, DIRECTIVE_PREFIX};
pub use existing::{scan_existing, ExistingOutput};
pub use merge::{merge_sources, MergeOutcome};
pub use tagged::{parse_tagged_playlist, step, ParseState};
