use crate::entry::PlaylistItem;

pub const HEADER_MARKER: &str = "#EXTM3U";
/// Written after the header when a document holds no entries.
pub const EMPTY_PLAYLIST_MARKER: &str = "# No channels available";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DocumentHeader {
    /// Optional `x-tvg-url` guide URL.
    pub epg_url: Option<String>,
}

impl DocumentHeader {
    pub fn line(&self) -> String {
        match self.epg_url.as_deref() {
            Some(url) if !url.is_empty() => format!("{HEADER_MARKER} x-tvg-url=\"{url}\""),
            _ => HEADER_MARKER.to_string(),
        }
    }
}

pub fn starts_with_header(text: &str) -> bool {
    text.trim_start_matches('\u{feff}').starts_with(HEADER_MARKER)
}

pub fn has_entries(items: &[PlaylistItem]) -> bool {
    items.iter().any(PlaylistItem::is_content)
}

/// Renders entries, emitting one blank line per group break.
///
/// Breaks at either end and repeated breaks are collapsed.
pub fn render_items(items: &[PlaylistItem]) -> String {
    let mut out = String::new();
    let mut pending_break = false;
    let mut wrote_entry = false;
    for item in items {
        match item {
            PlaylistItem::GroupBreak => pending_break = wrote_entry,
            content => {
                if pending_break {
                    out.push('\n');
                    pending_break = false;
                }
                match content {
                    PlaylistItem::Entry(entry) => entry.write_to(&mut out),
                    PlaylistItem::Bare(url) => {
                        out.push_str(url);
                        out.push('\n');
                    }
                    PlaylistItem::GroupBreak => {}
                }
                wrote_entry = true;
            }
        }
    }
    out
}

/// Full document text: header, then items or the empty-playlist marker.
pub fn render_document(header: &DocumentHeader, items: &[PlaylistItem]) -> String {
    let mut out = header.line();
    out.push('\n');
    if has_entries(items) {
        out.push_str(&render_items(items));
    } else {
        out.push_str(EMPTY_PLAYLIST_MARKER);
        out.push('\n');
    }
    out
}
