use std::sync::LazyLock;

use regex::Regex;

pub const DIRECTIVE_PREFIX: &str = "#EXTINF:";

static GROUP_TITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"group-title\s*=\s*["']([^"']+)["']"#).expect("group-title pattern compiles")
});

/// One playable channel: a directive line followed by its stream URL.
///
/// `stream_url` is the identity key for deduplication and is compared verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelEntry {
    pub group_title: String,
    pub channel_name: String,
    pub stream_url: String,
    directive: String,
}

impl ChannelEntry {
    /// Builds an entry with a synthesized `#EXTINF:-1 group-title="..."` directive.
    pub fn synthesize(
        group_title: impl Into<String>,
        channel_name: impl Into<String>,
        stream_url: impl Into<String>,
    ) -> Self {
        let group_title = group_title.into();
        let channel_name = channel_name.into();
        let directive = format!("{DIRECTIVE_PREFIX}-1 group-title=\"{group_title}\",{channel_name}");
        Self {
            group_title,
            channel_name,
            stream_url: stream_url.into(),
            directive,
        }
    }

    /// Pairs a raw directive line with its URL line, keeping the directive verbatim.
    ///
    /// Returns `None` when `directive` is not an `#EXTINF:` line.
    pub fn from_directive(directive: &str, stream_url: &str) -> Option<Self> {
        let directive = directive.trim();
        if !is_directive(directive) {
            return None;
        }
        Some(Self {
            group_title: group_title(directive).unwrap_or_default().to_string(),
            channel_name: display_name(directive).to_string(),
            stream_url: stream_url.trim().to_string(),
            directive: directive.to_string(),
        })
    }

    pub fn directive(&self) -> &str {
        &self.directive
    }

    /// Appends the two-line serialized form to `out`.
    pub fn write_to(&self, out: &mut String) {
        out.push_str(&self.directive);
        out.push('\n');
        out.push_str(&self.stream_url);
        out.push('\n');
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaylistItem {
    Entry(ChannelEntry),
    /// A stream URL carried over from an existing document without a directive.
    Bare(String),
    /// Renders as exactly one blank line between groups.
    GroupBreak,
}

impl PlaylistItem {
    pub fn entry(&self) -> Option<&ChannelEntry> {
        match self {
            PlaylistItem::Entry(entry) => Some(entry),
            PlaylistItem::Bare(_) | PlaylistItem::GroupBreak => None,
        }
    }

    /// Whether the item renders as a playlist line rather than a break.
    pub fn is_content(&self) -> bool {
        !matches!(self, PlaylistItem::GroupBreak)
    }
}

pub fn is_directive(line: &str) -> bool {
    line.starts_with(DIRECTIVE_PREFIX)
}

/// Value of the `group-title` attribute, if present.
pub fn group_title(directive: &str) -> Option<&str> {
    GROUP_TITLE
        .captures(directive)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Display name: the text after the first comma outside a quoted attribute value.
pub fn display_name(directive: &str) -> &str {
    let body = directive.strip_prefix(DIRECTIVE_PREFIX).unwrap_or(directive);
    let mut quote: Option<char> = None;
    for (idx, c) in body.char_indices() {
        match quote {
            Some(open) if c == open => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None if c == ',' => return body[idx + 1..].trim(),
            None => {}
        }
    }
    ""
}
