use crate::config::FilterRules;
use crate::entry::{group_title, is_directive, ChannelEntry};

/// Line-scanner state for tagged playlists.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ParseState {
    #[default]
    AwaitingDirective,
    /// Holds a directive from the allowed group until its URL line arrives.
    DirectivePending(String),
}

/// Pure transition: applies one line to the state and returns any accepted entry.
pub fn step(state: ParseState, line: &str, rules: &FilterRules) -> (ParseState, Option<ChannelEntry>) {
    let line = line.trim();

    if is_directive(line) {
        let next = match group_title(line) {
            Some(group) if group == rules.allowed_group => {
                ParseState::DirectivePending(line.to_string())
            }
            _ => ParseState::AwaitingDirective,
        };
        return (next, None);
    }

    match state {
        ParseState::AwaitingDirective => (ParseState::AwaitingDirective, None),
        // Blank lines and option comments such as #EXTVLCOPT may sit between
        // the directive and its URL.
        ParseState::DirectivePending(directive) if line.is_empty() || line.starts_with('#') => {
            (ParseState::DirectivePending(directive), None)
        }
        ParseState::DirectivePending(directive) => {
            let entry = ChannelEntry::from_directive(&directive, line)
                .filter(|_| rules.matches_keyword(&directive))
                .filter(|entry| rules.is_valid(entry));
            (ParseState::AwaitingDirective, entry)
        }
    }
}

/// Extracts the allowed group's entries from a decoded tagged playlist.
pub fn parse_tagged_playlist<'a, I>(lines: I, rules: &FilterRules) -> Vec<ChannelEntry>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut state = ParseState::default();
    let mut entries = Vec::new();
    for line in lines {
        let (next, entry) = step(state, line, rules);
        state = next;
        entries.extend(entry);
    }
    entries
}
