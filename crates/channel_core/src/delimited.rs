use crate::config::FilterRules;
use crate::entry::ChannelEntry;

pub const SECTION_MARKER_SUFFIX: &str = ",#genre#";

/// Extracts `name,url` pairs from the configured section of a delimited list.
///
/// The section runs from the exact `<section>,#genre#` line to the next
/// `...,#genre#` marker or end of input, so only its first occurrence is read.
/// Blank lines do not end it.
pub fn parse_delimited_list<'a, I>(lines: I, rules: &FilterRules) -> Vec<ChannelEntry>
where
    I: IntoIterator<Item = &'a str>,
{
    let marker = rules.section_marker();
    let mut in_section = false;
    let mut entries = Vec::new();

    for line in lines {
        let line = line.trim();
        if !in_section {
            in_section = line == marker;
            continue;
        }
        if line.ends_with(SECTION_MARKER_SUFFIX) {
            break;
        }
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(entry) = parse_pair(line, rules) {
            entries.push(entry);
        }
    }
    entries
}

fn parse_pair(line: &str, rules: &FilterRules) -> Option<ChannelEntry> {
    let (name, url) = line.split_once(',')?;
    let (name, url) = (name.trim(), url.trim());
    if !rules.matches_keyword(name) || !rules.accepts_name(name) || !rules.accepts_url(url) {
        return None;
    }
    Some(ChannelEntry::synthesize(rules.section_group.as_str(), name, url))
}
