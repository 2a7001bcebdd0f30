use serde::{Deserialize, Serialize};

use crate::delimited::SECTION_MARKER_SUFFIX;
use crate::entry::ChannelEntry;

/// Acceptance rules shared by both source parsers and the existing-output pruner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterRules {
    /// `group-title` a tagged-playlist directive must carry.
    pub allowed_group: String,
    /// Section name in the delimited list, matched as `<section>,#genre#`.
    pub section: String,
    /// Group label written for delimited-list entries.
    pub section_group: String,
    /// When set, only entries mentioning this keyword are kept.
    pub keyword: Option<String>,
    pub excluded_names: Vec<String>,
    pub min_name_chars: usize,
    /// URLs must be strictly longer than this.
    pub min_url_chars: usize,
    pub accepted_schemes: Vec<String>,
}

impl Default for FilterRules {
    fn default() -> Self {
        Self {
            allowed_group: "GPT-台湾".to_string(),
            section: "4Gtv".to_string(),
            section_group: "4Gtv".to_string(),
            keyword: Some("新闻".to_string()),
            excluded_names: ["4Gtv", "港台", "内地", "国外"]
                .into_iter()
                .map(str::to_string)
                .collect(),
            min_name_chars: 2,
            min_url_chars: 10,
            accepted_schemes: vec!["http://".to_string(), "https://".to_string()],
        }
    }
}

impl FilterRules {
    pub fn accepts_url(&self, url: &str) -> bool {
        self.accepted_schemes
            .iter()
            .any(|scheme| url.starts_with(scheme.as_str()))
            && url.chars().count() > self.min_url_chars
    }

    pub fn accepts_name(&self, name: &str) -> bool {
        !self.excluded_names.iter().any(|excluded| excluded == name)
            && name.chars().count() >= self.min_name_chars
    }

    /// Global validity rule every emitted entry must satisfy.
    pub fn is_valid(&self, entry: &ChannelEntry) -> bool {
        self.accepts_url(&entry.stream_url) && self.accepts_name(&entry.channel_name)
    }

    pub fn matches_keyword(&self, haystack: &str) -> bool {
        match self.keyword.as_deref() {
            Some(keyword) if !keyword.is_empty() => haystack.contains(keyword),
            _ => true,
        }
    }

    pub fn section_marker(&self) -> String {
        format!("{}{SECTION_MARKER_SUFFIX}", self.section)
    }
}

/// How the output document is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    /// Write header, carried-over entries and new entries to a fresh file.
    #[default]
    Rewrite,
    /// Append only new entries, writing the header if the file lacks one.
    Append,
}

/// How the previous output document is treated before merging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExistingPolicy {
    /// Collect published URLs as-is.
    #[default]
    Scan,
    /// Drop entries that fail the current rules and rewrite the file.
    Prune,
}
