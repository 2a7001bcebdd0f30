use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use channel_core::{DocumentHeader, ExistingPolicy, FilterRules, WriteMode};
use channel_engine::{FetchSettings, PipelineConfig, SourceConfig, DEFAULT_ENCODINGS};
use channel_logging::channel_debug;
use serde::{Deserialize, Serialize};

use crate::cli::Cli;

/// On-disk configuration. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub playlist: SourceEntry,
    pub list: SourceEntry,
    pub output_path: PathBuf,
    pub epg_url: Option<String>,
    pub write_mode: WriteMode,
    pub existing_policy: ExistingPolicy,
    pub encodings: Vec<String>,
    pub fetch: FetchEntry,
    pub rules: FilterRules,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceEntry {
    pub url: String,
    pub staging_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchEntry {
    pub connect_timeout_secs: u64,
    pub timeout_secs: u64,
    pub redirect_limit: usize,
    pub max_bytes: u64,
    pub verify_tls: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        let staging = std::env::temp_dir();
        Self {
            playlist: SourceEntry {
                url: "https://raw.githubusercontent.com/judy-gotv/iptv/refs/heads/main/smart.m3u"
                    .to_string(),
                staging_path: staging.join("smart.m3u"),
            },
            list: SourceEntry {
                url: "http://2099.tv12.xyz/list.txt".to_string(),
                staging_path: staging.join("4gtv_list.txt"),
            },
            output_path: PathBuf::from("1.m3u"),
            epg_url: Some("https://epg.tv.darwinchow.com/epg.xml".to_string()),
            write_mode: WriteMode::default(),
            existing_policy: ExistingPolicy::default(),
            encodings: DEFAULT_ENCODINGS.iter().map(|s| s.to_string()).collect(),
            fetch: FetchEntry::default(),
            rules: FilterRules::default(),
        }
    }
}

impl Default for FetchEntry {
    fn default() -> Self {
        let settings = FetchSettings::default();
        Self {
            connect_timeout_secs: settings.connect_timeout.as_secs(),
            timeout_secs: settings.request_timeout.as_secs(),
            redirect_limit: settings.redirect_limit,
            max_bytes: settings.max_bytes,
            verify_tls: settings.verify_tls,
        }
    }
}

impl AppConfig {
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {path:?}"))?;
        let config = Self::from_ron(&content)
            .with_context(|| format!("failed to parse config file {path:?}"))?;
        channel_debug!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    pub fn from_ron(content: &str) -> anyhow::Result<Self> {
        Ok(ron::from_str(content)?)
    }

    pub fn to_ron(&self) -> anyhow::Result<String> {
        let pretty = ron::ser::PrettyConfig::new();
        Ok(ron::ser::to_string_pretty(self, pretty)?)
    }

    /// Command-line flags win over the file.
    pub fn apply_overrides(&mut self, cli: &Cli) {
        if let Some(output) = &cli.output {
            self.output_path = output.clone();
        }
        if let Some(mode) = cli.mode {
            self.write_mode = mode.into();
        }
        if cli.prune {
            self.existing_policy = ExistingPolicy::Prune;
        }
        if cli.insecure {
            self.fetch.verify_tls = false;
        }
        if let Some(keyword) = &cli.keyword {
            self.rules.keyword = Some(keyword.clone());
        }
        if cli.no_keyword {
            self.rules.keyword = None;
        }
    }

    pub fn into_parts(self) -> (PipelineConfig, FetchSettings) {
        let fetch = FetchSettings {
            connect_timeout: Duration::from_secs(self.fetch.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.fetch.timeout_secs),
            redirect_limit: self.fetch.redirect_limit,
            max_bytes: self.fetch.max_bytes,
            verify_tls: self.fetch.verify_tls,
        };
        let pipeline = PipelineConfig {
            playlist: SourceConfig {
                url: self.playlist.url,
                staging_path: self.playlist.staging_path,
            },
            list: SourceConfig {
                url: self.list.url,
                staging_path: self.list.staging_path,
            },
            output_path: self.output_path,
            header: DocumentHeader {
                epg_url: self.epg_url,
            },
            rules: self.rules,
            write_mode: self.write_mode,
            existing_policy: self.existing_policy,
            encodings: self.encodings,
        };
        (pipeline, fetch)
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let config = AppConfig::from_ron(
            r#"(
                output_path: "out/news.m3u",
                write_mode: append,
                rules: (allowed_group: "News", keyword: None),
            )"#,
        )
        .unwrap();

        assert_eq!(config.output_path, PathBuf::from("out/news.m3u"));
        assert_eq!(config.write_mode, WriteMode::Append);
        assert_eq!(config.rules.allowed_group, "News");
        assert_eq!(config.rules.keyword, None);
        assert_eq!(config.rules.min_name_chars, 2);
        assert_eq!(config.encodings, AppConfig::default().encodings);
        assert!(config.fetch.verify_tls);
    }

    #[test]
    fn printed_config_parses_back() {
        let config = AppConfig::default();
        let text = config.to_ron().unwrap();
        assert_eq!(AppConfig::from_ron(&text).unwrap(), config);
    }

    #[test]
    fn cli_flags_override_file_values() {
        let cli = Cli::parse_from([
            "channel-merge",
            "--output",
            "merged.m3u",
            "--mode",
            "append",
            "--prune",
            "--insecure",
            "--no-keyword",
        ]);
        let mut config = AppConfig::default();
        config.apply_overrides(&cli);

        assert_eq!(config.output_path, PathBuf::from("merged.m3u"));
        assert_eq!(config.write_mode, WriteMode::Append);
        assert_eq!(config.existing_policy, ExistingPolicy::Prune);
        assert!(!config.fetch.verify_tls);
        assert_eq!(config.rules.keyword, None);

        let (pipeline, fetch) = config.into_parts();
        assert!(!fetch.verify_tls);
        assert_eq!(pipeline.output_path, PathBuf::from("merged.m3u"));
        assert_eq!(
            pipeline.header.line(),
            "#EXTM3U x-tvg-url=\"https://epg.tv.darwinchow.com/epg.xml\""
        );
    }

    #[test]
    fn unknown_fields_are_reported() {
        assert!(AppConfig::from_ron("(no_such_field: 1)").is_err());
    }
}
