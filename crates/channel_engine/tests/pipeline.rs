use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use channel_core::{DocumentHeader, ExistingPolicy, FilterRules, WriteMode};
use channel_engine::{
    run_pipeline, FailureKind, FetchError, FetchMetadata, FetchOutput, FetchSettings, Fetcher,
    LoggingProgressSink, PipelineConfig, PipelineError, ProgressSink, ReqwestFetcher,
    SourceConfig, SourceKind,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PLAYLIST_URL: &str = "http://upstream.test/smart.m3u";
const LIST_URL: &str = "http://upstream.test/list.txt";

const PLAYLIST: &str = "\
#EXTM3U
#EXTINF:-1 group-title=\"News\",CNN News
http://a.example/1
#EXTINF:-1 group-title=\"Sport\",ESPN
http://a.example/sport
";

const LIST: &str = "\
News,#genre#
BBC News,http://b.example/2

Sky News,http://b.example/3
Other,#genre#
Fox News,http://b.example/4
";

/// Serves canned bodies; URLs without a body fail with a 404.
struct StubFetcher {
    bodies: HashMap<String, Vec<u8>>,
}

impl StubFetcher {
    fn new(bodies: &[(&str, &[u8])]) -> Self {
        Self {
            bodies: bodies
                .iter()
                .map(|(url, body)| (url.to_string(), body.to_vec()))
                .collect(),
        }
    }
}

#[async_trait::async_trait]
impl Fetcher for StubFetcher {
    async fn fetch(
        &self,
        _source: SourceKind,
        url: &str,
        _sink: &dyn ProgressSink,
    ) -> Result<FetchOutput, FetchError> {
        let Some(bytes) = self.bodies.get(url) else {
            return Err(FetchError {
                kind: FailureKind::HttpStatus(404),
                message: "not found".to_string(),
            });
        };
        Ok(FetchOutput {
            bytes: bytes.clone(),
            metadata: FetchMetadata {
                original_url: url.to_string(),
                final_url: url.to_string(),
                redirect_count: 0,
                content_type: None,
                byte_len: bytes.len() as u64,
            },
        })
    }
}

fn config(dir: &Path) -> PipelineConfig {
    let mut config = PipelineConfig::new(
        SourceConfig {
            url: PLAYLIST_URL.to_string(),
            staging_path: dir.join("smart.m3u"),
        },
        SourceConfig {
            url: LIST_URL.to_string(),
            staging_path: dir.join("list.txt"),
        },
        dir.join("1.m3u"),
    );
    config.header = DocumentHeader {
        epg_url: Some("https://epg.example/epg.xml".to_string()),
    };
    config.rules = FilterRules {
        allowed_group: "News".to_string(),
        section: "News".to_string(),
        section_group: "News List".to_string(),
        keyword: Some("News".to_string()),
        excluded_names: vec!["Promo News".to_string()],
        ..FilterRules::default()
    };
    config
}

fn both_sources() -> StubFetcher {
    StubFetcher::new(&[
        (PLAYLIST_URL, PLAYLIST.as_bytes()),
        (LIST_URL, LIST.as_bytes()),
    ])
}

fn output_urls(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

const EXPECTED: &str = "\
#EXTM3U x-tvg-url=\"https://epg.example/epg.xml\"
#EXTINF:-1 group-title=\"News\",CNN News
http://a.example/1

#EXTINF:-1 group-title=\"News List\",BBC News
http://b.example/2
#EXTINF:-1 group-title=\"News List\",Sky News
http://b.example/3
";

#[tokio::test]
async fn merges_both_sources_with_one_separator() {
    channel_logging::initialize_for_tests();
    let temp = TempDir::new().unwrap();
    let config = config(temp.path());

    let summary = run_pipeline(&config, &both_sources(), &LoggingProgressSink)
        .await
        .unwrap();

    assert_eq!(summary.playlist_entries, 1);
    assert_eq!(summary.list_entries, 2);
    assert_eq!(summary.new_entries, 3);
    assert!(summary.failed_sources.is_empty());
    assert_eq!(fs::read_to_string(&config.output_path).unwrap(), EXPECTED);
}

#[tokio::test]
async fn rerun_is_idempotent_in_both_modes() {
    channel_logging::initialize_for_tests();
    for mode in [WriteMode::Rewrite, WriteMode::Append] {
        let temp = TempDir::new().unwrap();
        let mut config = config(temp.path());
        config.write_mode = mode;

        run_pipeline(&config, &both_sources(), &LoggingProgressSink)
            .await
            .unwrap();
        let second = run_pipeline(&config, &both_sources(), &LoggingProgressSink)
            .await
            .unwrap();

        assert_eq!(second.new_entries, 0, "mode {mode:?}");
        assert_eq!(second.existing_urls, 3);
        assert_eq!(fs::read_to_string(&config.output_path).unwrap(), EXPECTED);

        let urls = output_urls(&config.output_path);
        let unique: HashSet<_> = urls.iter().collect();
        assert_eq!(unique.len(), urls.len());
    }
}

#[tokio::test]
async fn known_url_is_not_written_again() {
    channel_logging::initialize_for_tests();
    let temp = TempDir::new().unwrap();
    let mut config = config(temp.path());
    config.write_mode = WriteMode::Append;
    fs::write(
        &config.output_path,
        "#EXTM3U\n#EXTINF:-1 group-title=\"News\",CNN News\nhttp://a.example/1\n",
    )
    .unwrap();

    let fetcher = StubFetcher::new(&[(PLAYLIST_URL, PLAYLIST.as_bytes())]);
    let summary = run_pipeline(&config, &fetcher, &LoggingProgressSink)
        .await
        .unwrap();

    assert_eq!(summary.new_entries, 0);
    assert!(!summary.write.touched);
    assert_eq!(output_urls(&config.output_path), vec!["http://a.example/1"]);
}

#[tokio::test]
async fn single_source_failure_still_publishes_the_other() {
    channel_logging::initialize_for_tests();
    let temp = TempDir::new().unwrap();
    let config = config(temp.path());
    let fetcher = StubFetcher::new(&[(PLAYLIST_URL, PLAYLIST.as_bytes())]);

    let summary = run_pipeline(&config, &fetcher, &LoggingProgressSink)
        .await
        .unwrap();

    assert_eq!(summary.failed_sources, vec![SourceKind::DelimitedList]);
    assert_eq!(
        fs::read_to_string(&config.output_path).unwrap(),
        "#EXTM3U x-tvg-url=\"https://epg.example/epg.xml\"\n\
#EXTINF:-1 group-title=\"News\",CNN News\nhttp://a.example/1\n"
    );
}

#[tokio::test]
async fn undecodable_source_counts_as_failed() {
    channel_logging::initialize_for_tests();
    let temp = TempDir::new().unwrap();
    let mut config = config(temp.path());
    config.encodings = vec!["utf-8".to_string()];
    let fetcher = StubFetcher::new(&[
        (PLAYLIST_URL, PLAYLIST.as_bytes()),
        (LIST_URL, &b"News,#genre#\n\xff\xfe,http://b.example/9\n"[..]),
    ]);

    let summary = run_pipeline(&config, &fetcher, &LoggingProgressSink)
        .await
        .unwrap();
    assert_eq!(summary.failed_sources, vec![SourceKind::DelimitedList]);
    assert_eq!(summary.new_entries, 1);
}

#[tokio::test]
async fn all_sources_failing_leaves_placeholder_document() {
    channel_logging::initialize_for_tests();
    let temp = TempDir::new().unwrap();
    let config = config(temp.path());
    let fetcher = StubFetcher::new(&[]);

    let err = run_pipeline(&config, &fetcher, &LoggingProgressSink)
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::AllSourcesFailed { .. }));
    assert_eq!(
        fs::read_to_string(&config.output_path).unwrap(),
        "#EXTM3U x-tvg-url=\"https://epg.example/epg.xml\"\n# No channels available\n"
    );
}

#[tokio::test]
async fn all_sources_failing_keeps_existing_output() {
    channel_logging::initialize_for_tests();
    let temp = TempDir::new().unwrap();
    let config = config(temp.path());
    fs::write(&config.output_path, EXPECTED).unwrap();

    let err = run_pipeline(&config, &StubFetcher::new(&[]), &LoggingProgressSink)
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::AllSourcesFailed { .. }));
    assert_eq!(fs::read_to_string(&config.output_path).unwrap(), EXPECTED);
}

#[tokio::test]
async fn prune_removes_legacy_entries_before_merging() {
    channel_logging::initialize_for_tests();
    let temp = TempDir::new().unwrap();
    let mut config = config(temp.path());
    config.write_mode = WriteMode::Append;
    config.existing_policy = ExistingPolicy::Prune;
    fs::write(
        &config.output_path,
        "#EXTM3U x-tvg-url=\"https://epg.example/epg.xml\"\n\
#EXTINF:-1 group-title=\"News\",Promo News\nhttp://legacy.example/promo\n\
#EXTINF:-1 group-title=\"News\",CNN News\nhttp://a.example/1\n",
    )
    .unwrap();

    let summary = run_pipeline(&config, &both_sources(), &LoggingProgressSink)
        .await
        .unwrap();

    assert_eq!(summary.pruned, 1);
    assert_eq!(summary.new_entries, 2);
    assert_eq!(
        output_urls(&config.output_path),
        vec!["http://a.example/1", "http://b.example/2", "http://b.example/3"]
    );
}

#[tokio::test]
async fn prune_with_append_drops_url_without_directive() {
    channel_logging::initialize_for_tests();
    let temp = TempDir::new().unwrap();
    let mut config = config(temp.path());
    config.write_mode = WriteMode::Append;
    config.existing_policy = ExistingPolicy::Prune;
    fs::write(&config.output_path, "#EXTM3U\nhttp://a.example/1\n").unwrap();

    let summary = run_pipeline(&config, &both_sources(), &LoggingProgressSink)
        .await
        .unwrap();

    assert_eq!(summary.pruned, 1);
    assert_eq!(summary.new_entries, 3);
    assert_eq!(
        output_urls(&config.output_path),
        vec!["http://a.example/1", "http://b.example/2", "http://b.example/3"]
    );
}

#[tokio::test]
async fn rewrite_keeps_url_without_directive() {
    channel_logging::initialize_for_tests();
    let temp = TempDir::new().unwrap();
    let config = config(temp.path());
    fs::write(&config.output_path, "#EXTM3U\nhttp://legacy.example/x\n").unwrap();

    let summary = run_pipeline(&config, &both_sources(), &LoggingProgressSink)
        .await
        .unwrap();

    assert_eq!(summary.new_entries, 3);
    assert_eq!(
        output_urls(&config.output_path),
        vec![
            "http://legacy.example/x",
            "http://a.example/1",
            "http://b.example/2",
            "http://b.example/3"
        ]
    );
}

#[tokio::test]
async fn unknown_encoding_label_fails_before_fetching() {
    channel_logging::initialize_for_tests();
    let temp = TempDir::new().unwrap();
    let mut config = config(temp.path());
    config.encodings = vec!["utf-8".to_string(), "bogus".to_string()];

    let err = run_pipeline(&config, &both_sources(), &LoggingProgressSink)
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::Decode(_)));
    assert!(!config.output_path.exists());
    assert!(!config.playlist.staging_path.exists());
}

#[tokio::test]
async fn end_to_end_over_http() {
    channel_logging::initialize_for_tests();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/smart.m3u"))
        .respond_with(ResponseTemplate::new(200).set_body_string(PLAYLIST))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/list.txt"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let mut config = config(temp.path());
    config.playlist.url = format!("{}/smart.m3u", server.uri());
    config.list.url = format!("{}/list.txt", server.uri());

    let fetcher = ReqwestFetcher::new(FetchSettings::default());
    let summary = run_pipeline(&config, &fetcher, &LoggingProgressSink)
        .await
        .unwrap();

    assert_eq!(summary.failed_sources, vec![SourceKind::DelimitedList]);
    assert_eq!(output_urls(&config.output_path), vec!["http://a.example/1"]);
    assert!(config.playlist.staging_path.exists());
}
