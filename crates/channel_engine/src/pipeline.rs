use std::path::PathBuf;

use channel_core::{
    merge_sources, parse_delimited_list, parse_tagged_playlist, render_document, ChannelEntry,
    DocumentHeader, ExistingPolicy, FilterRules, WriteMode,
};
use channel_logging::{channel_info, channel_warn};
use encoding_rs::Encoding;

use crate::decode::{decode_file, resolve_encodings, DecodeError, DEFAULT_ENCODINGS};
use crate::existing::{load_existing, ExistingError};
use crate::fetch::{download_to, Fetcher, ProgressSink};
use crate::persist::{write_atomic, PersistError};
use crate::writer::{write_playlist, WriteSummary};
use crate::{FailureKind, PipelineEvent, SourceKind, SourceProgress, Stage};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceConfig {
    pub url: String,
    /// Where the raw download is staged before decoding.
    pub staging_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub playlist: SourceConfig,
    pub list: SourceConfig,
    pub output_path: PathBuf,
    pub header: DocumentHeader,
    pub rules: FilterRules,
    pub write_mode: WriteMode,
    pub existing_policy: ExistingPolicy,
    pub encodings: Vec<String>,
}

impl PipelineConfig {
    pub fn new(playlist: SourceConfig, list: SourceConfig, output_path: PathBuf) -> Self {
        Self {
            playlist,
            list,
            output_path,
            header: DocumentHeader::default(),
            rules: FilterRules::default(),
            write_mode: WriteMode::default(),
            existing_policy: ExistingPolicy::default(),
            encodings: DEFAULT_ENCODINGS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub playlist_entries: usize,
    pub list_entries: usize,
    pub existing_urls: usize,
    pub pruned: usize,
    pub new_entries: usize,
    pub failed_sources: Vec<SourceKind>,
    pub write: WriteSummary,
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("invalid encoding configuration: {0}")]
    Decode(#[from] DecodeError),
    #[error("every source failed; see {output:?}")]
    AllSourcesFailed { output: PathBuf },
    #[error(transparent)]
    Existing(#[from] ExistingError),
    #[error("failed to write playlist: {0}")]
    Persist(#[from] PersistError),
}

/// Runs one fetch, parse, merge and write cycle.
///
/// A source that fails to download or decode contributes nothing; the run only
/// fails when no source succeeded, and then still leaves a valid document.
pub async fn run_pipeline(
    config: &PipelineConfig,
    fetcher: &dyn Fetcher,
    sink: &dyn ProgressSink,
) -> Result<RunSummary, PipelineError> {
    let encodings = resolve_encodings(config.encodings.as_slice())?;
    channel_info!("Merging playlist sources into {:?}", config.output_path);

    let playlist = ingest_source(
        fetcher,
        SourceKind::TaggedPlaylist,
        &config.playlist,
        config,
        &encodings,
        sink,
    )
    .await;
    let list = ingest_source(
        fetcher,
        SourceKind::DelimitedList,
        &config.list,
        config,
        &encodings,
        sink,
    )
    .await;

    let mut failed_sources = Vec::new();
    if playlist.is_none() {
        failed_sources.push(SourceKind::TaggedPlaylist);
    }
    if list.is_none() {
        failed_sources.push(SourceKind::DelimitedList);
    }
    if playlist.is_none() && list.is_none() {
        ensure_minimal_document(config)?;
        return Err(PipelineError::AllSourcesFailed {
            output: config.output_path.clone(),
        });
    }

    let playlist = playlist.unwrap_or_default();
    let list = list.unwrap_or_default();
    let (playlist_entries, list_entries) = (playlist.len(), list.len());

    let existing = load_existing(
        &config.output_path,
        config.existing_policy,
        &config.rules,
        &config.header,
        &encodings,
    )?;
    let existing_urls = existing.known_urls.len();
    let pruned = existing.pruned;

    let mut known = existing.known_urls;
    let merged = merge_sources(&mut known, playlist, list);
    channel_info!(
        "{} new entries ({} from {}, {} from {})",
        merged.entry_count(),
        merged.from_primary,
        SourceKind::TaggedPlaylist,
        merged.from_secondary,
        SourceKind::DelimitedList
    );

    let new_entries = merged.entry_count();
    let items = match config.write_mode {
        WriteMode::Rewrite => {
            let mut items = existing.items;
            items.extend(merged.items);
            items
        }
        WriteMode::Append => merged.items,
    };
    let write = write_playlist(&config.output_path, config.write_mode, &config.header, &items)?;

    Ok(RunSummary {
        playlist_entries,
        list_entries,
        existing_urls,
        pruned,
        new_entries,
        failed_sources,
        write,
    })
}

async fn ingest_source(
    fetcher: &dyn Fetcher,
    kind: SourceKind,
    source: &SourceConfig,
    config: &PipelineConfig,
    encodings: &[&'static Encoding],
    sink: &dyn ProgressSink,
) -> Option<Vec<ChannelEntry>> {
    if !download_to(fetcher, kind, &source.url, &source.staging_path, sink).await {
        return None;
    }

    sink.emit(PipelineEvent::Progress(SourceProgress {
        source: kind,
        stage: Stage::Decoding,
        bytes: None,
        entries: None,
    }));
    let decoded = match decode_file(&source.staging_path, encodings) {
        Ok(decoded) => decoded,
        Err(err) => {
            channel_warn!(
                "Could not decode {} staged at {:?}: {}",
                kind,
                source.staging_path,
                err
            );
            sink.emit(PipelineEvent::SourceCompleted {
                source: kind,
                result: Err(FailureKind::Decode),
            });
            return None;
        }
    };

    sink.emit(PipelineEvent::Progress(SourceProgress {
        source: kind,
        stage: Stage::Parsing,
        bytes: None,
        entries: None,
    }));
    let lines = decoded.lines.iter().map(String::as_str);
    let entries = match kind {
        SourceKind::TaggedPlaylist => parse_tagged_playlist(lines, &config.rules),
        SourceKind::DelimitedList => parse_delimited_list(lines, &config.rules),
    };
    channel_info!(
        "{} decoded as {}: {} lines, {} accepted entries",
        kind,
        decoded.encoding_label,
        decoded.lines.len(),
        entries.len()
    );

    sink.emit(PipelineEvent::Progress(SourceProgress {
        source: kind,
        stage: Stage::Done,
        bytes: None,
        entries: Some(entries.len()),
    }));
    sink.emit(PipelineEvent::SourceCompleted {
        source: kind,
        result: Ok(entries.len()),
    });
    Some(entries)
}

/// Writes header plus placeholder when no output exists yet; never touches an existing one.
fn ensure_minimal_document(config: &PipelineConfig) -> Result<(), PersistError> {
    if config.output_path.exists() {
        channel_warn!(
            "All sources failed; keeping existing output {:?}",
            config.output_path
        );
        return Ok(());
    }
    let document = render_document(&config.header, &[]);
    write_atomic(&config.output_path, document.as_bytes())?;
    channel_warn!(
        "All sources failed; wrote empty playlist to {:?}",
        config.output_path
    );
    Ok(())
}
