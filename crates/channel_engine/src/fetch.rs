use std::path::Path;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::time::Duration;

use channel_logging::{channel_debug, channel_info, channel_warn};
use futures_util::StreamExt;
use reqwest::header::CONTENT_TYPE;

use crate::persist::write_atomic;
use crate::{
    FailureKind, FetchError, FetchMetadata, FetchOutput, PipelineEvent, SourceKind,
    SourceProgress, Stage,
};

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub redirect_limit: usize,
    pub max_bytes: u64,
    /// When false, invalid TLS certificates are accepted.
    pub verify_tls: bool,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(15),
            redirect_limit: 5,
            max_bytes: 32 * 1024 * 1024,
            verify_tls: true,
        }
    }
}

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: PipelineEvent);
}

/// Forwards pipeline events to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingProgressSink;

impl ProgressSink for LoggingProgressSink {
    fn emit(&self, event: PipelineEvent) {
        match event {
            PipelineEvent::Progress(progress) => channel_debug!(
                "{} {:?} bytes={:?} entries={:?}",
                progress.source,
                progress.stage,
                progress.bytes,
                progress.entries
            ),
            PipelineEvent::SourceCompleted {
                source,
                result: Ok(entries),
            } => channel_info!("{} yielded {} candidate entries", source, entries),
            PipelineEvent::SourceCompleted {
                source,
                result: Err(kind),
            } => channel_warn!("{} contributes nothing this run: {}", source, kind),
        }
    }
}

#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(
        &self,
        source: SourceKind,
        url: &str,
        sink: &dyn ProgressSink,
    ) -> Result<FetchOutput, FetchError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    settings: FetchSettings,
}

impl ReqwestFetcher {
    pub fn new(settings: FetchSettings) -> Self {
        Self { settings }
    }

    fn build_client(&self, redirect_counter: Arc<AtomicUsize>) -> Result<reqwest::Client, FetchError> {
        let redirect_limit = self.settings.redirect_limit;
        let policy = reqwest::redirect::Policy::custom(move |attempt| {
            let count = attempt.previous().len();
            redirect_counter.store(count, Ordering::Relaxed);
            if count >= redirect_limit {
                attempt.error("redirect limit exceeded")
            } else {
                attempt.follow()
            }
        });

        reqwest::Client::builder()
            .connect_timeout(self.settings.connect_timeout)
            .timeout(self.settings.request_timeout)
            .redirect(policy)
            .danger_accept_invalid_certs(!self.settings.verify_tls)
            .build()
            .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))
    }

    fn too_large(&self, actual: u64) -> FetchError {
        FetchError::new(
            FailureKind::TooLarge {
                max_bytes: self.settings.max_bytes,
                actual: Some(actual),
            },
            "response too large",
        )
    }
}

#[async_trait::async_trait]
impl Fetcher for ReqwestFetcher {
    async fn fetch(
        &self,
        source: SourceKind,
        url: &str,
        sink: &dyn ProgressSink,
    ) -> Result<FetchOutput, FetchError> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))?;
        let redirect_counter = Arc::new(AtomicUsize::new(0));
        let client = self.build_client(redirect_counter.clone())?;

        let response = client.get(parsed).send().await.map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        if let Some(content_len) = response.content_length() {
            if content_len > self.settings.max_bytes {
                return Err(self.too_large(content_len));
            }
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        sink.emit(PipelineEvent::Progress(SourceProgress {
            source,
            stage: Stage::Downloading,
            bytes: Some(0),
            entries: None,
        }));

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > self.settings.max_bytes {
                return Err(self.too_large(next_len));
            }
            bytes.extend_from_slice(&chunk);
        }

        sink.emit(PipelineEvent::Progress(SourceProgress {
            source,
            stage: Stage::Downloading,
            bytes: Some(bytes.len() as u64),
            entries: None,
        }));

        let metadata = FetchMetadata {
            original_url: url.to_string(),
            final_url,
            redirect_count: redirect_counter.load(Ordering::Relaxed),
            content_type,
            byte_len: bytes.len() as u64,
        };

        Ok(FetchOutput { bytes, metadata })
    }
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_redirect() {
        return FetchError::new(FailureKind::RedirectLimitExceeded, err.to_string());
    }
    FetchError::new(FailureKind::Network, err.to_string())
}

/// Fetches `url` and stores the raw body at `dest`, replacing any previous copy.
///
/// Failures are logged and reported to `sink`; the return value only signals
/// whether a fresh staged file is available.
pub async fn download_to(
    fetcher: &dyn Fetcher,
    source: SourceKind,
    url: &str,
    dest: &Path,
    sink: &dyn ProgressSink,
) -> bool {
    channel_info!("Downloading {} from {}", source, url);
    let output = match fetcher.fetch(source, url, sink).await {
        Ok(output) => output,
        Err(err) => {
            channel_warn!("Download of {} from {} failed: {}", source, url, err);
            sink.emit(PipelineEvent::SourceCompleted {
                source,
                result: Err(err.kind),
            });
            return false;
        }
    };

    sink.emit(PipelineEvent::Progress(SourceProgress {
        source,
        stage: Stage::Staging,
        bytes: Some(output.metadata.byte_len),
        entries: None,
    }));
    if let Err(err) = write_atomic(dest, &output.bytes) {
        channel_warn!("Could not stage {} at {:?}: {}", source, dest, err);
        sink.emit(PipelineEvent::SourceCompleted {
            source,
            result: Err(FailureKind::Staging),
        });
        return false;
    }

    channel_info!(
        "Staged {} from {} ({} bytes, {}, {} redirects) at {:?}",
        source,
        output.metadata.final_url,
        output.metadata.byte_len,
        output.metadata.content_type.as_deref().unwrap_or("no content type"),
        output.metadata.redirect_count,
        dest
    );
    true
}
