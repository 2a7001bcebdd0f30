//! Channel engine: fetching, decoding, persistence and the merge pipeline.
mod decode;
mod existing;
mod fetch;
mod persist;
mod pipeline;
mod types;
mod writer;

pub use decode::{
    decode_bytes, decode_file, resolve_encodings, DecodeError, DecodedText, DEFAULT_ENCODINGS,
};
pub use existing::{load_existing, ExistingError};
pub use fetch::{
    download_to, FetchSettings, Fetcher, LoggingProgressSink, ProgressSink, ReqwestFetcher,
};
pub use persist::{ensure_output_dir, write_atomic, AtomicFileWriter, PersistError};
pub use pipeline::{run_pipeline, PipelineConfig, PipelineError, RunSummary, SourceConfig};
pub use types::{
    FailureKind, FetchError, FetchMetadata, FetchOutput, PipelineEvent, SourceKind,
    SourceProgress, Stage,
};
pub use writer::{append_playlist, rewrite_playlist, write_playlist, WriteSummary};
