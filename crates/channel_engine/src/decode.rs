use std::fs;
use std::path::{Path, PathBuf};

use encoding_rs::Encoding;

/// Candidate encodings, most preferred first. `latin1` never fails and ends the list.
pub const DEFAULT_ENCODINGS: &[&str] = &["utf-8", "gbk", "gb18030", "latin1"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedText {
    pub lines: Vec<String>,
    pub encoding_label: String,
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("unknown encoding label {0:?}")]
    UnknownEncoding(String),
    #[error("no candidate encoding decoded the input (tried {tried:?})")]
    Exhausted { tried: Vec<String> },
    #[error("failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Resolves configured labels to encodings, keeping their order.
pub fn resolve_encodings<S: AsRef<str>>(labels: &[S]) -> Result<Vec<&'static Encoding>, DecodeError> {
    labels
        .iter()
        .map(|label| {
            let label = label.as_ref();
            Encoding::for_label(label.trim().as_bytes())
                .ok_or_else(|| DecodeError::UnknownEncoding(label.to_string()))
        })
        .collect()
}

/// Decodes with the first encoding that accepts every byte.
pub fn decode_bytes(bytes: &[u8], encodings: &[&'static Encoding]) -> Result<DecodedText, DecodeError> {
    encodings
        .iter()
        .find_map(|enc| decode_with(bytes, enc))
        .ok_or_else(|| DecodeError::Exhausted {
            tried: encodings.iter().map(|enc| enc.name().to_string()).collect(),
        })
}

pub fn decode_file(path: &Path, encodings: &[&'static Encoding]) -> Result<DecodedText, DecodeError> {
    let bytes = fs::read(path).map_err(|source| DecodeError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    decode_bytes(&bytes, encodings)
}

fn decode_with(bytes: &[u8], enc: &'static Encoding) -> Option<DecodedText> {
    let (text, had_errors) = enc.decode_with_bom_removal(bytes);
    if had_errors {
        return None;
    }
    Some(DecodedText {
        lines: text.lines().map(str::to_owned).collect(),
        encoding_label: enc.name().to_string(),
    })
}
