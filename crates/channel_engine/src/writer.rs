use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use channel_core::{
    has_entries, render_document, render_items, starts_with_header, DocumentHeader, PlaylistItem,
    WriteMode,
};
use channel_logging::{channel_debug, channel_info};

use crate::persist::{write_atomic, PersistError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteSummary {
    pub path: PathBuf,
    pub mode: WriteMode,
    pub entries_written: usize,
    /// False when the file on disk was left as it was.
    pub touched: bool,
}

pub fn write_playlist(
    path: &Path,
    mode: WriteMode,
    header: &DocumentHeader,
    items: &[PlaylistItem],
) -> Result<WriteSummary, PersistError> {
    match mode {
        WriteMode::Rewrite => rewrite_playlist(path, header, items),
        WriteMode::Append => append_playlist(path, header, items),
    }
}

/// Replaces the whole document with header plus `items`.
pub fn rewrite_playlist(
    path: &Path,
    header: &DocumentHeader,
    items: &[PlaylistItem],
) -> Result<WriteSummary, PersistError> {
    let document = render_document(header, items);
    let path = write_atomic(path, document.as_bytes())?;
    let entries_written = count_entries(items);
    channel_info!("Rewrote {:?} with {} entries", path, entries_written);
    Ok(WriteSummary {
        path,
        mode: WriteMode::Rewrite,
        entries_written,
        touched: true,
    })
}

/// Appends `items` to the document, adding the header only where it is missing.
pub fn append_playlist(
    path: &Path,
    header: &DocumentHeader,
    items: &[PlaylistItem],
) -> Result<WriteSummary, PersistError> {
    let entries_written = count_entries(items);
    let summary = |touched: bool| WriteSummary {
        path: path.to_path_buf(),
        mode: WriteMode::Append,
        entries_written: if touched { entries_written } else { 0 },
        touched,
    };

    let mut file = match OpenOptions::new().read(true).append(true).open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            write_atomic(path, render_document(header, items).as_bytes())?;
            channel_info!("Created {:?} with {} entries", path, entries_written);
            return Ok(summary(true));
        }
        Err(err) => return Err(err.into()),
    };

    let len = file.metadata()?.len();
    if len == 0 {
        drop(file);
        write_atomic(path, render_document(header, items).as_bytes())?;
        channel_info!("Initialized empty {:?} with {} entries", path, entries_written);
        return Ok(summary(true));
    }

    if !has_entries(items) {
        channel_debug!("Nothing new for {:?}; left untouched", path);
        return Ok(summary(false));
    }

    let head = peek_head(&mut file)?;
    let ends_with_newline = last_byte(&mut file, len)? == Some(b'\n');

    if starts_with_header(&String::from_utf8_lossy(&head)) {
        let mut chunk = String::new();
        if !ends_with_newline {
            chunk.push('\n');
        }
        chunk.push_str(&render_items(items));
        file.write_all(chunk.as_bytes())?;
        file.flush()?;
        file.sync_all()?;
        channel_info!("Appended {} entries to {:?}", entries_written, path);
        return Ok(summary(true));
    }

    // Header missing: rebuild so that it ends up on the first line.
    let mut previous = Vec::with_capacity(len as usize);
    file.seek(SeekFrom::Start(0))?;
    file.read_to_end(&mut previous)?;
    drop(file);

    let mut content = header.line().into_bytes();
    content.push(b'\n');
    content.extend_from_slice(&previous);
    if !ends_with_newline {
        content.push(b'\n');
    }
    content.extend_from_slice(render_items(items).as_bytes());
    write_atomic(path, &content)?;
    channel_info!(
        "Added missing header to {:?} and appended {} entries",
        path,
        entries_written
    );
    Ok(summary(true))
}

fn count_entries(items: &[PlaylistItem]) -> usize {
    items.iter().filter(|item| item.entry().is_some()).count()
}

fn peek_head(file: &mut File) -> io::Result<Vec<u8>> {
    let mut head = Vec::new();
    file.seek(SeekFrom::Start(0))?;
    Read::by_ref(file).take(16).read_to_end(&mut head)?;
    Ok(head)
}

fn last_byte(file: &mut File, len: u64) -> io::Result<Option<u8>> {
    if len == 0 {
        return Ok(None);
    }
    let mut byte = [0u8; 1];
    file.seek(SeekFrom::Start(len - 1))?;
    file.read_exact(&mut byte)?;
    Ok(Some(byte[0]))
}
