//! Export writer: one append-mode, single-shot write per format.

use crate::export::{ExportFormat, FinishedExport};
use crate::model::StructuredExport;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_JSON_FILENAME: &str = "readability-export_{timestamp}_json.json";
pub const DEFAULT_HTML_FILENAME: &str = "readability-export_{timestamp}_bookmarks.html";
pub const DEFAULT_RAW_FILENAME: &str = "readability-export_raw_{timestamp}_json.json";

/// `chrono` format substituted for `{timestamp}` in filenames.
pub const FILENAME_TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H%M%S";

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("Failed to write export: {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize {format} export: {source}")]
    Serialize {
        format: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Where an export landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenFile {
    pub path: PathBuf,
    pub size: u64,
}

/// One finalised aggregate, borrowed for writing.
#[derive(Debug, Clone, Copy)]
pub enum ExportPayload<'a> {
    Structured(&'a StructuredExport),
    Html(&'a str),
    Raw(&'a BTreeMap<u32, serde_json::Value>),
}

impl<'a> ExportPayload<'a> {
    /// The payload for `format`, if that format was aggregated.
    pub fn from_finished(finished: &'a FinishedExport, format: ExportFormat) -> Option<Self> {
        match format {
            ExportFormat::Json => finished.structured.as_ref().map(ExportPayload::Structured),
            ExportFormat::Html => finished.html.as_deref().map(ExportPayload::Html),
            ExportFormat::Raw => finished.raw.as_ref().map(ExportPayload::Raw),
        }
    }
}

/// Replace `{timestamp}` in a filename template.
pub fn expand_filename(template: &str, timestamp: &str) -> String {
    template.replace("{timestamp}", timestamp)
}

/// Current local time in [`FILENAME_TIMESTAMP_FORMAT`].
pub fn filename_timestamp() -> String {
    chrono::Local::now()
        .format(FILENAME_TIMESTAMP_FORMAT)
        .to_string()
}

/// Human size in the style `~12 KiB`: MiB above one MiB, KiB above 1024 bytes.
/// Halves round to even.
pub fn format_file_size(bytes: u64) -> String {
    let kib = bytes as f64 / 1024.0;
    if kib > 1024.0 {
        format!("{} MiB", (kib / 1024.0).round_ties_even() as u64)
    } else if bytes > 1024 {
        format!("{} KiB", kib.round_ties_even() as u64)
    } else {
        format!("{} B", bytes)
    }
}

/// JSON with four-space indentation.
fn to_json_pretty<T: Serialize>(value: &T, format: &'static str) -> Result<Vec<u8>, WriteError> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value
        .serialize(&mut ser)
        .map_err(|e| WriteError::Serialize { format, source: e })?;
    Ok(buf)
}

/// Encode `payload` and append it to `directory/filename` in a single write.
pub fn write_export(
    format: ExportFormat,
    directory: &Path,
    filename: &str,
    payload: ExportPayload<'_>,
) -> Result<WrittenFile, WriteError> {
    let path = directory.join(filename);
    let bytes = match payload {
        ExportPayload::Structured(data) => to_json_pretty(data, format.tag())?,
        ExportPayload::Raw(data) => to_json_pretty(data, format.tag())?,
        ExportPayload::Html(text) => text.as_bytes().to_vec(),
    };

    let io_err = |e: std::io::Error| WriteError::Io {
        path: path.clone(),
        source: e,
    };
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(io_err)?;
    file.write_all(&bytes).map_err(io_err)?;
    file.flush().map_err(io_err)?;
    drop(file);

    let size = std::fs::metadata(&path).map_err(io_err)?.len();
    log::info!("wrote {} export to {} ({} bytes)", format.tag(), path.display(), size);
    Ok(WrittenFile { path, size })
}
