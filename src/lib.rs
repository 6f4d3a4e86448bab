//! readability-export: CLI exporter for Readability bookmarks, outputting JSON, a Netscape
//! HTML bookmark file, and raw API dumps.

pub mod api;
pub mod cli;
pub mod config;
pub mod export;
pub mod logging;
pub mod model;

// Re-exports for CLI and consumers.
pub use api::{
    ApiError, AuthError, BookmarkSource, Credentials, PageResponse, PoliteClient,
    PoliteClientBuilder, ReaderClient,
};
pub use export::{
    fetch_bookmarks, resolve_target, write_export, BadDateBehavior, ExportError, ExportFormat,
    ExportPayload, FetchOptions, FetchOutcome, FormatSet, PagePlan, WriteError,
};
pub use model::{BookmarkRecord, ExportRecord, StructuredExport};
