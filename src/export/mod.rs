//! Export core: paginated fetch, per-format record transformation, aggregation, and file writing.

pub mod aggregate;
pub mod fetcher;
pub mod transform;
pub mod writer;

pub use aggregate::{ExportAggregate, FinishedExport};
pub use fetcher::{
    fetch_bookmarks, fetch_total, resolve_target, target_for, FetchOptions, FetchOutcome,
    NoProgress, PageError, PagePlan, PageProgress, ProgressObserver, StopReason,
};
pub use transform::{HtmlEntry, TransformError};
pub use writer::{write_export, ExportPayload, WriteError, WrittenFile};

use thiserror::Error;

/// One export encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ExportFormat {
    /// Structured bookmark list (the service's native JSON export shape).
    Json,
    /// Netscape bookmark file.
    Html,
    /// Verbatim API pages keyed by page number.
    Raw,
}

impl ExportFormat {
    pub fn tag(self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Html => "html",
            ExportFormat::Raw => "json_raw",
        }
    }
}

/// Requested subset of formats. Iterates in `Json, Html, Raw` order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormatSet {
    json: bool,
    html: bool,
    raw: bool,
}

impl FormatSet {
    pub fn new(formats: &[ExportFormat]) -> Self {
        let mut set = Self::default();
        for f in formats {
            set.insert(*f);
        }
        set
    }

    pub fn insert(&mut self, format: ExportFormat) {
        match format {
            ExportFormat::Json => self.json = true,
            ExportFormat::Html => self.html = true,
            ExportFormat::Raw => self.raw = true,
        }
    }

    pub fn contains(&self, format: ExportFormat) -> bool {
        match format {
            ExportFormat::Json => self.json,
            ExportFormat::Html => self.html,
            ExportFormat::Raw => self.raw,
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.json || self.html || self.raw)
    }

    pub fn iter(&self) -> impl Iterator<Item = ExportFormat> + '_ {
        [ExportFormat::Json, ExportFormat::Html, ExportFormat::Raw]
            .into_iter()
            .filter(move |f| self.contains(*f))
    }
}

/// What to do with a bookmark whose added date cannot be turned into an HTML `ADD_DATE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BadDateBehavior {
    /// Leave the bookmark out of the HTML export only (default).
    #[default]
    Skip,
    /// Keep the bookmark with `ADD_DATE="0"`.
    Epoch,
    /// Abort the export.
    Fail,
}

/// Fatal errors from the fetch loop. Recoverable page failures never surface here.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Could not convert bookmark {url} for HTML export: {source}")]
    Transform {
        url: String,
        #[source]
        source: TransformError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_set_iterates_in_fixed_order() {
        let set = FormatSet::new(&[ExportFormat::Raw, ExportFormat::Json, ExportFormat::Raw]);
        let formats: Vec<_> = set.iter().collect();
        assert_eq!(formats, vec![ExportFormat::Json, ExportFormat::Raw]);
        assert!(!set.contains(ExportFormat::Html));
    }

    #[test]
    fn empty_format_set() {
        assert!(FormatSet::default().is_empty());
        assert!(!FormatSet::new(&[ExportFormat::Html]).is_empty());
    }

    #[test]
    fn format_tags() {
        assert_eq!(ExportFormat::Json.tag(), "json");
        assert_eq!(ExportFormat::Html.tag(), "html");
        assert_eq!(ExportFormat::Raw.tag(), "json_raw");
    }
}
