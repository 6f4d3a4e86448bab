//! Per-run aggregates: structured records, HTML buffer, and raw page map.

use crate::export::transform::HtmlEntry;
use crate::export::{ExportFormat, FormatSet};
use crate::model::{ExportRecord, StructuredExport};
use std::collections::BTreeMap;

const NETSCAPE_HEADER: &str = "<!DOCTYPE NETSCAPE-Bookmark-file-1>
<!-- This is an automatically generated file. -->
<META HTTP-EQUIV=\"Content-Type\" CONTENT=\"text/html; charset=UTF-8\">
<TITLE>Bookmarks</TITLE>
<H1>Bookmarks</H1>
<DL><p>
";

const NETSCAPE_FOOTER: &str = "</DL><p>\n";

/// Accumulates only the parts for the requested formats.
#[derive(Debug, Default)]
pub struct ExportAggregate {
    structured: Option<Vec<ExportRecord>>,
    html: Option<String>,
    raw: Option<BTreeMap<u32, serde_json::Value>>,
}

/// Finalised aggregates, ready for the writer.
#[derive(Debug, Default)]
pub struct FinishedExport {
    pub structured: Option<StructuredExport>,
    pub html: Option<String>,
    pub raw: Option<BTreeMap<u32, serde_json::Value>>,
}

impl ExportAggregate {
    pub fn new(formats: &FormatSet) -> Self {
        Self {
            structured: formats.contains(ExportFormat::Json).then(Vec::new),
            html: formats
                .contains(ExportFormat::Html)
                .then(|| NETSCAPE_HEADER.to_string()),
            raw: formats.contains(ExportFormat::Raw).then(BTreeMap::new),
        }
    }

    pub fn wants(&self, format: ExportFormat) -> bool {
        match format {
            ExportFormat::Json => self.structured.is_some(),
            ExportFormat::Html => self.html.is_some(),
            ExportFormat::Raw => self.raw.is_some(),
        }
    }

    /// No-op unless the structured format was requested.
    pub fn push_record(&mut self, record: ExportRecord) {
        if let Some(records) = self.structured.as_mut() {
            records.push(record);
        }
    }

    pub fn push_html(&mut self, entry: &HtmlEntry) {
        if let Some(buf) = self.html.as_mut() {
            buf.push_str(entry.as_str());
        }
    }

    /// Store a full page payload, however many of its records were emitted.
    pub fn record_raw_page(&mut self, page: u32, payload: serde_json::Value) {
        if let Some(raw) = self.raw.as_mut() {
            raw.insert(page, payload);
        }
    }

    pub fn structured_len(&self) -> usize {
        self.structured.as_ref().map(Vec::len).unwrap_or(0)
    }

    /// Close the HTML list and wrap structured records in their container.
    pub fn finish(self) -> FinishedExport {
        FinishedExport {
            structured: self.structured.map(|bookmarks| StructuredExport {
                bookmarks,
                recommendations: Vec::new(),
            }),
            html: self.html.map(|mut buf| {
                buf.push_str(NETSCAPE_FOOTER);
                buf
            }),
            raw: self.raw,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::transform::to_html_entry;
    use crate::export::BadDateBehavior;
    use crate::model::{Article, BookmarkRecord};
    use pretty_assertions::assert_eq;

    fn record(url: &str) -> ExportRecord {
        ExportRecord {
            excerpt: None,
            favorite: false,
            date_archived: None,
            url: url.to_string(),
            date_added: None,
            date_favorited: None,
            title: None,
            archive: false,
        }
    }

    #[test]
    fn only_requested_parts_exist() {
        let agg = ExportAggregate::new(&FormatSet::new(&[ExportFormat::Html]));
        assert!(agg.wants(ExportFormat::Html));
        assert!(!agg.wants(ExportFormat::Json));
        let finished = agg.finish();
        assert!(finished.structured.is_none());
        assert!(finished.raw.is_none());
        assert!(finished.html.is_some());
    }

    #[test]
    fn push_record_ignored_without_json() {
        let mut agg = ExportAggregate::new(&FormatSet::new(&[ExportFormat::Raw]));
        agg.push_record(record("https://a"));
        assert_eq!(agg.structured_len(), 0);
    }

    #[test]
    fn structured_finish_wraps_with_empty_recommendations() {
        let mut agg = ExportAggregate::new(&FormatSet::new(&[ExportFormat::Json]));
        agg.push_record(record("https://a"));
        agg.push_record(record("https://b"));
        assert_eq!(agg.structured_len(), 2);
        let structured = agg.finish().structured.unwrap_or_default();
        let urls: Vec<_> = structured.bookmarks.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(urls, vec!["https://a", "https://b"]);
        assert!(structured.recommendations.is_empty());
    }

    #[test]
    fn html_finish_closes_list() {
        let mut agg = ExportAggregate::new(&FormatSet::new(&[ExportFormat::Html]));
        let bookmark = BookmarkRecord {
            article: Article {
                excerpt: None,
                title: Some("T".into()),
                url: "https://a".into(),
            },
            favorite: false,
            archive: false,
            date_added: Some("1970-01-01 00:01:00".into()),
            date_archived: None,
            date_favorited: None,
            tags: Vec::new(),
        };
        if let Ok(Some(entry)) = to_html_entry(&bookmark, BadDateBehavior::Fail) {
            agg.push_html(&entry);
        }
        let html = agg.finish().html.unwrap_or_default();
        assert!(html.starts_with("<!DOCTYPE NETSCAPE-Bookmark-file-1>\n"));
        let tail: Vec<&str> = html.lines().rev().take(2).collect();
        assert_eq!(
            tail,
            vec![
                "</DL><p>",
                "    <DT><A HREF=\"https://a\" ADD_DATE=\"60\" TAGS=\"\">T</A>"
            ]
        );
    }

    #[test]
    fn empty_html_export_is_header_and_footer() {
        let agg = ExportAggregate::new(&FormatSet::new(&[ExportFormat::Html]));
        let html = agg.finish().html.unwrap_or_default();
        assert_eq!(
            html,
            "<!DOCTYPE NETSCAPE-Bookmark-file-1>\n\
             <!-- This is an automatically generated file. -->\n\
             <META HTTP-EQUIV=\"Content-Type\" CONTENT=\"text/html; charset=UTF-8\">\n\
             <TITLE>Bookmarks</TITLE>\n\
             <H1>Bookmarks</H1>\n\
             <DL><p>\n\
             </DL><p>\n"
        );
    }

    #[test]
    fn raw_pages_keyed_by_page_number() {
        let mut agg = ExportAggregate::new(&FormatSet::new(&[ExportFormat::Raw]));
        agg.record_raw_page(2, serde_json::json!({"page": 2}));
        agg.record_raw_page(1, serde_json::json!({"page": 1}));
        let raw = agg.finish().raw.unwrap_or_default();
        let keys: Vec<u32> = raw.keys().copied().collect();
        assert_eq!(keys, vec![1, 2]);
        assert_eq!(raw[&2], serde_json::json!({"page": 2}));
    }
}
