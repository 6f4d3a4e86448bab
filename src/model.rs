//! Data model for the Reader API and the structured export.
//!
//! Wire types mirror the `bookmarks` endpoint response. Export types mirror the
//! service's own JSON export: `{"bookmarks": [...], "recommendations": []}`.

use serde::{Deserialize, Serialize};

/// One page returned by `GET bookmarks?page=&per_page=`.
#[derive(Debug, Clone, Deserialize)]
pub struct BookmarksPage {
    pub meta: PageMeta,
    #[serde(default)]
    pub bookmarks: Vec<BookmarkRecord>,
}

/// Page metadata. Only the account total is consumed.
#[derive(Debug, Clone, Deserialize)]
pub struct PageMeta {
    pub item_count_total: u32,
}

/// Raw bookmark as received from the API.
///
/// Timestamps are local date-times in `YYYY-MM-DD HH:MM:SS` form, or null.
#[derive(Debug, Clone, Deserialize)]
pub struct BookmarkRecord {
    pub article: Article,
    #[serde(default)]
    pub favorite: bool,
    #[serde(default)]
    pub archive: bool,
    pub date_added: Option<String>,
    pub date_archived: Option<String>,
    pub date_favorited: Option<String>,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

/// The article a bookmark points at.
#[derive(Debug, Clone, Deserialize)]
pub struct Article {
    pub excerpt: Option<String>,
    pub title: Option<String>,
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Tag {
    pub text: String,
}

/// One entry of the structured export. Field order is the serialized key order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRecord {
    #[serde(rename = "article__excerpt")]
    pub excerpt: Option<String>,
    pub favorite: bool,
    pub date_archived: Option<String>,
    #[serde(rename = "article__url")]
    pub url: String,
    pub date_added: Option<String>,
    pub date_favorited: Option<String>,
    #[serde(rename = "article__title")]
    pub title: Option<String>,
    pub archive: bool,
}

/// Structured export document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredExport {
    pub bookmarks: Vec<ExportRecord>,
    /// Always empty; kept so the file matches the service's native export shape.
    pub recommendations: Vec<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    const PAGE_JSON: &str = r#"{
        "meta": {"item_count_total": 42, "page": 1, "num_pages": 42},
        "bookmarks": [{
            "id": 7,
            "article": {
                "excerpt": "An excerpt.",
                "title": "A title",
                "url": "https://example.com/a"
            },
            "favorite": true,
            "archive": false,
            "date_added": "2016-09-20 10:00:00",
            "date_archived": null,
            "date_favorited": "2016-09-21 11:30:00",
            "tags": [{"id": 1, "text": "rust"}, {"id": 2, "text": "cli"}]
        }]
    }"#;

    #[test]
    fn page_parses_meta_and_records() -> Result<(), Box<dyn Error>> {
        let page: BookmarksPage = serde_json::from_str(PAGE_JSON)?;
        assert_eq!(page.meta.item_count_total, 42);
        assert_eq!(page.bookmarks.len(), 1);
        let b = &page.bookmarks[0];
        assert!(b.favorite);
        assert!(!b.archive);
        assert_eq!(b.article.url, "https://example.com/a");
        assert_eq!(b.date_added.as_deref(), Some("2016-09-20 10:00:00"));
        assert!(b.date_archived.is_none());
        let tags: Vec<&str> = b.tags.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(tags, vec!["rust", "cli"]);
        Ok(())
    }

    #[test]
    fn missing_tags_and_flags_default() -> Result<(), Box<dyn Error>> {
        let json = r#"{
            "article": {"excerpt": null, "title": null, "url": "https://example.com"},
            "date_added": null, "date_archived": null, "date_favorited": null
        }"#;
        let b: BookmarkRecord = serde_json::from_str(json)?;
        assert!(b.tags.is_empty());
        assert!(!b.favorite);
        assert!(b.article.title.is_none());
        Ok(())
    }

    #[test]
    fn export_record_serializes_in_declared_key_order() -> Result<(), Box<dyn Error>> {
        let rec = ExportRecord {
            excerpt: Some("x".into()),
            favorite: false,
            date_archived: None,
            url: "https://example.com".into(),
            date_added: Some("2016-09-20T10:00:00".into()),
            date_favorited: None,
            title: Some("t".into()),
            archive: true,
        };
        let json = serde_json::to_string(&rec)?;
        let keys = [
            "article__excerpt",
            "favorite",
            "date_archived",
            "article__url",
            "date_added",
            "date_favorited",
            "article__title",
            "archive",
        ];
        let positions: Vec<usize> = keys
            .iter()
            .map(|k| json.find(&format!("\"{}\"", k)).unwrap_or(usize::MAX))
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{}", json);
        assert!(json.contains("\"date_archived\":null"));
        Ok(())
    }

    #[test]
    fn structured_export_has_empty_recommendations() -> Result<(), Box<dyn Error>> {
        let json = serde_json::to_string(&StructuredExport::default())?;
        assert_eq!(json, r#"{"bookmarks":[],"recommendations":[]}"#);
        Ok(())
    }
}
