//! Record transformer: one raw bookmark into its structured and HTML representations.

use crate::export::BadDateBehavior;
use crate::model::{BookmarkRecord, ExportRecord, Tag};
use chrono::NaiveDateTime;
use thiserror::Error;

/// Format of every API timestamp.
pub const API_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransformError {
    #[error("bookmark has no added date")]
    MissingAddedDate,

    #[error("added date '{value}' does not match YYYY-MM-DD HH:MM:SS")]
    MalformedAddedDate { value: String },
}

/// One `<DT>` anchor line plus an optional `<DD>` description line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlEntry(String);

impl HtmlEntry {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Replace the date/time separator space with `T`. Null stays null.
pub fn canonical_timestamp(value: Option<&str>) -> Option<String> {
    value.map(|s| s.replace(' ', "T"))
}

/// Tag texts joined with `,` in the given order. Commas inside tag text are left alone.
pub fn join_tags(tags: &[Tag]) -> String {
    tags.iter()
        .map(|t| t.text.as_str())
        .collect::<Vec<_>>()
        .join(",")
}

/// Unix seconds of the added date, treating the naive timestamp as UTC.
pub fn added_epoch(value: Option<&str>) -> Result<i64, TransformError> {
    let value = value.ok_or(TransformError::MissingAddedDate)?;
    NaiveDateTime::parse_from_str(value, API_DATE_FORMAT)
        .map(|dt| dt.and_utc().timestamp())
        .map_err(|_| TransformError::MalformedAddedDate {
            value: value.to_string(),
        })
}

/// Structured export entry: field-for-field copy with canonical timestamps.
pub fn to_export_record(bookmark: &BookmarkRecord) -> ExportRecord {
    ExportRecord {
        excerpt: bookmark.article.excerpt.clone(),
        favorite: bookmark.favorite,
        date_archived: canonical_timestamp(bookmark.date_archived.as_deref()),
        url: bookmark.article.url.clone(),
        date_added: canonical_timestamp(bookmark.date_added.as_deref()),
        date_favorited: canonical_timestamp(bookmark.date_favorited.as_deref()),
        title: bookmark.article.title.clone(),
        archive: bookmark.archive,
    }
}

/// Netscape bookmark entry. `Ok(None)` when the added date is unusable and `behavior` is `Skip`.
pub fn to_html_entry(
    bookmark: &BookmarkRecord,
    behavior: BadDateBehavior,
) -> Result<Option<HtmlEntry>, TransformError> {
    let add_date = match added_epoch(bookmark.date_added.as_deref()) {
        Ok(secs) => secs,
        Err(e) => match behavior {
            BadDateBehavior::Skip => return Ok(None),
            BadDateBehavior::Epoch => 0,
            BadDateBehavior::Fail => return Err(e),
        },
    };

    let mut out = format!(
        "    <DT><A HREF=\"{}\" ADD_DATE=\"{}\" TAGS=\"{}\">{}</A>\n",
        escape_attr(&bookmark.article.url),
        add_date,
        escape_attr(&join_tags(&bookmark.tags)),
        escape_text(bookmark.article.title.as_deref().unwrap_or_default())
    );
    if let Some(excerpt) = bookmark.article.excerpt.as_deref() {
        if !excerpt.is_empty() {
            out.push_str(&format!("    <DD>{}\n", escape_text(excerpt)));
        }
    }
    Ok(Some(HtmlEntry(out)))
}

fn escape_attr(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Article;

    fn bookmark(date_added: Option<&str>, tags: &[&str], excerpt: Option<&str>) -> BookmarkRecord {
        BookmarkRecord {
            article: Article {
                excerpt: excerpt.map(String::from),
                title: Some("Rust & <Friends>".to_string()),
                url: "https://example.com/?a=1&b=\"2\"".to_string(),
            },
            favorite: true,
            archive: false,
            date_added: date_added.map(String::from),
            date_archived: None,
            date_favorited: Some("2016-09-21 08:15:00".to_string()),
            tags: tags
                .iter()
                .map(|t| Tag {
                    text: t.to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn canonical_timestamp_replaces_space() {
        assert_eq!(
            canonical_timestamp(Some("2016-09-20 10:00:00")).as_deref(),
            Some("2016-09-20T10:00:00")
        );
    }

    #[test]
    fn canonical_timestamp_keeps_null() {
        assert_eq!(canonical_timestamp(None), None);
    }

    #[test]
    fn join_tags_in_order_without_trailing_comma() {
        let b = bookmark(None, &["a", "b", "c"], None);
        assert_eq!(join_tags(&b.tags), "a,b,c");
        assert_eq!(join_tags(&[]), "");
    }

    #[test]
    fn join_tags_does_not_escape_commas() {
        let b = bookmark(None, &["x,y", "z"], None);
        assert_eq!(join_tags(&b.tags), "x,y,z");
    }

    #[test]
    fn added_epoch_is_utc_seconds() {
        assert_eq!(added_epoch(Some("2016-09-20 10:00:00")), Ok(1474365600));
        assert_eq!(added_epoch(Some("1970-01-01 00:00:00")), Ok(0));
    }

    #[test]
    fn added_epoch_rejects_missing_and_malformed() {
        assert_eq!(added_epoch(None), Err(TransformError::MissingAddedDate));
        assert!(matches!(
            added_epoch(Some("2016-09-20T10:00:00")),
            Err(TransformError::MalformedAddedDate { .. })
        ));
    }

    #[test]
    fn export_record_copies_fields_and_reencodes_dates() {
        let rec = to_export_record(&bookmark(Some("2016-09-20 10:00:00"), &[], Some("ex")));
        assert_eq!(rec.date_added.as_deref(), Some("2016-09-20T10:00:00"));
        assert_eq!(rec.date_favorited.as_deref(), Some("2016-09-21T08:15:00"));
        assert_eq!(rec.date_archived, None);
        assert_eq!(rec.excerpt.as_deref(), Some("ex"));
        assert_eq!(rec.title.as_deref(), Some("Rust & <Friends>"));
        assert!(rec.favorite);
        assert!(!rec.archive);
    }

    #[test]
    fn html_entry_has_anchor_and_description() -> Result<(), TransformError> {
        let b = bookmark(Some("2016-09-20 10:00:00"), &["a", "b"], Some("An excerpt"));
        let entry =
            to_html_entry(&b, BadDateBehavior::Fail)?.ok_or(TransformError::MissingAddedDate)?;
        assert_eq!(
            entry.as_str(),
            "    <DT><A HREF=\"https://example.com/?a=1&amp;b=&quot;2&quot;\" ADD_DATE=\"1474365600\" TAGS=\"a,b\">Rust &amp; &lt;Friends&gt;</A>\n    <DD>An excerpt\n"
        );
        Ok(())
    }

    #[test]
    fn html_entry_omits_empty_description() -> Result<(), TransformError> {
        for excerpt in [None, Some("")] {
            let b = bookmark(Some("2016-09-20 10:00:00"), &[], excerpt);
            let entry = to_html_entry(&b, BadDateBehavior::Fail)?;
            let text = entry.map(|e| e.as_str().to_string()).unwrap_or_default();
            assert!(!text.contains("<DD>"));
            assert!(text.contains("TAGS=\"\""));
        }
        Ok(())
    }

    #[test]
    fn bad_date_behaviors() -> Result<(), TransformError> {
        let b = bookmark(Some("20/09/2016"), &[], None);
        assert_eq!(to_html_entry(&b, BadDateBehavior::Skip)?, None);
        let epoch = to_html_entry(&b, BadDateBehavior::Epoch)?;
        assert!(epoch
            .map(|e| e.as_str().contains("ADD_DATE=\"0\""))
            .unwrap_or(false));
        assert!(matches!(
            to_html_entry(&b, BadDateBehavior::Fail),
            Err(TransformError::MalformedAddedDate { .. })
        ));
        Ok(())
    }
}
