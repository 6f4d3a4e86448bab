//! Paginated fetcher: sequential page requests with a record target and an error tolerance.
//!
//! Pages are requested strictly in ascending order, one at a time. A failed page is
//! reported and counted, never retried here; once failures exceed the tolerance the
//! loop stops and returns what it has.

use crate::api::{ApiError, BookmarkSource, PageResponse};
use crate::export::aggregate::ExportAggregate;
use crate::export::transform::{to_export_record, to_html_entry};
use crate::export::{BadDateBehavior, ExportError, ExportFormat, FormatSet};
use crate::model::{BookmarkRecord, BookmarksPage};
use serde::Deserialize;
use std::fmt;

/// Largest page size the API is asked for.
pub const MAX_PAGE_SIZE: u32 = 50;

/// Page size and page count for a record target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagePlan {
    pub target: u32,
    pub per_page: u32,
    pub pages: u32,
}

impl PagePlan {
    /// Targets below 50 fit on one page of `target + 1`; larger ones use pages of 50.
    pub fn for_target(target: u32) -> Self {
        let per_page = if target < MAX_PAGE_SIZE {
            target + 1
        } else {
            MAX_PAGE_SIZE
        };
        Self {
            target,
            per_page,
            pages: target.div_ceil(per_page),
        }
    }
}

/// Resolve a requested count, where 0 means every bookmark in the account.
///
/// The total comes from a `page=1, per_page=1` request; any failure there is fatal.
pub fn resolve_target<S>(requested: u32, source: &mut S) -> Result<u32, ApiError>
where
    S: BookmarkSource + ?Sized,
{
    if requested != 0 {
        return Ok(requested);
    }
    fetch_total(source)
}

/// Number of bookmarks in the account, from a `page=1, per_page=1` request.
pub fn fetch_total<S>(source: &mut S) -> Result<u32, ApiError>
where
    S: BookmarkSource + ?Sized,
{
    let response = source.fetch_page(1, 1)?;
    if !response.is_success() {
        return Err(ApiError::HttpStatus {
            status: response.status,
            reason: response.reason,
            url: response.url,
        });
    }
    let page: BookmarksPage =
        serde_json::from_str(&response.body).map_err(|e| ApiError::Parse {
            url: response.url.clone(),
            source: e,
        })?;
    Ok(page.meta.item_count_total)
}

/// The record target for a requested count once the account total is known.
pub fn target_for(requested: u32, total: u32) -> u32 {
    if requested == 0 {
        total
    } else {
        requested
    }
}

/// A page that produced no records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageError {
    pub page: u32,
    /// HTTP status, or `None` when no response arrived.
    pub status: Option<u16>,
    pub reason: String,
    pub url: Option<String>,
}

impl fmt::Display for PageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "page {}: HTTP {} {}", self.page, status, self.reason)?,
            None => write!(f, "page {}: {}", self.page, self.reason)?,
        }
        if let Some(url) = &self.url {
            write!(f, " (URL {})", url)?;
        }
        Ok(())
    }
}

/// Snapshot sent to the observer after every page, failed or not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageProgress {
    pub page: u32,
    pub pages: u32,
    pub records: u32,
    pub target: u32,
}

/// Receives progress; has no say over control flow.
pub trait ProgressObserver {
    fn on_start(&mut self, _plan: &PagePlan) {}
    fn on_page(&mut self, _progress: &PageProgress) {}
    fn on_page_error(&mut self, _error: &PageError) {}
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOptions {
    pub formats: FormatSet,
    /// Failed pages allowed; the fetch stops once this many have failed plus one.
    pub tolerance: u32,
    pub bad_dates: BadDateBehavior,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    TargetReached,
    PagesExhausted,
    ToleranceExceeded,
}

/// What a fetch produced. Partial results are normal, not errors.
#[derive(Debug)]
pub struct FetchOutcome {
    pub aggregate: ExportAggregate,
    pub pages_requested: u32,
    pub records_emitted: u32,
    pub page_errors: Vec<PageError>,
    pub stop_reason: StopReason,
    /// Records left out of the HTML export for an unusable added date.
    pub html_skipped: u32,
}

/// Fetch up to `plan.target` records over at most `plan.pages` pages.
///
/// Returns `Err` only for a transform failure under [`BadDateBehavior::Fail`].
pub fn fetch_bookmarks<S>(
    source: &mut S,
    plan: &PagePlan,
    options: &FetchOptions,
    observer: &mut dyn ProgressObserver,
) -> Result<FetchOutcome, ExportError>
where
    S: BookmarkSource + ?Sized,
{
    let mut aggregate = ExportAggregate::new(&options.formats);
    let mut records_emitted: u32 = 0;
    let mut pages_requested: u32 = 0;
    let mut html_skipped: u32 = 0;
    let mut page_errors: Vec<PageError> = Vec::new();
    let mut tolerance_exceeded = false;

    observer.on_start(plan);
    for page in 1..=plan.pages {
        if records_emitted >= plan.target {
            break;
        }
        pages_requested += 1;

        match request_page(source, page, plan.per_page) {
            Ok((payload, parsed)) => {
                log::debug!(
                    "page {}/{}: {} bookmarks",
                    page,
                    plan.pages,
                    parsed.bookmarks.len()
                );
                for bookmark in &parsed.bookmarks {
                    if records_emitted >= plan.target {
                        break;
                    }
                    if !emit(&mut aggregate, bookmark, options.bad_dates)? {
                        html_skipped += 1;
                    }
                    records_emitted += 1;
                }
                aggregate.record_raw_page(page, payload);
            }
            Err(error) => {
                log::debug!("could not fetch {}", error);
                observer.on_page_error(&error);
                page_errors.push(error);
            }
        }

        observer.on_page(&PageProgress {
            page,
            pages: plan.pages,
            records: records_emitted,
            target: plan.target,
        });

        if page_errors.len() as u64 > u64::from(options.tolerance) {
            log::info!(
                "giving up after {} failed page requests; keeping {} bookmarks",
                page_errors.len(),
                records_emitted
            );
            tolerance_exceeded = true;
            break;
        }
    }

    let stop_reason = if tolerance_exceeded {
        StopReason::ToleranceExceeded
    } else if records_emitted >= plan.target {
        StopReason::TargetReached
    } else {
        StopReason::PagesExhausted
    };

    Ok(FetchOutcome {
        aggregate,
        pages_requested,
        records_emitted,
        page_errors,
        stop_reason,
        html_skipped,
    })
}

/// Feed one bookmark into every requested aggregate. `Ok(false)` when HTML skipped it.
fn emit(
    aggregate: &mut ExportAggregate,
    bookmark: &BookmarkRecord,
    bad_dates: BadDateBehavior,
) -> Result<bool, ExportError> {
    if aggregate.wants(ExportFormat::Json) {
        aggregate.push_record(to_export_record(bookmark));
    }
    if aggregate.wants(ExportFormat::Html) {
        match to_html_entry(bookmark, bad_dates) {
            Ok(Some(entry)) => aggregate.push_html(&entry),
            Ok(None) => {
                log::info!(
                    "leaving {} out of the HTML export: unusable added date {:?}",
                    bookmark.article.url,
                    bookmark.date_added
                );
                return Ok(false);
            }
            Err(source) => {
                return Err(ExportError::Transform {
                    url: bookmark.article.url.clone(),
                    source,
                })
            }
        }
    }
    Ok(true)
}

/// One page as (verbatim payload, typed page), or the reason it yielded nothing.
fn request_page<S>(
    source: &mut S,
    page: u32,
    per_page: u32,
) -> Result<(serde_json::Value, BookmarksPage), PageError>
where
    S: BookmarkSource + ?Sized,
{
    let response: PageResponse = source.fetch_page(page, per_page).map_err(|e| {
        let url = match &e {
            ApiError::Network { url, .. } => Some(url.clone()),
            _ => None,
        };
        PageError {
            page,
            status: None,
            reason: e.to_string(),
            url,
        }
    })?;

    if !response.is_success() {
        return Err(PageError {
            page,
            status: Some(response.status),
            reason: response.reason,
            url: Some(response.url),
        });
    }

    let invalid = |e: serde_json::Error| PageError {
        page,
        status: Some(response.status),
        reason: format!("invalid bookmarks payload: {}", e),
        url: Some(response.url.clone()),
    };
    let payload: serde_json::Value = serde_json::from_str(&response.body).map_err(invalid)?;
    let parsed = BookmarksPage::deserialize(&payload).map_err(invalid)?;
    Ok((payload, parsed))
}
