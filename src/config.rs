//! Optional config file loading. Search order: ./readability-export.toml, then
//! $XDG_CONFIG_HOME/readability-export/config.toml (or ~/.config/readability-export/config.toml).

use serde::Deserialize;
use std::path::PathBuf;

/// Config file contents. All fields optional; only present keys override defaults.
///
/// Credentials are not read from here; they come from flags or environment variables.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct Config {
    /// Directory export files are written to. Paths are relative to CWD.
    pub export_dir: Option<PathBuf>,
    /// Number of bookmarks to export; 0 exports all.
    pub bookmarks: Option<u32>,
    /// Failed page requests tolerated before the export stops early.
    pub http_error_threshold: Option<u32>,
    /// Formats to write: any of "json", "html", "raw".
    pub formats: Option<Vec<String>>,
    /// Bookmarks with an unusable added date in HTML export: skip (default), epoch, or fail.
    pub bad_dates: Option<String>,
    /// Reader API root URL.
    pub api_base_url: Option<String>,
    /// HTTP User-Agent header.
    pub user_agent: Option<String>,
    /// Delay in seconds between requests.
    pub request_delay_secs: Option<u64>,
    /// Request timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// HTTP attempts for the token request on transient failures (default 3).
    /// Bookmark pages are requested once each.
    pub retry_count: Option<u32>,
    /// Delay in seconds before each retry (e.g. [1, 2]).
    pub retry_backoff_secs: Option<Vec<u64>>,
}

/// Missing file returns Ok(None). Invalid TOML or I/O error reading a present file returns Err.
pub fn load_config() -> Result<Option<Config>, String> {
    let cwd = std::env::current_dir()
        .map_err(|e| format!("Cannot determine current directory: {}", e))?;
    let mut paths = vec![cwd.join("readability-export.toml")];
    if let Some(d) = dirs::config_dir() {
        paths.push(d.join("readability-export").join("config.toml"));
    }
    for path in &paths {
        if path.exists() {
            log::debug!("loading config from {}", path.display());
            let s = std::fs::read_to_string(path)
                .map_err(|e| format!("Cannot read config {}: {}", path.display(), e))?;
            let config: Config = toml::from_str(&s)
                .map_err(|e| format!("Invalid config {}: {}", path.display(), e))?;
            return Ok(Some(config));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_empty_config() {
        let c: Config = toml::from_str("").unwrap();
        assert!(c.export_dir.is_none());
        assert!(c.bookmarks.is_none());
        assert!(c.http_error_threshold.is_none());
        assert!(c.formats.is_none());
        assert!(c.bad_dates.is_none());
        assert!(c.api_base_url.is_none());
        assert!(c.retry_backoff_secs.is_none());
    }

    #[test]
    fn parse_full_config() {
        let s = r#"
            export_dir = "exports"
            bookmarks = 0
            http_error_threshold = 2
            formats = ["json", "html"]
            bad_dates = "epoch"
            api_base_url = "https://reader.example/api/"
            user_agent = "Custom/1.0"
            request_delay_secs = 1
            timeout_secs = 60
            retry_count = 5
            retry_backoff_secs = [1, 2, 4, 8]
        "#;
        let c: Config = toml::from_str(s).unwrap();
        assert_eq!(c.export_dir.as_deref(), Some(std::path::Path::new("exports")));
        assert_eq!(c.bookmarks, Some(0));
        assert_eq!(c.http_error_threshold, Some(2));
        assert_eq!(
            c.formats.as_deref(),
            Some(["json".to_string(), "html".to_string()].as_slice())
        );
        assert_eq!(c.bad_dates.as_deref(), Some("epoch"));
        assert_eq!(c.api_base_url.as_deref(), Some("https://reader.example/api/"));
        assert_eq!(c.user_agent.as_deref(), Some("Custom/1.0"));
        assert_eq!(c.request_delay_secs, Some(1));
        assert_eq!(c.timeout_secs, Some(60));
        assert_eq!(c.retry_count, Some(5));
        assert_eq!(
            c.retry_backoff_secs.as_deref(),
            Some([1, 2, 4, 8].as_slice())
        );
    }

    #[test]
    fn parse_partial_config() {
        let c: Config = toml::from_str("bookmarks = 100").unwrap();
        assert_eq!(c.bookmarks, Some(100));
        assert!(c.export_dir.is_none());
        assert!(c.formats.is_none());
    }

    #[test]
    fn invalid_toml_errors() {
        assert!(toml::from_str::<Config>("export_dir = [").is_err());
    }

    #[test]
    fn negative_bookmarks_rejected() {
        assert!(toml::from_str::<Config>("bookmarks = -1").is_err());
    }
}
