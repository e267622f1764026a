use async_trait::async_trait;
use tracing::{debug, info, instrument};

use super::{EventSource, RawEvent};
use crate::common::error::SourceError;
use crate::config::SourceConfig;

/// Source backed by a local JSON file holding an array of raw listings
#[derive(Debug, Clone)]
pub struct FeedSource {
    config: SourceConfig,
}

impl FeedSource {
    pub fn new(config: SourceConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl EventSource for FeedSource {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn timezone(&self) -> Option<&str> {
        self.config.timezone.as_deref()
    }

    fn enabled(&self) -> bool {
        self.config.enabled
    }

    #[instrument(skip(self), fields(source = %self.config.name))]
    async fn fetch(&self) -> Result<Vec<RawEvent>, SourceError> {
        let path = &self.config.path;
        debug!(path = %path.display(), "reading feed");

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| SourceError::Io {
                path: path.display().to_string(),
                source,
            })?;
        let events: Vec<RawEvent> = serde_json::from_str(&content)?;

        info!(count = events.len(), "fetched raw listings");
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(path: std::path::PathBuf) -> SourceConfig {
        SourceConfig {
            name: "Test Feed".to_string(),
            path,
            timezone: Some("ET".to_string()),
            enabled: true,
        }
    }

    #[tokio::test]
    async fn test_fetch_reads_listings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feed.json");
        std::fs::write(
            &path,
            r#"[{"title": "Seminar", "url": "https://example.com/1", "date_text": "January 14, 2026", "time_text": "12:00-1:00pm"},
                {"title": "Workshop", "url": "https://example.com/2", "date_text": "Jan 20", "cost": "$50"}]"#,
        )
        .unwrap();

        let source = FeedSource::new(config(path));
        let events = source.fetch().await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].time_text.as_deref(), Some("12:00-1:00pm"));
        assert_eq!(events[1].cost.as_deref(), Some("$50"));
        assert_eq!(source.timezone(), Some("ET"));
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let source = FeedSource::new(config("/nonexistent/feed.json".into()));
        assert!(matches!(source.fetch().await, Err(SourceError::Io { .. })));
    }

    #[tokio::test]
    async fn test_malformed_json_is_json_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feed.json");
        std::fs::write(&path, "{ not json").unwrap();

        let source = FeedSource::new(config(path));
        assert!(matches!(source.fetch().await, Err(SourceError::Json(_))));
    }
}
