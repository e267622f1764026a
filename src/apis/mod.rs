pub mod feed;
pub mod registry;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::common::error::SourceError;

pub use feed::FeedSource;
pub use registry::SourceRegistry;

/// One listing as a source hands it over, before any normalization
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEvent {
    pub title: String,
    pub url: String,
    pub date_text: String,
    #[serde(default)]
    pub time_text: Option<String>,
    /// Overrides the source's default zone for this listing only
    #[serde(default)]
    pub timezone: Option<String>,
    /// Free text such as `"Jane Doe and John Roe"`
    #[serde(default)]
    pub speakers: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub cost: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// A place listings come from.
///
/// Sources only fetch; normalization and filtering happen in the aggregator.
#[async_trait]
pub trait EventSource: Send + Sync {
    fn name(&self) -> &str;

    /// Default zone for listings that name none
    fn timezone(&self) -> Option<&str>;

    fn enabled(&self) -> bool {
        true
    }

    async fn fetch(&self) -> Result<Vec<RawEvent>, SourceError>;
}
