//! External feed interface
//!
//! The engine consumes the upstream producer only through this trait. The
//! gateway implements it over HTTP; tests script it directly.

use crate::selection::RawPathPoint;
use crate::warnings::WarningFeed;
use crate::Result;
use async_trait::async_trait;

#[async_trait]
pub trait TrackingFeeds: Send + Sync + 'static {
    /// Whether a bearer credential is available. Without one the engine
    /// attempts no fetch at all.
    fn authorized(&self) -> bool {
        true
    }

    /// Current object catalog as raw records (validated by the catalog)
    async fn fetch_objects(&self) -> Result<Vec<serde_json::Value>>;

    /// Current conjunction warnings
    async fn fetch_warnings(&self) -> Result<WarningFeed>;

    /// Predicted path samples for one object over `hours`
    async fn fetch_path(&self, object_id: &str, hours: u32) -> Result<Vec<RawPathPoint>>;

    /// Ask the producer to re-download its source data
    async fn trigger_sync(&self) -> Result<()>;
}
