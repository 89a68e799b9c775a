//! Orbital Tracking Core
//!
//! State engine behind the orbital globe: ingests the object catalog and the
//! conjunction warning list, derives the filtered display set, and manages a
//! single inspected object with its predicted ground track.
//!
//! # Data Flow
//!
//! ```text
//! scheduler ticks ─► feed fetches ─► completions ─► CatalogStore / WarningIndex
//!                                                        │
//! commands (click, search, toggle) ─► SelectionController / FilterState
//!                                                        │
//!                                          compute_display_set ─► ViewSnapshot
//! ```
//!
//! | Feed | Default cadence | Store |
//! |------|-----------------|-------|
//! | Objects | 30s | [`catalog::CatalogStore`] |
//! | Warnings | 60s | [`warnings::WarningIndex`] |
//! | Path | on selection | [`selection::SelectionController`] |
//! | Sync | on demand | status only |

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod catalog;
pub mod config;
pub mod engine;
pub mod feeds;
pub mod filter;
pub mod grouping;
pub mod scheduler;
pub mod selection;
pub mod status;
pub mod warnings;

pub use catalog::{CatalogState, CatalogStore, ObjectKey, TrackedObject};
pub use config::TrackingConfig;
pub use engine::{ClearSignal, EngineCommand, EngineHandle, TrackingEngine, ViewSnapshot};
pub use feeds::TrackingFeeds;
pub use filter::{compute_display_set, DisplayInputs, FilterState};
pub use grouping::{classify, GroupId};
pub use selection::{SelectionController, SelectionOrigin};
pub use warnings::{Warning, WarningIndex};

/// Mean Earth radius used to normalise altitudes for the globe
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Raw altitudes above this value are metres, not kilometres
pub const ALTITUDE_METRES_THRESHOLD: f64 = 1000.0;

/// Warnings closer than this elevate panel urgency
pub const CRITICAL_THRESHOLD_KM: f64 = 10.0;

/// Predicted path horizon requested for the inspected object
pub const PATH_HORIZON_HOURS: u32 = 24;

pub const DANGER_COLOR: &str = "#ff0055";
pub const NEUTRAL_COLOR: &str = "#00ffff";
pub const SELECTION_COLOR: &str = "#00ffff";

/// Upstream feed an error or status belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedKind {
    Objects,
    Warnings,
    Path,
    Sync,
}

impl std::fmt::Display for FeedKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FeedKind::Objects => "objects",
            FeedKind::Warnings => "warnings",
            FeedKind::Path => "path",
            FeedKind::Sync => "sync",
        };
        f.write_str(s)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrackingError {
    #[error("{feed} feed unreachable: {message}")]
    Transport { feed: FeedKind, message: String },
    #[error("{feed} feed returned status {status}")]
    Status { feed: FeedKind, status: u16 },
    #[error("{feed} feed payload invalid: {message}")]
    Decode { feed: FeedKind, message: String },
    #[error("No credential available")]
    MissingCredential,
    #[error("Tracking engine is not running")]
    EngineClosed,
    #[error("Object not found: {0}")]
    ObjectNotFound(String),
}

impl TrackingError {
    pub fn transport(feed: FeedKind, message: impl Into<String>) -> Self {
        Self::Transport {
            feed,
            message: message.into(),
        }
    }

    pub fn decode(feed: FeedKind, message: impl Into<String>) -> Self {
        Self::Decode {
            feed,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TrackingError>;

/// Convert a raw feed altitude to kilometres.
///
/// Upstream producers report either km or metres; anything above
/// [`ALTITUDE_METRES_THRESHOLD`] is treated as metres.
pub fn altitude_to_km(raw: f64) -> f64 {
    if raw > ALTITUDE_METRES_THRESHOLD {
        raw / 1000.0
    } else {
        raw
    }
}

/// Altitude as a fraction of Earth radius (globe units)
pub fn normalize_altitude(altitude_km: f64) -> f64 {
    altitude_km / EARTH_RADIUS_KM
}
