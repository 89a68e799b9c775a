//! Status indicators
//!
//! Every failure degrades to a visible, non-blocking status while the last
//! good data stays on screen.

use crate::TrackingError;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum FeedStatus {
    /// No credential, nothing fetched
    AwaitingCredential,
    Loading,
    Ready { count: usize, at: DateTime<Utc> },
    /// Producer returned no objects ("sync required")
    Empty { at: DateTime<Utc> },
    /// Last refresh failed; `retained` items from the previous refresh are still shown
    Error {
        message: String,
        at: DateTime<Utc>,
        retained: usize,
    },
}

impl FeedStatus {
    pub fn is_error(&self) -> bool {
        matches!(self, FeedStatus::Error { .. })
    }

    /// Inline text for the status indicator
    pub fn message(&self) -> Option<String> {
        match self {
            FeedStatus::AwaitingCredential => Some("Sign in to load tracking data".to_string()),
            FeedStatus::Loading => Some("Scanning orbital space...".to_string()),
            FeedStatus::Ready { .. } => None,
            FeedStatus::Empty { .. } => {
                Some("No satellites found. Run a sync to download satellite data.".to_string())
            }
            FeedStatus::Error { message, .. } => Some(message.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SyncStatus {
    Idle,
    Pending,
    /// Upstream accepted; data changes on the next scheduled refresh
    Requested { at: DateTime<Utc> },
    Failed { message: String, at: DateTime<Utc> },
}

impl SyncStatus {
    pub fn message(&self) -> Option<String> {
        match self {
            SyncStatus::Idle => None,
            SyncStatus::Pending => Some("Requesting sync...".to_string()),
            SyncStatus::Requested { .. } => {
                Some("Sync started. New data appears on the next refresh.".to_string())
            }
            SyncStatus::Failed { message, .. } => Some(format!("Sync failed: {}", message)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusBoard {
    pub objects: FeedStatus,
    pub warnings: FeedStatus,
    pub sync: SyncStatus,
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self {
            objects: FeedStatus::Loading,
            warnings: FeedStatus::Loading,
            sync: SyncStatus::Idle,
        }
    }
}

impl StatusBoard {
    pub fn awaiting_credential() -> Self {
        Self {
            objects: FeedStatus::AwaitingCredential,
            warnings: FeedStatus::AwaitingCredential,
            sync: SyncStatus::Idle,
        }
    }

    pub fn objects_loaded(&mut self, count: usize) {
        let at = Utc::now();
        self.objects = if count == 0 {
            FeedStatus::Empty { at }
        } else {
            FeedStatus::Ready { count, at }
        };
    }

    pub fn warnings_loaded(&mut self, count: usize) {
        self.warnings = FeedStatus::Ready {
            count,
            at: Utc::now(),
        };
    }

    pub fn objects_failed(&mut self, err: &TrackingError, retained: usize) {
        self.objects = failure(err, retained);
    }

    pub fn warnings_failed(&mut self, err: &TrackingError, retained: usize) {
        self.warnings = failure(err, retained);
    }

    pub fn sync_pending(&mut self) {
        self.sync = SyncStatus::Pending;
    }

    pub fn sync_finished(&mut self, result: &Result<(), TrackingError>) {
        let at = Utc::now();
        self.sync = match result {
            Ok(()) => SyncStatus::Requested { at },
            Err(e) => SyncStatus::Failed {
                message: e.to_string(),
                at,
            },
        };
    }

    /// Messages to show inline. The warnings feed only speaks up on failure
    /// since the object feed already covers loading and sign-in.
    pub fn notices(&self) -> Vec<String> {
        let warnings = match &self.warnings {
            FeedStatus::Error { message, .. } => Some(format!("Warnings unavailable: {}", message)),
            _ => None,
        };
        self.objects
            .message()
            .into_iter()
            .chain(warnings)
            .chain(self.sync.message())
            .collect()
    }

    /// Any indicator that should be shown inline
    pub fn has_error(&self) -> bool {
        self.objects.is_error()
            || self.warnings.is_error()
            || matches!(self.sync, SyncStatus::Failed { .. })
    }
}

fn failure(err: &TrackingError, retained: usize) -> FeedStatus {
    FeedStatus::Error {
        message: err.to_string(),
        at: Utc::now(),
        retained,
    }
}
