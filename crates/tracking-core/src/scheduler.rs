//! Refresh Scheduler
//!
//! Two independent periodic pulls (objects, warnings) plus manual refresh.
//! Overlapping requests are not coalesced; instead every request carries a
//! per-feed sequence number and a response older than the newest applied
//! one is dropped, so a slow early response can never overwrite fresher data.

use crate::config::TrackingConfig;
use crate::FeedKind;
use std::time::Duration;
use tokio::time::{interval, Interval, MissedTickBehavior};
use tracing::debug;

/// Monotonic request numbering for one feed
#[derive(Debug, Clone, Default)]
pub struct FeedSequencer {
    issued: u64,
    applied: u64,
}

impl FeedSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number the next outgoing request
    pub fn issue(&mut self) -> u64 {
        self.issued += 1;
        self.issued
    }

    /// Accept a response if it is newer than anything applied so far
    pub fn accept(&mut self, seq: u64) -> bool {
        if seq <= self.applied || seq > self.issued {
            return false;
        }
        self.applied = seq;
        true
    }

    pub fn last_applied(&self) -> u64 {
        self.applied
    }
}

#[derive(Debug)]
pub struct RefreshScheduler {
    catalog_every: Duration,
    warnings_every: Duration,
    objects: FeedSequencer,
    warnings: FeedSequencer,
}

impl RefreshScheduler {
    pub fn new(config: &TrackingConfig) -> Self {
        Self {
            catalog_every: config.catalog_interval(),
            warnings_every: config.warning_interval(),
            objects: FeedSequencer::new(),
            warnings: FeedSequencer::new(),
        }
    }

    /// Timers for the two periodic pulls. The first tick fires immediately.
    pub fn timers(&self) -> (Interval, Interval) {
        (ticker(self.catalog_every), ticker(self.warnings_every))
    }

    pub fn issue(&mut self, feed: FeedKind) -> u64 {
        let seq = self.sequencer(feed).issue();
        debug!("Issuing {} refresh #{}", feed, seq);
        seq
    }

    pub fn accept(&mut self, feed: FeedKind, seq: u64) -> bool {
        let sequencer = self.sequencer(feed);
        let accepted = sequencer.accept(seq);
        if !accepted {
            debug!(
                "Dropping out-of-order {} response #{} (applied #{})",
                feed,
                seq,
                sequencer.last_applied()
            );
        }
        accepted
    }

    fn sequencer(&mut self, feed: FeedKind) -> &mut FeedSequencer {
        match feed {
            FeedKind::Warnings => &mut self.warnings,
            _ => &mut self.objects,
        }
    }
}

fn ticker(period: Duration) -> Interval {
    let mut timer = interval(period);
    // a slow tick is not followed by a burst of catch-up refreshes
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    timer
}
