//! Engine configuration

use crate::PATH_HORIZON_HOURS;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Object feed refresh interval in seconds (default: 30)
    pub catalog_interval_sec: u64,
    /// Warning feed refresh interval in seconds (default: 60)
    pub warning_interval_sec: u64,
    /// Delay before a typed search query is applied (default: 300ms)
    pub search_debounce_ms: u64,
    /// Predicted path horizon requested on selection
    pub path_horizon_hours: u32,
    /// Warnings shown in the conjunction panel before "+N more"
    pub warning_panel_limit: usize,
    /// Command channel capacity
    pub command_buffer: usize,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            catalog_interval_sec: 30,
            warning_interval_sec: 60,
            search_debounce_ms: 300,
            path_horizon_hours: PATH_HORIZON_HOURS,
            warning_panel_limit: 10,
            command_buffer: 64,
        }
    }
}

impl TrackingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn catalog_interval(&self) -> Duration {
        Duration::from_secs(self.catalog_interval_sec.max(1))
    }

    pub fn warning_interval(&self) -> Duration {
        Duration::from_secs(self.warning_interval_sec.max(1))
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    pub fn catalog_interval_sec(mut self, secs: u64) -> Self {
        self.catalog_interval_sec = secs;
        self
    }

    pub fn warning_interval_sec(mut self, secs: u64) -> Self {
        self.warning_interval_sec = secs;
        self
    }

    pub fn search_debounce_ms(mut self, ms: u64) -> Self {
        self.search_debounce_ms = ms;
        self
    }
}
