//! Warning Index
//!
//! Membership and panel ordering over the current conjunction warning list.
//! Rebuilt in full on every warning refresh.

use crate::{CRITICAL_THRESHOLD_KM, FeedKind, TrackingError};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use tracing::warn;

/// Conjunction warning as produced upstream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Warning {
    /// Name of the endangered tracked object
    pub object: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(rename = "distance")]
    pub distance_km: f64,
    #[serde(deserialize_with = "deserialize_approach_time")]
    pub time_of_approach: DateTime<Utc>,
    pub hours_from_now: f64,
}

impl Warning {
    pub fn is_critical(&self) -> bool {
        self.distance_km < CRITICAL_THRESHOLD_KM
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if self.object.trim().is_empty() {
            return Err("warning without object name".to_string());
        }
        if !self.distance_km.is_finite() || self.distance_km < 0.0 {
            return Err(format!(
                "warning for {} has invalid distance {}",
                self.object, self.distance_km
            ));
        }
        Ok(())
    }
}

/// Accepts RFC 3339 or a naive ISO-8601 timestamp (taken as UTC)
fn deserialize_approach_time<'de, D>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_approach_time(&raw).ok_or_else(|| serde::de::Error::custom(format!("bad timestamp: {}", raw)))
}

pub fn parse_approach_time(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    let naive = raw.trim_end_matches('Z');
    NaiveDateTime::parse_from_str(naive, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|dt| dt.and_utc())
}

/// Warning feed payload `{warningCount, conjunctions}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WarningFeed {
    #[serde(default)]
    pub warning_count: Option<usize>,
    #[serde(default)]
    pub conjunctions: Vec<serde_json::Value>,
}

impl WarningFeed {
    /// Validate every record; malformed or negative-distance entries are
    /// dropped. Fails only when nothing in a non-empty payload is usable.
    pub fn into_warnings(self) -> crate::Result<Vec<Warning>> {
        let total = self.conjunctions.len();
        let mut warnings = Vec::with_capacity(total);

        for record in self.conjunctions {
            match serde_json::from_value::<Warning>(record) {
                Ok(w) => match w.validate() {
                    Ok(()) => warnings.push(w),
                    Err(e) => warn!("Rejected warning: {}", e),
                },
                Err(e) => warn!("Rejected warning record: {}", e),
            }
        }

        if let Some(count) = self.warning_count {
            if count != total {
                warn!("Warning feed count {} disagrees with {} entries", count, total);
            }
        }

        if total > 0 && warnings.is_empty() {
            return Err(TrackingError::decode(
                FeedKind::Warnings,
                format!("all {} conjunction records malformed", total),
            ));
        }

        Ok(warnings)
    }
}

#[derive(Debug, Clone, Default)]
pub struct WarningIndex {
    warnings: Vec<Warning>,
    members: HashSet<String>,
}

impl WarningIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rebuild(warnings: Vec<Warning>) -> Self {
        let members = warnings.iter().map(|w| w.object.clone()).collect();
        Self { warnings, members }
    }

    /// Is this object endangered (keyed by object name)
    pub fn contains(&self, name: &str) -> bool {
        self.members.contains(name)
    }

    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    /// At most `limit` warnings, closest first. Ties keep feed order.
    pub fn sorted_by_distance(&self, limit: usize) -> Vec<&Warning> {
        let mut sorted: Vec<&Warning> = self.warnings.iter().collect();
        sorted.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
        sorted.truncate(limit);
        sorted
    }

    pub fn has_critical(&self) -> bool {
        self.warnings.iter().any(Warning::is_critical)
    }

    pub fn critical_count(&self) -> usize {
        self.warnings.iter().filter(|w| w.is_critical()).count()
    }

    pub fn panel(&self, limit: usize) -> WarningPanel {
        let entries: Vec<WarningEntry> = self
            .sorted_by_distance(limit)
            .into_iter()
            .map(WarningEntry::from)
            .collect();

        WarningPanel {
            total: self.len(),
            critical: self.critical_count(),
            has_critical: self.has_critical(),
            overflow: self.len() - entries.len(),
            entries,
        }
    }
}

/// Conjunction panel as shown next to the globe
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WarningPanel {
    pub total: usize,
    pub critical: usize,
    pub has_critical: bool,
    pub entries: Vec<WarningEntry>,
    /// Warnings beyond the panel limit ("+N more objects")
    pub overflow: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarningEntry {
    pub object: String,
    pub distance_km: f64,
    pub time_of_approach: DateTime<Utc>,
    pub hours_from_now: f64,
    pub critical: bool,
}

impl From<&Warning> for WarningEntry {
    fn from(w: &Warning) -> Self {
        Self {
            object: w.object.clone(),
            distance_km: w.distance_km,
            time_of_approach: w.time_of_approach,
            hours_from_now: w.hours_from_now,
            critical: w.is_critical(),
        }
    }
}

#[cfg(test)]
pub(crate) fn warning(object: &str, distance_km: f64) -> Warning {
    Warning {
        object: object.to_string(),
        kind: None,
        distance_km,
        time_of_approach: DateTime::from_timestamp(1_767_225_600, 0).unwrap_or_default(),
        hours_from_now: 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_critical_and_sorted() {
        let index = WarningIndex::rebuild(vec![warning("SAT-A", 5.0), warning("SAT-B", 40.0)]);
        assert!(index.has_critical());

        let names: Vec<&str> = index
            .sorted_by_distance(10)
            .iter()
            .map(|w| w.object.as_str())
            .collect();
        assert_eq!(names, vec!["SAT-A", "SAT-B"]);
    }

    #[test]
    fn test_sorted_limit_and_ties() {
        let index = WarningIndex::rebuild(vec![
            warning("C", 30.0),
            warning("A", 12.0),
            warning("B", 12.0),
            warning("D", 1.0),
        ]);

        let sorted = index.sorted_by_distance(3);
        let names: Vec<&str> = sorted.iter().map(|w| w.object.as_str()).collect();
        assert_eq!(names, vec!["D", "A", "B"]);
        assert!(index.sorted_by_distance(0).is_empty());
    }

    #[test]
    fn test_not_critical_at_threshold() {
        let index = WarningIndex::rebuild(vec![warning("EDGE", 10.0)]);
        assert!(!index.has_critical());
        assert!(index.contains("EDGE"));
        assert!(!index.contains("edge"));
    }

    #[test]
    fn test_panel_overflow() {
        let warnings = (0..12).map(|i| warning(&format!("OBJ-{}", i), 20.0 - i as f64)).collect();
        let panel = WarningIndex::rebuild(warnings).panel(10);

        assert_eq!(panel.total, 12);
        assert_eq!(panel.entries.len(), 10);
        assert_eq!(panel.overflow, 2);
        assert_eq!(panel.entries[0].object, "OBJ-11");
        // distances run 20.0 down to 9.0, only 9.0 is under the threshold
        assert_eq!(panel.critical, 1);
        assert!(panel.has_critical);
    }

    #[test]
    fn test_feed_validation() {
        let feed: WarningFeed = serde_json::from_value(json!({
            "warningCount": 3,
            "conjunctions": [
                {"object": "SAT-A", "type": "DEBRIS", "distance": 5.0,
                 "timeOfApproach": "2026-01-01T00:10:00Z", "hoursFromNow": 0.2},
                {"object": "SAT-B", "distance": 42.5,
                 "timeOfApproach": "2026-01-01T03:00:00.000", "hoursFromNow": 3.0},
                {"object": "SAT-C", "distance": -1.0,
                 "timeOfApproach": "2026-01-01T03:00:00Z", "hoursFromNow": 3.0}
            ]
        }))
        .unwrap();

        let warnings = feed.into_warnings().unwrap();
        assert_eq!(warnings.len(), 2);
        assert_eq!(warnings[0].kind.as_deref(), Some("DEBRIS"));
        assert_eq!(warnings[1].time_of_approach.to_rfc3339(), "2026-01-01T03:00:00+00:00");
    }

    #[test]
    fn test_feed_all_malformed() {
        let feed = WarningFeed {
            warning_count: Some(1),
            conjunctions: vec![json!({"object": "X"})],
        };
        assert!(matches!(
            feed.into_warnings(),
            Err(TrackingError::Decode { feed: FeedKind::Warnings, .. })
        ));
    }
}
