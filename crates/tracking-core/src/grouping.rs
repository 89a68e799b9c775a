//! Grouping Classifier
//!
//! Assigns every object to exactly one organisational group. Rules are
//! evaluated top to bottom, first match wins:
//!
//! | Order | Group | Name contains (case-insensitive) |
//! |-------|-------|----------------------------------|
//! | 1 | SpaceX | STARLINK, SPACEX, FALCON, DRAGON |
//! | 2 | ISS | ISS, ZARYA |
//! | 3 | NASA | NASA, HUBBLE, HST, TDRS, GOES, NOAA, TERRA, AQUA, LANDSAT, ... |
//! | 4 | ESA | ESA, SENTINEL, GALILEO, METOP, ENVISAT, CRYOSAT, ... |
//! | 5 | China | CSS, TIANGONG, TIANHE, SHENZHOU, BEIDOU, YAOGAN, CZ-, ... |
//! | 6 | Russia | COSMOS, KOSMOS, SOYUZ, PROGRESS, GLONASS, METEOR, SL-, ... |
//! | 7 | Other | everything else |
//!
//! The same classifier backs the group list and the group filter.

use crate::catalog::TrackedObject;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupId {
    SpaceX,
    Iss,
    Nasa,
    Esa,
    China,
    Russia,
    Other,
}

impl GroupId {
    /// All groups in rule order
    pub const ALL: [GroupId; 7] = [
        GroupId::SpaceX,
        GroupId::Iss,
        GroupId::Nasa,
        GroupId::Esa,
        GroupId::China,
        GroupId::Russia,
        GroupId::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GroupId::SpaceX => "spacex",
            GroupId::Iss => "iss",
            GroupId::Nasa => "nasa",
            GroupId::Esa => "esa",
            GroupId::China => "china",
            GroupId::Russia => "russia",
            GroupId::Other => "other",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            GroupId::SpaceX => "SpaceX / Starlink",
            GroupId::Iss => "ISS",
            GroupId::Nasa => "NASA",
            GroupId::Esa => "ESA",
            GroupId::China => "China",
            GroupId::Russia => "Russia",
            GroupId::Other => "Other",
        }
    }
}

impl std::fmt::Display for GroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GroupId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GroupId::ALL
            .into_iter()
            .find(|g| g.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown group: {}", s))
    }
}

/// Ordered substring rules. `Other` has no rule; it is the fallback.
const RULES: [(GroupId, &[&str]); 6] = [
    (GroupId::SpaceX, &["STARLINK", "SPACEX", "FALCON", "DRAGON"]),
    (GroupId::Iss, &["ISS", "ZARYA"]),
    (
        GroupId::Nasa,
        &[
            "NASA", "HUBBLE", "HST", "TDRS", "GOES", "NOAA", "TERRA", "AQUA", "LANDSAT", "AURA",
            "SWIFT", "FERMI", "ICESAT", "JPSS",
        ],
    ),
    (
        GroupId::Esa,
        &[
            "ESA", "SENTINEL", "GALILEO", "METOP", "ENVISAT", "CRYOSAT", "INTEGRAL", "SWARM",
            "PROBA",
        ],
    ),
    (
        GroupId::China,
        &[
            "CSS", "TIANGONG", "TIANHE", "WENTIAN", "MENGTIAN", "SHENZHOU", "TIANZHOU", "BEIDOU",
            "YAOGAN", "FENGYUN", "SHIJIAN", "CZ-",
        ],
    ),
    (
        GroupId::Russia,
        &[
            "COSMOS", "KOSMOS", "SOYUZ", "PROGRESS", "GLONASS", "METEOR", "RESURS", "SL-",
        ],
    ),
];

/// Classify an object name. Total and deterministic.
pub fn classify(name: &str) -> GroupId {
    let upper = name.to_uppercase();
    RULES
        .iter()
        .find(|(_, needles)| needles.iter().any(|n| upper.contains(n)))
        .map(|(group, _)| *group)
        .unwrap_or(GroupId::Other)
}

/// Group membership for list display
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupCount {
    pub group: GroupId,
    pub label: String,
    pub count: usize,
}

/// Member counts in rule order; empty groups are omitted
pub fn group_counts(objects: &[TrackedObject]) -> Vec<GroupCount> {
    let mut counts = [0usize; GroupId::ALL.len()];
    for obj in objects {
        counts[classify(&obj.name) as usize] += 1;
    }

    GroupId::ALL
        .into_iter()
        .zip(counts)
        .filter(|(_, count)| *count > 0)
        .map(|(group, count)| GroupCount {
            group,
            label: group.label().to_string(),
            count,
        })
        .collect()
}
