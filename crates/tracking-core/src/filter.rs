//! Filter Pipeline
//!
//! Pure composition of the display filters. Stages run in a fixed
//! precedence, each narrowing the previous output:
//!
//! 1. Isolation override (selected object only, remaining stages skipped)
//! 2. Focus mode (dangerous + hero objects)
//! 3. Group visibility
//! 4. Debounced text search
//! 5. Debris toggle

use crate::catalog::{ObjectKey, TrackedObject};
use crate::grouping::{classify, GroupId};
use crate::selection::SelectionState;
use crate::warnings::WarningIndex;
use crate::{DANGER_COLOR, NEUTRAL_COLOR};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Curated landmark objects always eligible in focus mode
pub const HERO_OBJECTS: &[&str] = &[
    "ISS (ZARYA)",
    "CSS (TIANHE)",
    "HST",
    "NOAA 19",
    "TERRA",
    "AQUA",
    "LANDSAT 8",
    "LANDSAT 9",
    "SENTINEL-1A",
    "SENTINEL-2A",
    "GOES 16",
    "GOES 18",
    "METOP-B",
    "ENVISAT",
    "SUOMI NPP",
    "JASON-3",
];

/// High-salience terms matched anywhere in the name
pub const SALIENT_TERMS: &[&str] = &["ISS", "ZARYA", "HUBBLE", "HST", "TIANGONG"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    /// Empty means every group is visible
    pub visible_groups: BTreeSet<GroupId>,
    pub search_query: String,
    pub debounced_query: String,
    pub show_debris: bool,
    /// false = focus mode
    pub show_all: bool,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            visible_groups: BTreeSet::new(),
            search_query: String::new(),
            debounced_query: String::new(),
            show_debris: true,
            show_all: false,
        }
    }
}

impl FilterState {
    pub fn toggle_group(&mut self, group: GroupId) {
        if !self.visible_groups.remove(&group) {
            self.visible_groups.insert(group);
        }
    }

    /// Raw query has not been applied yet
    pub fn search_pending(&self) -> bool {
        self.search_query != self.debounced_query
    }
}

/// Everything the display set depends on
#[derive(Debug, Clone, Copy)]
pub struct DisplayInputs<'a> {
    pub catalog: &'a [TrackedObject],
    pub warnings: &'a WarningIndex,
    pub selection: &'a SelectionState,
    pub filters: &'a FilterState,
}

pub fn is_hero(name: &str) -> bool {
    let upper = name.to_uppercase();
    HERO_OBJECTS.iter().any(|hero| upper == *hero || upper.contains(hero))
        || SALIENT_TERMS.iter().any(|term| upper.contains(term))
}

fn passes_focus(obj: &TrackedObject, warnings: &WarningIndex) -> bool {
    warnings.contains(&obj.name) || is_hero(&obj.name)
}

fn passes_groups(obj: &TrackedObject, groups: &BTreeSet<GroupId>) -> bool {
    groups.is_empty() || groups.contains(&classify(&obj.name))
}

fn passes_search(obj: &TrackedObject, needle: &str) -> bool {
    needle.is_empty() || obj.name.to_lowercase().contains(needle)
}

/// Compute the objects to render. Same inputs, same output, same order.
pub fn compute_display_set(inputs: DisplayInputs<'_>) -> Vec<TrackedObject> {
    let DisplayInputs {
        catalog,
        warnings,
        selection,
        filters,
    } = inputs;

    if let Some(selected) = selection.isolated_object() {
        return vec![selected.clone()];
    }

    let needle = filters.debounced_query.trim().to_lowercase();

    catalog
        .iter()
        .filter(|obj| filters.show_all || passes_focus(obj, warnings))
        .filter(|obj| passes_groups(obj, &filters.visible_groups))
        .filter(|obj| passes_search(obj, &needle))
        .filter(|obj| filters.show_debris || !obj.is_debris())
        .cloned()
        .collect()
}

/// Render-ready point on the globe
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayPoint {
    pub key: ObjectKey,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    /// Altitude in Earth radii
    pub alt: f64,
    pub color: &'static str,
    pub group: GroupId,
    pub kind: String,
    pub dangerous: bool,
}

/// Danger colour for warning members, neutral otherwise
pub fn point_color(obj: &TrackedObject, warnings: &WarningIndex) -> &'static str {
    if warnings.contains(&obj.name) {
        DANGER_COLOR
    } else {
        NEUTRAL_COLOR
    }
}

pub fn render_points(display: &[TrackedObject], warnings: &WarningIndex) -> Vec<DisplayPoint> {
    display
        .iter()
        .map(|obj| DisplayPoint {
            key: obj.key(),
            name: obj.name.clone(),
            lat: obj.latitude,
            lng: obj.longitude,
            alt: obj.normalized_altitude(),
            color: point_color(obj, warnings),
            group: classify(&obj.name),
            kind: obj.kind.clone(),
            dangerous: warnings.contains(&obj.name),
        })
        .collect()
}
