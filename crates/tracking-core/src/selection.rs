//! Selection / Inspection Controller
//!
//! At most one inspected object, its predicted path and isolation mode.
//!
//! ```text
//! Idle ──select──► Selecting ──path ok/failed──► Selected
//!  ▲                   │  ▲                         │
//!  └──────clear────────┘  └────────select───────────┘
//! ```
//!
//! Path fetches are tagged with a [`PathTicket`]; a completion is applied
//! only when its ticket matches the live selection (last request wins).

use crate::catalog::{ObjectKey, TrackedObject};
use crate::warnings::WarningIndex;
use crate::{altitude_to_km, normalize_altitude, TrackingError, DANGER_COLOR, SELECTION_COLOR};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Surface the selection was made from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionOrigin {
    List,
    Globe,
    /// Warning panel click; forces the danger colour
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPhase {
    Idle,
    Selecting,
    Selected,
}

/// Identity of one issued path request
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathTicket {
    pub seq: u64,
    pub key: ObjectKey,
    /// Feed id the path is requested for
    pub object_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathPoint {
    pub lat: f64,
    pub lng: f64,
    /// Altitude in Earth radii
    pub alt: f64,
}

/// Path sample as returned by the path feed
#[derive(Debug, Clone, Deserialize)]
pub struct RawPathPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
}

/// Normalise path samples; non-finite samples are dropped
pub fn decode_path(raw: Vec<RawPathPoint>) -> Vec<PathPoint> {
    let total = raw.len();
    let points: Vec<PathPoint> = raw
        .into_iter()
        .filter(|p| p.latitude.is_finite() && p.longitude.is_finite() && p.altitude.is_finite())
        .map(|p| PathPoint {
            lat: p.latitude,
            lng: p.longitude,
            alt: normalize_altitude(altitude_to_km(p.altitude)),
        })
        .collect();

    if points.len() < total {
        warn!("Path feed: dropped {} malformed samples", total - points.len());
    }
    points
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictedPath {
    pub name: String,
    pub color: &'static str,
    pub points: Vec<PathPoint>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum PathState {
    #[default]
    Empty,
    Loading(u64),
    Loaded(PredictedPath),
    Failed(String),
}

/// Globe camera request
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraView {
    pub lat: f64,
    pub lng: f64,
    pub altitude: f64,
}

impl CameraView {
    /// Whole-globe view used when nothing is inspected
    pub const GLOBAL: CameraView = CameraView {
        lat: 0.0,
        lng: 0.0,
        altitude: 2.5,
    };

    pub fn focus(obj: &TrackedObject) -> Self {
        Self {
            lat: obj.latitude,
            lng: obj.longitude,
            altitude: 1.5,
        }
    }
}

impl Default for CameraView {
    fn default() -> Self {
        Self::GLOBAL
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionState {
    /// Frozen at selection time; catalog refreshes do not move it
    pub selected_object: Option<TrackedObject>,
    pub isolation_mode: bool,
    pub is_warning_path: bool,
    pub path: PathState,
}

impl SelectionState {
    /// Object the display is restricted to, if isolation is active
    pub fn isolated_object(&self) -> Option<&TrackedObject> {
        if self.isolation_mode {
            self.selected_object.as_ref()
        } else {
            None
        }
    }

    pub fn phase(&self) -> SelectionPhase {
        match (&self.selected_object, &self.path) {
            (None, _) => SelectionPhase::Idle,
            (Some(_), PathState::Loading(_)) => SelectionPhase::Selecting,
            (Some(_), _) => SelectionPhase::Selected,
        }
    }

    /// Ring and path colour, pinned at selection time
    pub fn highlight_color(&self) -> &'static str {
        if self.is_warning_path {
            DANGER_COLOR
        } else {
            SELECTION_COLOR
        }
    }

    pub fn path_points(&self) -> &[PathPoint] {
        match &self.path {
            PathState::Loaded(path) => &path.points,
            _ => &[],
        }
    }
}

pub struct SelectOutcome {
    /// Path request to issue; `None` when the object carries no feed id
    pub ticket: Option<PathTicket>,
    pub camera: CameraView,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathOutcome {
    Applied,
    Failed,
    /// Selection moved on; result discarded
    Stale,
}

#[derive(Debug, Default)]
pub struct SelectionController {
    state: SelectionState,
    next_seq: u64,
}

impl SelectionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    pub fn select(
        &mut self,
        object: TrackedObject,
        origin: SelectionOrigin,
        warnings: &WarningIndex,
    ) -> SelectOutcome {
        let is_warning_path = origin == SelectionOrigin::Warning || warnings.contains(&object.name);
        let camera = CameraView::focus(&object);

        self.next_seq += 1;
        let seq = self.next_seq;

        let ticket = object.id.clone().map(|object_id| PathTicket {
            seq,
            key: object.key(),
            object_id,
        });

        info!(
            "Selected {} via {:?} (warning path: {})",
            object.name, origin, is_warning_path
        );

        self.state = SelectionState {
            path: match &ticket {
                Some(t) => PathState::Loading(t.seq),
                None => {
                    warn!("{} has no feed id, no path requested", object.name);
                    PathState::Empty
                }
            },
            selected_object: Some(object),
            isolation_mode: true,
            is_warning_path,
        };

        SelectOutcome { ticket, camera }
    }

    /// Apply a path fetch result if it still belongs to the live selection
    pub fn complete_path(
        &mut self,
        ticket: &PathTicket,
        result: Result<Vec<PathPoint>, TrackingError>,
    ) -> PathOutcome {
        let live = match (&self.state.selected_object, &self.state.path) {
            (Some(obj), PathState::Loading(seq)) => *seq == ticket.seq && obj.key() == ticket.key,
            _ => false,
        };
        if !live {
            debug!("Discarding stale path for {:?} (seq {})", ticket.key, ticket.seq);
            return PathOutcome::Stale;
        }

        match result {
            Ok(points) => {
                let name = self
                    .state
                    .selected_object
                    .as_ref()
                    .map(|o| o.name.clone())
                    .unwrap_or_default();
                debug!("Path for {} loaded ({} points)", name, points.len());
                self.state.path = PathState::Loaded(PredictedPath {
                    name,
                    color: self.state.highlight_color(),
                    points,
                });
                PathOutcome::Applied
            }
            Err(e) => {
                warn!("Path fetch failed: {}", e);
                self.state.path = PathState::Failed(e.to_string());
                PathOutcome::Failed
            }
        }
    }

    /// Back to idle; returns the camera view to recentre on
    pub fn clear(&mut self) -> CameraView {
        if let Some(obj) = &self.state.selected_object {
            info!("Cleared selection of {}", obj.name);
        }
        self.state = SelectionState::default();
        CameraView::GLOBAL
    }

    /// Leave or re-enter isolation while keeping the highlight.
    /// Returns whether anything changed.
    pub fn set_isolation(&mut self, enabled: bool) -> bool {
        if self.state.selected_object.is_none() || self.state.isolation_mode == enabled {
            return false;
        }
        self.state.isolation_mode = enabled;
        true
    }

    pub fn view(&self) -> SelectionView {
        let state = &self.state;
        SelectionView {
            phase: state.phase(),
            object: state.selected_object.clone(),
            isolation_mode: state.isolation_mode,
            is_warning_path: state.is_warning_path,
            color: state.selected_object.as_ref().map(|_| state.highlight_color()),
            path: match &state.path {
                PathState::Loaded(path) => Some(path.clone()),
                _ => None,
            },
            path_error: match &state.path {
                PathState::Failed(message) => Some(message.clone()),
                _ => None,
            },
        }
    }
}

/// Selection as published to the rendering consumer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectionView {
    pub phase: SelectionPhase,
    pub object: Option<TrackedObject>,
    pub isolation_mode: bool,
    pub is_warning_path: bool,
    /// Highlight ring colour
    pub color: Option<&'static str>,
    pub path: Option<PredictedPath>,
    pub path_error: Option<String>,
}
