//! Catalog Store
//!
//! Holds the latest object snapshot. Every refresh replaces the whole
//! snapshot; objects from two refreshes never coexist.

use crate::{altitude_to_km, normalize_altitude};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

pub const UNKNOWN_KIND: &str = "UNKNOWN";

/// Identity used for UI continuity across refreshes
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "by", content = "value", rename_all = "snake_case")]
pub enum ObjectKey {
    Id(String),
    Name(String),
}

/// Feed ids are numeric for database-backed producers, strings elsewhere.
/// An id of any other shape is dropped and the object falls back to its name.
fn lenient_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.and_then(id_from_value))
}

fn id_from_value(value: Value) -> Option<String> {
    let id = match &value {
        Value::Null => return None,
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => n
            .as_u64()
            .map(|u| u.to_string())
            .or_else(|| n.as_i64().map(|i| i.to_string()))
            .or_else(|| {
                n.as_f64()
                    .filter(|f| f.is_finite() && f.fract() == 0.0)
                    .map(|f| format!("{:.0}", f))
            }),
        _ => None,
    };

    let id = id.filter(|id| !id.is_empty());
    if id.is_none() {
        debug!("Ignoring unusable object id {}", value);
    }
    id
}

/// Object record as it arrives from the object feed
#[derive(Debug, Clone, Deserialize)]
struct RawObject {
    #[serde(default, deserialize_with = "lenient_id")]
    id: Option<String>,
    name: String,
    latitude: f64,
    longitude: f64,
    altitude: f64,
    #[serde(alias = "type")]
    kind: Option<String>,
    velocity_km_s: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedObject {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Altitude after unit normalisation (always km)
    pub altitude_km: f64,
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub velocity_km_s: Option<f64>,
}

impl TrackedObject {
    pub fn new(name: impl Into<String>, latitude: f64, longitude: f64, raw_altitude: f64) -> Self {
        Self {
            id: None,
            name: name.into(),
            latitude,
            longitude,
            altitude_km: altitude_to_km(raw_altitude),
            kind: UNKNOWN_KIND.to_string(),
            velocity_km_s: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    pub fn key(&self) -> ObjectKey {
        match &self.id {
            Some(id) => ObjectKey::Id(id.clone()),
            None => ObjectKey::Name(self.name.clone()),
        }
    }

    /// Same tracked object across two snapshots: by id when both carry one,
    /// otherwise by name.
    pub fn same_identity(&self, other: &TrackedObject) -> bool {
        match (&self.id, &other.id) {
            (Some(a), Some(b)) => a == b,
            _ => self.name == other.name,
        }
    }

    pub fn normalized_altitude(&self) -> f64 {
        normalize_altitude(self.altitude_km)
    }

    pub fn is_debris(&self) -> bool {
        self.kind.eq_ignore_ascii_case("DEBRIS")
    }

    fn from_raw(raw: RawObject) -> Option<Self> {
        let name = raw.name.trim();
        if name.is_empty() {
            return None;
        }
        if !(raw.latitude.is_finite() && raw.longitude.is_finite() && raw.altitude.is_finite()) {
            return None;
        }

        let kind = raw
            .kind
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .unwrap_or_else(|| UNKNOWN_KIND.to_string());

        Some(Self {
            id: raw.id,
            name: name.to_string(),
            latitude: raw.latitude,
            longitude: raw.longitude,
            altitude_km: altitude_to_km(raw.altitude),
            kind,
            velocity_km_s: raw.velocity_km_s.filter(|v| v.is_finite()),
        })
    }
}

/// Result of validating one object feed payload
#[derive(Debug, Clone, Default)]
pub struct DecodedCatalog {
    pub objects: Vec<TrackedObject>,
    pub rejected: usize,
}

/// Validate raw feed records into tracked objects.
///
/// Records missing a name, coordinates or altitude are rejected
/// individually; the rest of the payload is kept.
pub fn decode_objects(records: Vec<serde_json::Value>) -> DecodedCatalog {
    let mut decoded = DecodedCatalog::default();

    for (i, record) in records.into_iter().enumerate() {
        let parsed = serde_json::from_value::<RawObject>(record)
            .ok()
            .and_then(TrackedObject::from_raw);

        match parsed {
            Some(obj) => decoded.objects.push(obj),
            None => {
                debug!("Rejected object record #{}", i);
                decoded.rejected += 1;
            }
        }
    }

    if decoded.rejected > 0 {
        warn!(
            "Object feed: kept {} records, rejected {} malformed",
            decoded.objects.len(),
            decoded.rejected
        );
    }

    decoded
}

#[derive(Debug, Clone, Default)]
pub enum CatalogState {
    /// No refresh has completed yet
    #[default]
    NotLoaded,
    /// Snapshot from one refresh (possibly empty: "sync required")
    Loaded(Arc<[TrackedObject]>),
}

impl CatalogState {
    pub fn objects(&self) -> &[TrackedObject] {
        match self {
            CatalogState::NotLoaded => &[],
            CatalogState::Loaded(objects) => objects,
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, CatalogState::Loaded(_))
    }

    /// Loaded, but the producer returned zero objects
    pub fn is_empty_catalog(&self) -> bool {
        matches!(self, CatalogState::Loaded(objects) if objects.is_empty())
    }
}

#[derive(Debug, Default)]
pub struct CatalogStore {
    state: CatalogState,
    generation: u64,
}

impl CatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically replace the snapshot
    pub fn replace(&mut self, objects: Vec<TrackedObject>) {
        self.state = CatalogState::Loaded(objects.into());
        self.generation += 1;
    }

    pub fn state(&self) -> &CatalogState {
        &self.state
    }

    pub fn objects(&self) -> &[TrackedObject] {
        self.state.objects()
    }

    /// Shared handle to the current snapshot
    pub fn snapshot(&self) -> Arc<[TrackedObject]> {
        match &self.state {
            CatalogState::NotLoaded => Arc::from(Vec::new()),
            CatalogState::Loaded(objects) => Arc::clone(objects),
        }
    }

    /// Number of completed refreshes
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.objects().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects().is_empty()
    }

    /// Look up by id first, then by exact name
    pub fn find(&self, query: &str) -> Option<&TrackedObject> {
        find_object(self.objects(), query)
    }
}

pub fn find_object<'a>(objects: &'a [TrackedObject], query: &str) -> Option<&'a TrackedObject> {
    objects
        .iter()
        .find(|o| o.id.as_deref() == Some(query))
        .or_else(|| objects.iter().find(|o| o.name == query))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_objects() {
        let decoded = decode_objects(vec![
            json!({"id": 25544, "name": "ISS (ZARYA)", "latitude": 0.0, "longitude": 0.0, "altitude": 400.0}),
            json!({"name": "STARLINK-1007", "latitude": 10.0, "longitude": 20.0, "altitude": 550000.0, "kind": "PAYLOAD", "velocity_km_s": 7.6}),
            json!({"name": "NO COORDS", "altitude": 500.0}),
            json!({"id": "x", "latitude": 1.0, "longitude": 1.0, "altitude": 1.0}),
        ]);

        assert_eq!(decoded.objects.len(), 2);
        assert_eq!(decoded.rejected, 2);

        let iss = &decoded.objects[0];
        assert_eq!(iss.id.as_deref(), Some("25544"));
        assert_eq!(iss.kind, UNKNOWN_KIND);
        assert!((iss.normalized_altitude() - 400.0 / 6371.0).abs() < 1e-12);

        let starlink = &decoded.objects[1];
        assert_eq!(starlink.id, None);
        assert_eq!(starlink.altitude_km, 550.0);
        assert_eq!(starlink.velocity_km_s, Some(7.6));
        assert_eq!(starlink.key(), ObjectKey::Name("STARLINK-1007".to_string()));
    }

    #[test]
    fn test_unusable_id_falls_back_to_name() {
        let decoded = decode_objects(vec![
            json!({"id": 25544.0, "name": "ISS (ZARYA)", "latitude": 0.0, "longitude": 0.0, "altitude": 400.0}),
            json!({"id": u64::MAX, "name": "HST", "latitude": 0.0, "longitude": 0.0, "altitude": 540.0}),
            json!({"id": true, "name": "NOAA 19", "latitude": 0.0, "longitude": 0.0, "altitude": 850.0}),
            json!({"id": 12.5, "name": "TERRA", "latitude": 0.0, "longitude": 0.0, "altitude": 705.0}),
            json!({"id": "  ", "name": "AQUA", "latitude": 0.0, "longitude": 0.0, "altitude": 705.0}),
            json!({"id": null, "name": "GOES 16", "latitude": 0.0, "longitude": 0.0, "altitude": 35786.0}),
        ]);

        assert_eq!(decoded.rejected, 0);
        let ids: Vec<Option<&str>> = decoded.objects.iter().map(|o| o.id.as_deref()).collect();
        assert_eq!(
            ids,
            vec![Some("25544"), Some("18446744073709551615"), None, None, None, None]
        );
        assert_eq!(decoded.objects[2].key(), ObjectKey::Name("NOAA 19".to_string()));
    }

    #[test]
    fn test_type_alias_for_kind() {
        let decoded = decode_objects(vec![json!({
            "name": "FENGYUN 1C DEB", "latitude": 1.0, "longitude": 2.0, "altitude": 800.0, "type": "debris"
        })]);
        assert!(decoded.objects[0].is_debris());
    }

    #[test]
    fn test_replace_is_atomic() {
        let mut store = CatalogStore::new();
        assert!(!store.state().is_loaded());

        store.replace(vec![
            TrackedObject::new("A", 0.0, 0.0, 400.0),
            TrackedObject::new("B", 0.0, 0.0, 400.0),
        ]);
        let first = store.snapshot();

        store.replace(vec![TrackedObject::new("C", 0.0, 0.0, 400.0)]);
        assert_eq!(store.generation(), 2);
        assert_eq!(store.len(), 1);
        assert_eq!(store.objects()[0].name, "C");
        // readers holding the previous snapshot still see it whole
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn test_empty_catalog_is_distinct() {
        let mut store = CatalogStore::new();
        assert!(!store.state().is_empty_catalog());

        store.replace(Vec::new());
        assert!(store.state().is_loaded());
        assert!(store.state().is_empty_catalog());
    }

    #[test]
    fn test_identity() {
        let a = TrackedObject::new("ISS (ZARYA)", 0.0, 0.0, 400.0).with_id("25544");
        let moved = TrackedObject::new("ISS (ZARYA)", 5.0, 5.0, 410.0).with_id("25544");
        let renamed = TrackedObject::new("ISS", 5.0, 5.0, 410.0).with_id("25544");
        let nameless_id = TrackedObject::new("ISS (ZARYA)", 5.0, 5.0, 410.0);

        assert!(a.same_identity(&moved));
        assert!(a.same_identity(&renamed));
        assert!(a.same_identity(&nameless_id));
        assert!(!a.same_identity(&TrackedObject::new("HST", 0.0, 0.0, 540.0).with_id("20580")));
    }

    #[test]
    fn test_find() {
        let mut store = CatalogStore::new();
        store.replace(vec![
            TrackedObject::new("HST", 0.0, 0.0, 540.0).with_id("20580"),
            TrackedObject::new("20580", 0.0, 0.0, 540.0),
        ]);
        assert_eq!(store.find("20580").map(|o| o.name.as_str()), Some("HST"));
        assert!(store.find("missing").is_none());
    }
}
