//! The in-memory vessel table: latest position, static voyage data and a
//! rolling position history per MMSI, backed by the [`RTree`] spatial
//! index for bounding-box queries.

use std::collections::{HashMap, VecDeque};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::messages::position_report::NavigationStatus;
use crate::messages::types::ShipType;
use crate::rtree::RTree;
use crate::spatial::{split_antimeridian, Point, Rectangle};

/// Rolling history FIFO capacity. Once full, the oldest
/// `HISTORY_MAX - HISTORY_MIN` entries are dropped in one compaction pass.
pub const HISTORY_MAX: usize = 120;
/// History length a full buffer is compacted down to before the newest
/// point is pushed (so the testable property "immediately after a
/// compaction it retains exactly `HISTORY_MIN + 1`" holds).
pub const HISTORY_MIN: usize = 60;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("mmsi {0} unknown to the vessel store")]
    NotFound(u32),
}

/// Latest dynamic (fast-changing) report for a vessel.
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicPosition {
    pub point: Point,
    pub accuracy_augmented: bool,
    pub navigation_status: Option<NavigationStatus>,
    pub true_heading: Option<u16>,
    pub course_over_ground: Option<f32>,
    pub speed_over_ground: Option<f32>,
    pub rate_of_turn: Option<f32>,
    pub updated_at: DateTime<Utc>,
}

/// Slow-changing voyage/static data, built up from type 5 and 24 reports.
/// `update_static` only ever overwrites a field when the incoming value is
/// non-empty, so a type 24 Part A/B pair progressively fills this in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StaticInfo {
    pub ship_type: Option<ShipType>,
    pub draught: Option<f32>,
    pub dimension_to_bow: Option<u16>,
    pub dimension_to_stern: Option<u16>,
    pub dimension_to_port: Option<u16>,
    pub dimension_to_starboard: Option<u16>,
    pub callsign: Option<String>,
    pub name: Option<String>,
    pub destination: Option<String>,
    pub eta: Option<Eta>,
}

impl StaticInfo {
    pub fn length(&self) -> Option<u16> {
        match (self.dimension_to_bow, self.dimension_to_stern) {
            (Some(bow), Some(stern)) => Some(bow + stern),
            _ => None,
        }
    }

    pub fn width(&self) -> Option<u16> {
        match (self.dimension_to_port, self.dimension_to_starboard) {
            (Some(port), Some(starboard)) => Some(port + starboard),
            _ => None,
        }
    }

    /// Overwrites each field of `self` with `incoming`'s, except where
    /// `incoming` carries an empty/absent value -- that's `update_static`'s
    /// "overwrite named static fields with non-empty values" rule.
    fn merge_from(&mut self, incoming: &StaticInfo) {
        if incoming.ship_type.is_some() {
            self.ship_type = incoming.ship_type;
        }
        if incoming.draught.is_some() {
            self.draught = incoming.draught;
        }
        if incoming.dimension_to_bow.is_some() {
            self.dimension_to_bow = incoming.dimension_to_bow;
        }
        if incoming.dimension_to_stern.is_some() {
            self.dimension_to_stern = incoming.dimension_to_stern;
        }
        if incoming.dimension_to_port.is_some() {
            self.dimension_to_port = incoming.dimension_to_port;
        }
        if incoming.dimension_to_starboard.is_some() {
            self.dimension_to_starboard = incoming.dimension_to_starboard;
        }
        if let Some(callsign) = &incoming.callsign {
            if !callsign.is_empty() {
                self.callsign = Some(callsign.clone());
            }
        }
        if let Some(name) = &incoming.name {
            if !name.is_empty() {
                self.name = Some(name.clone());
            }
        }
        if let Some(destination) = &incoming.destination {
            if !destination.is_empty() {
                self.destination = Some(destination.clone());
            }
        }
        if incoming.eta.is_some() {
            self.eta = incoming.eta;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Eta {
    pub month: Option<u8>,
    pub day: Option<u8>,
    pub hour: Option<u8>,
    pub minute: Option<u8>,
}

/// Everything the store knows about one MMSI.
#[derive(Debug, Clone, Default)]
pub struct VesselRecord {
    pub position: Option<DynamicPosition>,
    pub static_info: StaticInfo,
    pub history: VecDeque<(Point, DateTime<Utc>)>,
}

fn is_stopped(status: Option<NavigationStatus>) -> bool {
    matches!(
        status,
        Some(NavigationStatus::AtAnchor) | Some(NavigationStatus::Moored) | Some(NavigationStatus::Aground)
    )
}

/// Concurrent vessel table. The identifier map is a `RwLock` (many
/// concurrent readers, exclusive only while a vessel is first created or
/// removed); individual records use their own lock so that an update to
/// one vessel never blocks readers or writers of another.
pub struct VesselStore {
    records: RwLock<HashMap<u32, RwLock<VesselRecord>>>,
    index: RwLock<RTree>,
}

impl Default for VesselStore {
    fn default() -> Self {
        Self::new()
    }
}

impl VesselStore {
    pub fn new() -> Self {
        VesselStore {
            records: RwLock::new(HashMap::new()),
            index: RwLock::new(RTree::new()),
        }
    }

    fn ensure_record(&self, mmsi: u32) {
        if self.records.read().unwrap().contains_key(&mmsi) {
            return;
        }
        self.records
            .write()
            .unwrap()
            .entry(mmsi)
            .or_insert_with(|| RwLock::new(VesselRecord::default()));
    }

    pub fn update_static(&self, mmsi: u32, info: StaticInfo) {
        self.ensure_record(mmsi);
        let records = self.records.read().unwrap();
        let mut record = records[&mmsi].write().unwrap();
        record.static_info.merge_from(&info);
    }

    /// Applies a dynamic (position) report. Stale reports (timestamp not
    /// strictly newer than the one already on file) are silently ignored.
    pub fn update_dynamic(&self, mmsi: u32, point: Point, received_at: DateTime<Utc>, dynamic: DynamicPosition) {
        self.ensure_record(mmsi);
        let position_changed;
        {
            let records = self.records.read().unwrap();
            let mut record = records[&mmsi].write().unwrap();
            if let Some(existing) = &record.position {
                if received_at <= existing.updated_at {
                    return;
                }
            }
            let current_status = record.position.as_ref().and_then(|p| p.navigation_status);
            let both_stopped = is_stopped(current_status) && is_stopped(dynamic.navigation_status) && !record.history.is_empty();
            if point.is_valid() && !both_stopped {
                if record.history.len() == HISTORY_MAX {
                    let drop_count = HISTORY_MAX - HISTORY_MIN;
                    for _ in 0..drop_count {
                        record.history.pop_front();
                    }
                }
                record.history.push_back((point, received_at));
            }
            position_changed = record.position.as_ref().map(|p| p.point) != Some(point);
            record.position = Some(dynamic);
        }
        if position_changed {
            let rect = point.as_rectangle();
            let mut index = self.index.write().unwrap();
            if index.contains(mmsi) {
                let _ = index.update(mmsi, rect);
            } else {
                let _ = index.insert(mmsi, rect);
            }
        }
    }

    /// Current coordinates, if the vessel is known and has reported a
    /// position.
    pub fn coords(&self, mmsi: u32) -> Option<Point> {
        let records = self.records.read().unwrap();
        let record = records.get(&mmsi)?.read().unwrap();
        record.position.as_ref().map(|p| p.point)
    }

    /// The vessel's full record plus history, as a GeoJSON
    /// `FeatureCollection`: a Point feature carrying every known
    /// attribute, and -- if at least two history points are on file -- a
    /// LineString feature tracing the rolling track.
    pub fn select(&self, mmsi: u32) -> Result<serde_json::Value, Error> {
        let records = self.records.read().unwrap();
        let record = records.get(&mmsi).ok_or(Error::NotFound(mmsi))?.read().unwrap();
        let position = record.position.as_ref().ok_or(Error::NotFound(mmsi))?;

        let mut properties = serde_json::Map::new();
        properties.insert("mmsi".into(), mmsi.into());
        properties.insert("accuracy_augmented".into(), position.accuracy_augmented.into());
        properties.insert("navigation_status".into(), serde_json::to_value(position.navigation_status.map(DebugName)).unwrap_or(serde_json::Value::Null));
        properties.insert("true_heading".into(), position.true_heading.into());
        properties.insert("course_over_ground".into(), position.course_over_ground.into());
        properties.insert("speed_over_ground".into(), position.speed_over_ground.into());
        properties.insert("rate_of_turn".into(), position.rate_of_turn.into());
        properties.insert("updated_at".into(), position.updated_at.to_rfc3339().into());
        properties.insert("ship_type".into(), serde_json::to_value(record.static_info.ship_type.map(DebugName)).unwrap_or(serde_json::Value::Null));
        properties.insert("draught".into(), record.static_info.draught.into());
        properties.insert("length".into(), record.static_info.length().into());
        properties.insert("width".into(), record.static_info.width().into());
        properties.insert("callsign".into(), record.static_info.callsign.clone().into());
        properties.insert("name".into(), record.static_info.name.clone().into());
        properties.insert("destination".into(), record.static_info.destination.clone().into());
        properties.insert("eta".into(), serde_json::to_value(record.static_info.eta).unwrap_or(serde_json::Value::Null));

        let point_feature = serde_json::json!({
            "type": "Feature",
            "geometry": {
                "type": "Point",
                "coordinates": [position.point.lon, position.point.lat],
            },
            "properties": properties,
        });

        let mut features = vec![point_feature];
        if record.history.len() >= 2 {
            let coordinates: Vec<[f64; 2]> = record.history.iter().map(|(p, _)| [p.lon, p.lat]).collect();
            features.push(serde_json::json!({
                "type": "Feature",
                "geometry": {
                    "type": "LineString",
                    "coordinates": coordinates,
                },
                "properties": {},
            }));
        }

        Ok(serde_json::json!({
            "type": "FeatureCollection",
            "features": features,
        }))
    }

    /// Bounding-box query, antimeridian-aware: `sw`/`ne` define the query
    /// box; a box that wraps the date line is decomposed into up to two
    /// non-crossing rectangles and the results unioned. Returns a GeoJSON
    /// `FeatureCollection` of Point features carrying only name and
    /// length -- the minimal attributes `find_within` promises.
    pub fn find_within(&self, sw: Point, ne: Point) -> serde_json::Value {
        let mut mmsis: Vec<u32> = split_antimeridian(sw, ne)
            .into_iter()
            .flat_map(|rect: Rectangle| self.index.read().unwrap().find_within(rect))
            .collect();
        mmsis.sort_unstable();
        mmsis.dedup();

        let records = self.records.read().unwrap();
        let features: Vec<serde_json::Value> = mmsis
            .into_iter()
            .filter_map(|mmsi| {
                let record = records.get(&mmsi)?.read().unwrap();
                let position = record.position.as_ref()?;
                Some(serde_json::json!({
                    "type": "Feature",
                    "geometry": {
                        "type": "Point",
                        "coordinates": [position.point.lon, position.point.lat],
                    },
                    "properties": {
                        "mmsi": mmsi,
                        "name": record.static_info.name,
                        "length": record.static_info.length(),
                    },
                }))
            })
            .collect();

        serde_json::json!({
            "type": "FeatureCollection",
            "features": features,
        })
    }
}

/// Serializes an enum by its `Debug` name; used for navigation status and
/// ship type, whose GeoJSON representation the decoder layer doesn't fix.
struct DebugName<T>(T);

impl<T: std::fmt::Debug> Serialize for DebugName<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&format!("{:?}", self.0))
    }
}
