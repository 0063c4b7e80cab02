//! The source merger (§4.6): the single funnel every per-source assembler
//! feeds into. For each [`Message`] it consults the [`DuplicateFilter`],
//! then pushes the raw bytes to the forwarder and the decoded report (when
//! one of the vessel-store-relevant types) into the [`VesselStore`].
//!
//! Per-type counters back the periodic reporter; they're partitioned 0-27
//! with 0 standing in for "unknown/unimplemented/decode error", matching
//! the component design's "Counters are partitioned by AIS type" note.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::dedup::DuplicateFilter;
use crate::forwarder;
use crate::ingest::Message;
use crate::messages::navigation::Accuracy;
use crate::messages::static_data_report::MessagePart;
use crate::messages::{self, AisMessage};
use crate::spatial::Point;
use crate::vessel::{DynamicPosition, Eta, StaticInfo, VesselStore};

/// AIS message types run 0-27; slot 0 doubles as "unknown or undecodable".
pub const TYPE_COUNT: usize = 28;

#[derive(Debug)]
pub struct Counters {
    pub seen: [AtomicU64; TYPE_COUNT],
    pub duplicates: [AtomicU64; TYPE_COUNT],
    pub forwarded: AtomicU64,
    pub decode_errors: AtomicU64,
}

impl Default for Counters {
    fn default() -> Self {
        Self::new()
    }
}

impl Counters {
    pub fn new() -> Self {
        Self {
            seen: std::array::from_fn(|_| AtomicU64::new(0)),
            duplicates: std::array::from_fn(|_| AtomicU64::new(0)),
            forwarded: AtomicU64::new(0),
            decode_errors: AtomicU64::new(0),
        }
    }

    fn bump(counters: &[AtomicU64; TYPE_COUNT], type_byte: Option<u8>) {
        let idx = match type_byte {
            Some(t) if (t as usize) < TYPE_COUNT => t as usize,
            _ => 0,
        };
        counters[idx].fetch_add(1, Ordering::Relaxed);
    }
}

/// Funnels messages from every source connector into the forwarder and
/// vessel store, applying deduplication first.
pub struct Merger {
    dedup: Arc<DuplicateFilter>,
    forwarder: forwarder::Handle,
    vessels: Arc<VesselStore>,
    pub counters: Arc<Counters>,
}

impl Merger {
    pub fn new(dedup: Arc<DuplicateFilter>, forwarder: forwarder::Handle, vessels: Arc<VesselStore>) -> Self {
        Self {
            dedup,
            forwarder,
            vessels,
            counters: Arc::new(Counters::new()),
        }
    }

    /// Applies one assembled message: dedup, broadcast, vessel-store
    /// update, in that order. Blocks (applying upstream backpressure, per
    /// §5) if the forwarder's input queue is full; never blocks on a
    /// subscriber, since the forwarder itself never does.
    pub async fn accept(&self, message: Message) {
        let type_byte = message.type_byte();
        Counters::bump(&self.counters.seen, type_byte);

        if self.dedup.is_duplicate(&message) {
            Counters::bump(&self.counters.duplicates, type_byte);
            return;
        }

        self.counters.forwarded.fetch_add(1, Ordering::Relaxed);
        let _ = self.forwarder.broadcast(Bytes::from(message.raw_text())).await;
        self.update_vessel_store(&message);
    }

    /// Decodes the message's armored payload and, for the types this repo
    /// has decided feed the vessel store (1/2/3/5/18/24 -- see DESIGN.md),
    /// applies it. Any other type, or a decode failure, is silently a
    /// no-op here: the decoder is a black box and its errors already
    /// incremented nothing the spec asks this layer to count beyond
    /// `decode_errors`.
    fn update_vessel_store(&self, message: &Message) {
        let Some(last) = message.sentences.last() else { return };
        let padding = last.padding;
        let armored = message.armored_payload();
        let unarmored = match messages::unarmor(&armored, padding as usize) {
            Ok(bits) => bits,
            Err(_) => {
                self.counters.decode_errors.fetch_add(1, Ordering::Relaxed);
                return;
            }
        };
        let decoded = match messages::parse(&unarmored) {
            Ok(decoded) => decoded,
            Err(_) => {
                self.counters.decode_errors.fetch_add(1, Ordering::Relaxed);
                return;
            }
        };
        apply_decoded(&self.vessels, decoded, message.ended);
    }
}

fn apply_decoded(vessels: &VesselStore, decoded: AisMessage, received_at: DateTime<Utc>) {
    match decoded {
        AisMessage::PositionReport(report) => {
            if let (Some(lat), Some(lon)) = (report.latitude, report.longitude) {
                let point = Point::new(lat as f64, lon as f64);
                let dynamic = DynamicPosition {
                    point,
                    accuracy_augmented: matches!(report.position_accuracy, Accuracy::DGPS),
                    navigation_status: report.navigation_status,
                    true_heading: report.true_heading,
                    course_over_ground: report.course_over_ground,
                    speed_over_ground: report.speed_over_ground,
                    rate_of_turn: report.rate_of_turn.and_then(|r| r.rate()),
                    updated_at: received_at,
                };
                vessels.update_dynamic(report.mmsi, point, received_at, dynamic);
            }
        }
        AisMessage::StandardClassBPositionReport(report) => {
            if let (Some(lat), Some(lon)) = (report.latitude, report.longitude) {
                let point = Point::new(lat as f64, lon as f64);
                let dynamic = DynamicPosition {
                    point,
                    accuracy_augmented: matches!(report.position_accuracy, Accuracy::DGPS),
                    navigation_status: None,
                    true_heading: report.true_heading,
                    course_over_ground: report.course_over_ground,
                    speed_over_ground: report.speed_over_ground,
                    rate_of_turn: None,
                    updated_at: received_at,
                };
                vessels.update_dynamic(report.mmsi, point, received_at, dynamic);
            }
        }
        AisMessage::StaticAndVoyageRelatedData(report) => {
            let eta = Some(Eta {
                month: report.eta_month_utc,
                day: report.eta_day_utc,
                hour: report.eta_hour_utc,
                minute: report.eta_minute_utc,
            });
            let info = StaticInfo {
                ship_type: report.ship_type,
                draught: Some(report.draught),
                dimension_to_bow: Some(report.dimension_to_bow),
                dimension_to_stern: Some(report.dimension_to_stern),
                dimension_to_port: Some(report.dimension_to_port),
                dimension_to_starboard: Some(report.dimension_to_starboard),
                callsign: non_empty(report.callsign),
                name: non_empty(report.vessel_name),
                destination: non_empty(report.destination),
                eta,
            };
            vessels.update_static(report.mmsi, info);
        }
        AisMessage::StaticDataReport(report) => {
            let mmsi = report.mmsi;
            let info = match report.message_part {
                MessagePart::PartA { vessel_name } => StaticInfo {
                    name: non_empty(vessel_name),
                    ..Default::default()
                },
                MessagePart::PartB {
                    ship_type,
                    callsign,
                    dimension_to_bow,
                    dimension_to_stern,
                    dimension_to_port,
                    dimension_to_starboard,
                    ..
                } => StaticInfo {
                    ship_type,
                    callsign: non_empty(callsign),
                    dimension_to_bow: Some(dimension_to_bow),
                    dimension_to_stern: Some(dimension_to_stern),
                    dimension_to_port: Some(dimension_to_port),
                    dimension_to_starboard: Some(dimension_to_starboard),
                    ..Default::default()
                },
                MessagePart::Unknown(_) => return,
            };
            vessels.update_static(mmsi, info);
        }
        // All other decodable types (4, 6-17, 19-21, 23, 27) are available
        // to library callers through `messages::parse` but, per this
        // repo's decision on the spec's open question, don't mutate the
        // vessel store.
        _ => {}
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::sentence;
    use chrono::Utc;

    fn message_from(text: &[u8]) -> Message {
        let sentence = sentence::parse(text.to_vec(), Utc::now()).unwrap();
        Message {
            source: "test".into(),
            sentences: vec![sentence],
            started: Utc::now(),
            ended: Utc::now(),
        }
    }

    #[tokio::test]
    async fn accept_forwards_and_updates_vessel_store() {
        let (handle, actor) = forwarder::spawn();
        tokio::spawn(actor);
        let vessels = Arc::new(VesselStore::new());
        let merger = Merger::new(Arc::new(DuplicateFilter::new()), handle.clone(), Arc::clone(&vessels));

        let sub = handle.subscribe().await.unwrap();
        let msg = message_from(b"!AIVDM,1,1,,A,13u?etPv2;0n:dDPwUM1U1Cb069D,0*01\r\n");
        merger.accept(msg).await;

        assert_eq!(merger.counters.forwarded.load(Ordering::Relaxed), 1);
        assert!(vessels.coords(265547250).is_some());
        drop(sub);
    }

    #[tokio::test]
    async fn duplicate_message_is_counted_but_not_forwarded_twice() {
        let (handle, actor) = forwarder::spawn();
        tokio::spawn(actor);
        let vessels = Arc::new(VesselStore::new());
        let merger = Merger::new(Arc::new(DuplicateFilter::new()), handle, Arc::clone(&vessels));

        let msg = message_from(b"!AIVDM,1,1,,A,13u?etPv2;0n:dDPwUM1U1Cb069D,0*01\r\n");
        merger.accept(msg.clone()).await;
        merger.accept(msg).await;

        assert_eq!(merger.counters.forwarded.load(Ordering::Relaxed), 1);
        assert_eq!(merger.counters.duplicates[1].load(Ordering::Relaxed), 1);
    }
}
