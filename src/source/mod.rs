//! The source side of the relay (§4.5/§4.6): one connector task per
//! configured upstream feed, all funneling into a single [`merger::Merger`].

pub mod connector;
pub mod merger;

use std::sync::Arc;

use chrono::Duration as ChronoDuration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::SourceSpec;
use crate::dedup::DuplicateFilter;
use crate::forwarder;
use crate::vessel::VesselStore;

pub use merger::{Counters, Merger};

/// Bounded capacity of the channel every connector feeds and the merger
/// drains (§5: backpressure propagates from the forwarder, through the
/// merger, to this queue, and ultimately to each source's own read loop).
pub const MERGE_QUEUE_CAP: usize = 200;

/// Everything running on behalf of a set of configured sources.
pub struct Sources {
    /// One handle per `--source`, in the order given, resolving once that
    /// connector will never produce anything else.
    pub connectors: Vec<JoinHandle<connector::Ended>>,
    /// Resolves once every connector has finished and the merge queue has
    /// drained.
    pub drain: JoinHandle<()>,
    pub counters: Arc<Counters>,
}

/// Spawns one connector task per `sources` plus a task draining them all
/// into a fresh [`Merger`]. A file source hitting EOF is not by itself
/// fatal to the process; §4.5 leaves that decision to the binary, which
/// can inspect `connectors` to see which ones are still alive.
pub fn spawn_all(
    sources: Vec<SourceSpec>,
    max_message_timespan: ChronoDuration,
    dedup: Arc<DuplicateFilter>,
    forwarder: forwarder::Handle,
    vessels: Arc<VesselStore>,
) -> Sources {
    let merger = Arc::new(Merger::new(dedup, forwarder, vessels));
    let counters = Arc::clone(&merger.counters);
    let (tx, mut rx) = mpsc::channel(MERGE_QUEUE_CAP);

    let connectors = sources
        .into_iter()
        .map(|spec| {
            let tx = tx.clone();
            tokio::spawn(connector::run(spec, max_message_timespan, tx))
        })
        .collect();
    drop(tx);

    let drain = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            merger.accept(message).await;
        }
    });

    Sources { connectors, drain, counters }
}
