//! Real-time AIS aggregation, deduplication and rebroadcast.
//!
//! Bytes arrive from one or more upstream feeds (`source`), get framed into
//! NMEA 0183 sentences (`ingest::framer`), parsed and checksummed
//! (`ingest::sentence`), reassembled across multi-part messages
//! (`ingest::assembler`), deduplicated (`dedup`) and then fanned out in two
//! directions at once: to subscribed clients over TCP/UDP/HTTP
//! (`forwarder`, `transport`) and into an in-memory spatial index of vessel
//! positions (`vessel`, `rtree`, `spatial`) that answers bounding-box and
//! per-vessel queries.
//!
//! The AIS payload decoder (`messages`) that turns an armored 6-bit payload
//! into a structured report is treated as a black box by everything above
//! it: the ingest pipeline and vessel store only need to know that it
//! returns a typed [`messages::AisMessage`] or an error.

/// Indirection so the rest of the crate can write `crate::lib::std::...`
/// regardless of whether the `std` or the `alloc`-only feature set is
/// active. Only the decoder (`messages`, `sentence`, `errors`) relies on
/// this; everything built for the relay itself assumes `std`.
#[doc(hidden)]
pub(crate) mod lib {
    #[cfg(feature = "std")]
    pub use ::std;

    #[cfg(all(not(feature = "std"), feature = "alloc"))]
    pub mod std {
        extern crate alloc;
        pub use alloc::{boxed, collections, format, string, vec};
        pub use core::*;
    }
}

pub mod errors;
pub mod messages;
pub mod sentence;

pub mod spatial;
pub mod rtree;
pub mod vessel;

pub mod ingest;
pub mod dedup;
pub mod forwarder;
pub mod transport;
pub mod source;
pub mod reporter;
pub mod config;

#[cfg(test)]
pub(crate) mod test_helpers;
