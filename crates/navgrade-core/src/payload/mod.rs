//! Decoding of opaque query payloads into comparable records.
//!
//! A payload that fails to decode is reported as a [`DecodeError`]; callers
//! discard that single observation and carry on.
//!
//! [`DecodeError`]: crate::domain::error::DecodeError

pub mod flights;
pub mod wire;

pub use flights::{
    decode_search_url, decode_tfs, FlightInfoSpec, FlightQuery, FlightSegment, Passenger, Seat,
    SegmentSpec, Trip,
};
