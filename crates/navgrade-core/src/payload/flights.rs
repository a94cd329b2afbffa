//! Flight-search payloads.
//!
//! A search results URL carries the whole query in its `tfs` parameter: a
//! base64url-encoded protobuf `Info` message.
//!
//! ```text
//! Info       { repeated FlightData data = 3; repeated Passenger passengers = 8;
//!              Seat seat = 9; Trip trip = 19; }
//! FlightData { string date = 2; optional int32 max_stops = 5;
//!              repeated string airlines = 6;
//!              Airport from_flight = 13; Airport to_flight = 14; }
//! Airport    { string airport = 2; }
//! ```
//!
//! Fields outside this layout are skipped, so two queries compare equal as
//! long as every known field agrees.

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use super::wire::{read_packed_varints, WireReader, WireValue};
use crate::canonical::{parse_query, raw_query};
use crate::domain::error::{DecodeError, GradeError, Result};

macro_rules! proto_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident = $num:literal => $label:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
        pub enum $name {
            #[default]
            Unspecified,
            $($variant,)+
            /// A value outside the known range, kept for exact comparison.
            Unknown(i32),
        }

        impl $name {
            pub fn from_i32(v: i32) -> Self {
                match v {
                    0 => Self::Unspecified,
                    $($num => Self::$variant,)+
                    other => Self::Unknown(other),
                }
            }

            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $($label => Some(Self::$variant),)+
                    _ => None,
                }
            }

            pub fn name(&self) -> String {
                match self {
                    Self::Unspecified => "UNSPECIFIED".to_string(),
                    $(Self::$variant => $label.to_string(),)+
                    Self::Unknown(v) => format!("UNKNOWN({v})"),
                }
            }
        }

        impl Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
                s.serialize_str(&self.name())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
                let name = String::deserialize(d)?;
                Self::from_name(&name).ok_or_else(|| {
                    serde::de::Error::custom(format!(
                        concat!("unknown ", stringify!($name), " {:?}"),
                        name
                    ))
                })
            }
        }
    };
}

proto_enum!(
    /// Cabin class.
    Seat {
        Economy = 1 => "ECONOMY",
        PremiumEconomy = 2 => "PREMIUM_ECONOMY",
        Business = 3 => "BUSINESS",
        First = 4 => "FIRST",
    }
);

proto_enum!(
    Trip {
        RoundTrip = 1 => "ROUND_TRIP",
        OneWay = 2 => "ONE_WAY",
        MultiCity = 3 => "MULTI_CITY",
    }
);

proto_enum!(
    /// One traveller.
    Passenger {
        Adult = 1 => "ADULT",
        Child = 2 => "CHILD",
        InfantInSeat = 3 => "INFANT_IN_SEAT",
        InfantOnLap = 4 => "INFANT_ON_LAP",
    }
);

/// One leg of the search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FlightSegment {
    pub date: String,
    pub max_stops: Option<i32>,
    pub airlines: Vec<String>,
    /// `Some("")` means the airport message is present but empty.
    pub from_airport: Option<String>,
    pub to_airport: Option<String>,
}

/// A decoded (or ground-truth) flight search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FlightQuery {
    pub segments: Vec<FlightSegment>,
    pub passengers: Vec<Passenger>,
    pub seat: Seat,
    pub trip: Trip,
}

/// Ground truth as written in task configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightInfoSpec {
    pub segments: Vec<SegmentSpec>,
    pub passengers: Vec<Passenger>,
    pub seat: Seat,
    pub trip: Trip,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentSpec {
    pub from: String,
    pub to: String,
    /// `YYYY-MM-DD`.
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_stops: Option<i32>,
}

impl FlightInfoSpec {
    /// Build the record a matching search page would decode to.
    pub fn to_query(&self) -> Result<FlightQuery> {
        if self.segments.is_empty() {
            return Err(GradeError::config("flight info has no segments"));
        }
        Ok(FlightQuery {
            segments: self
                .segments
                .iter()
                .map(|s| FlightSegment {
                    date: s.date.clone(),
                    max_stops: s.max_stops,
                    airlines: Vec::new(),
                    from_airport: Some(s.from.clone()),
                    to_airport: Some(s.to.clone()),
                })
                .collect(),
            passengers: self.passengers.clone(),
            seat: self.seat,
            trip: self.trip,
        })
    }
}

/// Decode the search encoded in a results-page URL.
pub fn decode_search_url(url: &str) -> std::result::Result<FlightQuery, DecodeError> {
    if !url.contains("/flights/search") {
        return Err(DecodeError::NotSearchPage);
    }
    let params = parse_query(raw_query(url));
    let tfs = params
        .get("tfs")
        .and_then(|v| v.first())
        .ok_or_else(|| DecodeError::MissingParam("tfs".to_string()))?;
    decode_tfs(tfs)
}

/// Decode a raw `tfs` value (base64url, padding optional).
pub fn decode_tfs(tfs: &str) -> std::result::Result<FlightQuery, DecodeError> {
    let mut padded = tfs.trim().to_string();
    while padded.len() % 4 != 0 {
        padded.push('=');
    }
    let bytes = URL_SAFE
        .decode(padded.as_bytes())
        .map_err(|e| DecodeError::Base64(e.to_string()))?;
    decode_info(&bytes)
}

fn decode_info(buf: &[u8]) -> std::result::Result<FlightQuery, DecodeError> {
    let mut query = FlightQuery::default();
    for field in WireReader::new(buf) {
        let field = field?;
        match (field.number, field.value) {
            (3, WireValue::Bytes(b)) => query.segments.push(decode_segment(b)?),
            (8, WireValue::Varint(v)) => query.passengers.push(Passenger::from_i32(v as i32)),
            (8, WireValue::Bytes(b)) => query.passengers.extend(
                read_packed_varints(b)?
                    .into_iter()
                    .map(|v| Passenger::from_i32(v as i32)),
            ),
            (9, WireValue::Varint(v)) => query.seat = Seat::from_i32(v as i32),
            (19, WireValue::Varint(v)) => query.trip = Trip::from_i32(v as i32),
            (3 | 8 | 9 | 19, _) => return Err(field.unexpected()),
            _ => {}
        }
    }
    Ok(query)
}

fn decode_segment(buf: &[u8]) -> std::result::Result<FlightSegment, DecodeError> {
    let mut segment = FlightSegment::default();
    for field in WireReader::new(buf) {
        let field = field?;
        match (field.number, field.value) {
            (2, WireValue::Bytes(_)) => {
                segment.date = field.as_str()?.unwrap_or_default().to_string();
            }
            (5, WireValue::Varint(v)) => segment.max_stops = Some(v as i32),
            (6, WireValue::Bytes(_)) => {
                segment
                    .airlines
                    .push(field.as_str()?.unwrap_or_default().to_string());
            }
            (13, WireValue::Bytes(b)) => segment.from_airport = Some(decode_airport(b)?),
            (14, WireValue::Bytes(b)) => segment.to_airport = Some(decode_airport(b)?),
            (2 | 5 | 6 | 13 | 14, _) => return Err(field.unexpected()),
            _ => {}
        }
    }
    Ok(segment)
}

fn decode_airport(buf: &[u8]) -> std::result::Result<String, DecodeError> {
    let mut airport = String::new();
    for field in WireReader::new(buf) {
        let field = field?;
        if field.number == 2 {
            match field.as_str()? {
                Some(s) => airport = s.to_string(),
                None => return Err(field.unexpected()),
            }
        }
    }
    Ok(airport)
}
