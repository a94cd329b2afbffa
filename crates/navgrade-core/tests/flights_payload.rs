use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use navgrade_core::adapters::flights;
use navgrade_core::payload::{decode_search_url, FlightInfoSpec, Passenger, Seat, Trip};
use navgrade_core::{DecodeError, MetricContract, StepInputs};
use serde_json::json;

fn varint(mut v: u64, out: &mut Vec<u8>) {
    loop {
        let byte = (v & 0x7f) as u8;
        v >>= 7;
        if v == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

fn varint_field(field: u32, v: u64, out: &mut Vec<u8>) {
    varint(u64::from(field) << 3, out);
    varint(v, out);
}

fn bytes_field(field: u32, bytes: &[u8], out: &mut Vec<u8>) {
    varint(u64::from(field) << 3 | 2, out);
    varint(bytes.len() as u64, out);
    out.extend_from_slice(bytes);
}

fn airport(code: &str) -> Vec<u8> {
    let mut out = Vec::new();
    bytes_field(2, code.as_bytes(), &mut out);
    out
}

/// A one-way search for two passengers, unpacked passenger encoding.
fn one_way_url(date: &str, from: &str, to: &str, seat: u64) -> String {
    let mut seg = Vec::new();
    bytes_field(2, date.as_bytes(), &mut seg);
    bytes_field(13, &airport(from), &mut seg);
    bytes_field(14, &airport(to), &mut seg);

    let mut info = Vec::new();
    bytes_field(3, &seg, &mut info);
    varint_field(8, 1, &mut info);
    varint_field(8, 2, &mut info);
    varint_field(9, seat, &mut info);
    varint_field(19, 2, &mut info);
    format!(
        "https://www.google.com/travel/flights/search?tfs={}&hl=en&curr=USD",
        URL_SAFE_NO_PAD.encode(info)
    )
}

fn outbound() -> FlightInfoSpec {
    serde_json::from_value(json!({
        "segments": [{"from": "JFK", "to": "LAX", "date": "2026-03-14"}],
        "passengers": ["ADULT", "CHILD"],
        "seat": "ECONOMY",
        "trip": "ONE_WAY"
    }))
    .expect("flight info")
}

#[test]
fn test_decode_one_way_search() {
    let query = decode_search_url(&one_way_url("2026-03-14", "JFK", "LAX", 1)).expect("decode");
    assert_eq!(query.segments.len(), 1);
    assert_eq!(query.segments[0].from_airport.as_deref(), Some("JFK"));
    assert_eq!(query.segments[0].max_stops, None);
    assert_eq!(query.passengers, vec![Passenger::Adult, Passenger::Child]);
    assert_eq!(query.seat, Seat::Economy);
    assert_eq!(query.trip, Trip::OneWay);
    assert_eq!(query, outbound().to_query().expect("query"));
}

#[test]
fn test_garbage_payload_is_a_decode_error() {
    let err = decode_search_url("https://www.google.com/travel/flights/search?tfs=%%%%")
        .expect_err("should fail");
    assert!(matches!(err, DecodeError::Base64(_)));

    // field 3, length 9, but only 2 bytes follow
    let truncated = URL_SAFE_NO_PAD.encode([0x1a, 0x09, 0x12, 0x00]);
    let err = decode_search_url(&format!(
        "https://www.google.com/travel/flights/search?tfs={truncated}"
    ))
    .expect_err("should fail");
    assert!(matches!(err, DecodeError::TruncatedField { .. }));
}

#[test]
fn test_mistyped_known_field_is_a_decode_error() {
    // trip (field 19) sent as a string instead of an enum varint
    let mut info = Vec::new();
    bytes_field(19, b"ONE_WAY", &mut info);
    let url = format!(
        "https://www.google.com/travel/flights/search?tfs={}",
        URL_SAFE_NO_PAD.encode(info)
    );
    assert_eq!(
        decode_search_url(&url),
        Err(DecodeError::UnsupportedWireType {
            field: 19,
            wire_type: 2
        })
    );
}

#[tokio::test]
async fn test_flights_evaluator_needs_every_search() {
    let return_leg: FlightInfoSpec = serde_json::from_value(json!({
        "segments": [{"from": "LAX", "to": "JFK", "date": "2026-03-20"}],
        "passengers": ["ADULT", "CHILD"],
        "seat": "ECONOMY",
        "trip": "ONE_WAY"
    }))
    .expect("flight info");
    let ev = flights::build(&[outbound(), return_leg]).expect("build");
    ev.reset();

    ev.update(StepInputs::url("https://www.google.com/travel/flights/search?tfs=!!"))
        .await;
    ev.update(StepInputs::url(&one_way_url("2026-03-14", "JFK", "LAX", 1)))
        .await;
    assert_eq!(ev.compute().score(), 0.0);
    assert_eq!(ev.compute().coverage_counts(), Some((1, 2)));

    // business class does not count
    ev.update(StepInputs::url(&one_way_url("2026-03-20", "LAX", "JFK", 3)))
        .await;
    assert_eq!(ev.compute().score(), 0.0);

    ev.update(StepInputs::url(&one_way_url("2026-03-20", "LAX", "JFK", 1)))
        .await;
    assert_eq!(ev.compute().score(), 1.0);
}
