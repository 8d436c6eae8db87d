//! # Encoded Polylines
//!
//! Codec for the compact encoded-polyline format returned by directions APIs.
//!
//! Each coordinate is rounded to 1e-5 degrees, delta-encoded against the
//! previous point (latitude first, then longitude), zig-zag folded into an
//! unsigned value, and emitted as 5-bit chunks offset into printable ASCII
//! (`'?'` to `'~'`), least significant chunk first with `0x20` as the
//! continuation bit.
//!
//! ## Example
//!
//! ```rust
//! use route_matrix::{GpsPoint, polyline};
//!
//! let points = vec![
//!     GpsPoint::new(38.5, -120.2),
//!     GpsPoint::new(40.7, -120.95),
//!     GpsPoint::new(43.252, -126.453),
//! ];
//!
//! let encoded = polyline::encode(&points);
//! assert_eq!(encoded, "_p~iF~ps|U_ulLnnqC_mqNvxq`@");
//!
//! let decoded = polyline::decode(&encoded).unwrap();
//! assert_eq!(decoded.len(), 3);
//! ```

use crate::{Error, GpsPoint, Result};

const PRECISION: f64 = 1e5;
const CHUNK_BITS: u32 = 5;
const CONTINUATION: u64 = 0x20;
const CHUNK_MASK: u64 = 0x1f;
const ASCII_OFFSET: u8 = 63;

/// Encode points into a polyline string.
pub fn encode(points: &[GpsPoint]) -> String {
    let mut out = String::with_capacity(points.len() * 8);
    let (mut prev_lat, mut prev_lng) = (0i64, 0i64);

    for point in points {
        let lat = (point.latitude * PRECISION).round() as i64;
        let lng = (point.longitude * PRECISION).round() as i64;
        encode_value(lat - prev_lat, &mut out);
        encode_value(lng - prev_lng, &mut out);
        prev_lat = lat;
        prev_lng = lng;
    }

    out
}

fn encode_value(delta: i64, out: &mut String) {
    let mut value = if delta < 0 {
        !((delta as u64) << 1)
    } else {
        (delta as u64) << 1
    };

    while value >= CONTINUATION {
        out.push(((CONTINUATION | (value & CHUNK_MASK)) as u8 + ASCII_OFFSET) as char);
        value >>= CHUNK_BITS;
    }
    out.push((value as u8 + ASCII_OFFSET) as char);
}

/// Decode a polyline string into points.
///
/// Fails with [`Error::PolylineDecode`] on characters outside the encoding
/// alphabet, a truncated value, a latitude without its longitude, or
/// deltas summing past the `i64` range.
pub fn decode(encoded: &str) -> Result<Vec<GpsPoint>> {
    let bytes = encoded.as_bytes();
    let mut points = Vec::with_capacity(bytes.len() / 4);
    let mut position = 0;
    let (mut lat, mut lng) = (0i64, 0i64);

    while position < bytes.len() {
        lat = accumulate(lat, bytes, &mut position)?;
        if position >= bytes.len() {
            return Err(Error::PolylineDecode {
                position,
                reason: "latitude without longitude",
            });
        }
        lng = accumulate(lng, bytes, &mut position)?;

        points.push(GpsPoint::new(lat as f64 / PRECISION, lng as f64 / PRECISION));
    }

    Ok(points)
}

/// Add the next delta to a running coordinate.
fn accumulate(current: i64, bytes: &[u8], position: &mut usize) -> Result<i64> {
    let start = *position;
    let delta = decode_value(bytes, position)?;
    current.checked_add(delta).ok_or(Error::PolylineDecode {
        position: start,
        reason: "coordinate overflows",
    })
}

fn decode_value(bytes: &[u8], position: &mut usize) -> Result<i64> {
    let mut result: u64 = 0;
    let mut shift = 0u32;

    loop {
        let Some(&byte) = bytes.get(*position) else {
            return Err(Error::PolylineDecode {
                position: *position,
                reason: "truncated value",
            });
        };
        if !(ASCII_OFFSET..=b'~').contains(&byte) {
            return Err(Error::PolylineDecode {
                position: *position,
                reason: "character outside encoding range",
            });
        }
        if shift > 60 {
            return Err(Error::PolylineDecode {
                position: *position,
                reason: "value overflows 64 bits",
            });
        }

        let chunk = (byte - ASCII_OFFSET) as u64;
        result |= (chunk & CHUNK_MASK) << shift;
        shift += CHUNK_BITS;
        *position += 1;

        if chunk < CONTINUATION {
            break;
        }
    }

    let value = if result & 1 == 1 {
        !(result >> 1) as i64
    } else {
        (result >> 1) as i64
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn reference_points() -> Vec<GpsPoint> {
        vec![
            GpsPoint::new(38.5, -120.2),
            GpsPoint::new(40.7, -120.95),
            GpsPoint::new(43.252, -126.453),
        ]
    }

    #[test]
    fn test_encode_reference_polyline() {
        assert_eq!(encode(&reference_points()), "_p~iF~ps|U_ulLnnqC_mqNvxq`@");
    }

    #[test]
    fn test_decode_reference_polyline() {
        let decoded = decode("_p~iF~ps|U_ulLnnqC_mqNvxq`@").unwrap();
        let expected = reference_points();
        assert_eq!(decoded.len(), expected.len());
        for (got, want) in decoded.iter().zip(&expected) {
            assert!(approx_eq(got.latitude, want.latitude), "{:?} vs {:?}", got, want);
            assert!(approx_eq(got.longitude, want.longitude), "{:?} vs {:?}", got, want);
        }
    }

    #[test]
    fn test_empty_polyline() {
        assert_eq!(encode(&[]), "");
        assert!(decode("").unwrap().is_empty());
    }

    #[test]
    fn test_encode_rounds_to_five_decimals() {
        let points = vec![GpsPoint::new(4.8758361, -74.028297), GpsPoint::new(4.8728424, -74.0469651)];
        let decoded = decode(&encode(&points)).unwrap();
        assert!(approx_eq(decoded[0].latitude, 4.87584));
        assert!(approx_eq(decoded[0].longitude, -74.0283));
        assert!(approx_eq(decoded[1].latitude, 4.87284));
        assert!(approx_eq(decoded[1].longitude, -74.04697));
    }

    #[test]
    fn test_decode_rejects_invalid_character() {
        let err = decode("_p~iF ~ps|U").unwrap_err();
        assert!(matches!(err, Error::PolylineDecode { position: 5, .. }), "{:?}", err);
    }

    #[test]
    fn test_decode_rejects_truncated_value() {
        // '_' carries the continuation bit, so the value never terminates.
        let err = decode("_p~iF~ps|U_").unwrap_err();
        assert!(matches!(err, Error::PolylineDecode { reason: "truncated value", .. }), "{:?}", err);
    }

    #[test]
    fn test_decode_rejects_coordinate_overflow() {
        let mut encoded = String::new();
        for delta in [1i64 << 62, 0, 1i64 << 62, 0] {
            encode_value(delta, &mut encoded);
        }
        let second_latitude = encoded.len() / 2;

        let err = decode(&encoded).unwrap_err();
        match err {
            Error::PolylineDecode { position, reason } => {
                assert_eq!(reason, "coordinate overflows");
                assert_eq!(position, second_latitude);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_decode_rejects_missing_longitude() {
        let err = decode("_p~iF").unwrap_err();
        assert!(
            matches!(err, Error::PolylineDecode { reason: "latitude without longitude", .. }),
            "{:?}",
            err
        );
    }
}
