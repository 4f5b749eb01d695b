//! Google's `uule` location parameter.
//!
//! A `uule` tells Google to serve results as if the search came from a precise coordinate. The
//! value is the letter `a`, a separator, and the base64 encoding of a plain text location
//! descriptor.

use crate::geo::LatLng;
use base64::prelude::*;
use chrono::{DateTime, Utc};

/// Encode a location as a `uule` value.
///
/// The result is the raw parameter value; URL encoding turns the leading separator into the `+`
/// Google expects.
pub fn encode(location: LatLng, timestamp: DateTime<Utc>) -> String {
    let descriptor = format!(
        "role:1\nproducer:12\nprovenance:6\ntimestamp:{}\nlatlng{{\nlatitude_e7:{}\nlongitude_e7:{}\n}}\nradius:-1",
        timestamp.timestamp_micros(),
        e7(location.lat),
        e7(location.lng),
    );
    format!("a {}", BASE64_STANDARD.encode(descriptor))
}

fn e7(degrees: f64) -> i64 {
    (degrees * 1e7).round() as i64
}
