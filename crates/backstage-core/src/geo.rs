//! Geographic points and great-circle distance.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Mean Earth radius in metres (IUGG).
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// A WGS-84 position. Serialised as a GeoJSON point:
/// `{"type": "Point", "coordinates": [lng, lat]}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "GeoJsonPoint", into = "GeoJsonPoint")]
pub struct GeoPoint {
  pub lng: f64,
  pub lat: f64,
}

impl GeoPoint {
  /// Build a point, rejecting out-of-range coordinates.
  pub fn new(lng: f64, lat: f64) -> Result<Self> {
    if !(-180.0..=180.0).contains(&lng) || !(-90.0..=90.0).contains(&lat) {
      return Err(Error::validation(format!(
        "invalid coordinates [{lng}, {lat}]: expected lng in [-180, 180] and \
         lat in [-90, 90]"
      )));
    }
    Ok(Self { lng, lat })
  }

  /// Haversine distance to `other`, in metres.
  pub fn distance_m(&self, other: &GeoPoint) -> f64 {
    let (lat1, lat2) = (self.lat.to_radians(), other.lat.to_radians());
    let d_lat = lat2 - lat1;
    let d_lng = (other.lng - self.lng).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
      + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().min(1.0).asin()
  }
}

#[derive(Serialize, Deserialize)]
struct GeoJsonPoint {
  #[serde(rename = "type", default = "point_type")]
  kind:        String,
  coordinates: [f64; 2],
}

fn point_type() -> String { "Point".to_owned() }

impl TryFrom<GeoJsonPoint> for GeoPoint {
  type Error = Error;

  fn try_from(raw: GeoJsonPoint) -> Result<Self> {
    if raw.kind != "Point" {
      return Err(Error::validation(format!(
        "unsupported geometry type {:?}; only \"Point\" is accepted",
        raw.kind
      )));
    }
    let [lng, lat] = raw.coordinates;
    GeoPoint::new(lng, lat)
  }
}

impl From<GeoPoint> for GeoJsonPoint {
  fn from(p: GeoPoint) -> Self {
    Self { kind: point_type(), coordinates: [p.lng, p.lat] }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn geojson_shape() {
    let p = GeoPoint::new(-46.6388, -23.5489).unwrap();
    let json = serde_json::to_value(p).unwrap();
    assert_eq!(
      json,
      serde_json::json!({ "type": "Point", "coordinates": [-46.6388, -23.5489] })
    );
  }

  #[test]
  fn rejects_out_of_range_coordinates() {
    let bad = serde_json::json!({ "type": "Point", "coordinates": [10.0, 95.0] });
    assert!(serde_json::from_value::<GeoPoint>(bad).is_err());
    assert!(GeoPoint::new(181.0, 0.0).is_err());
  }

  #[test]
  fn rejects_other_geometry_types() {
    let bad = serde_json::json!({ "type": "LineString", "coordinates": [1.0, 2.0] });
    assert!(serde_json::from_value::<GeoPoint>(bad).is_err());
  }

  #[test]
  fn distance_between_known_points() {
    // Theatro Municipal (SP) to Teatro Municipal (RJ): roughly 360 km.
    let sp = GeoPoint::new(-46.6388, -23.5452).unwrap();
    let rj = GeoPoint::new(-43.1766, -22.9090).unwrap();
    let d = sp.distance_m(&rj);
    assert!((350_000.0..370_000.0).contains(&d), "distance was {d}");
    assert_eq!(sp.distance_m(&sp), 0.0);
  }
}
