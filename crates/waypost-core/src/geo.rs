use crate::errors::{Error, Result};
use ::geo::{point, GeodesicDistance};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

pub const DEFAULT_RADIUS_KM: f64 = 50.0;

// Literal "lat,lon" pairs only; free-form addresses are never geocoded.
static LAT_LON_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([+-]?[0-9]*\.?[0-9]+)\s*,\s*([+-]?[0-9]*\.?[0-9]+)\s*$").unwrap()
});

/// A WGS84 (SRID 4326) coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    pub fn new(lat: f64, lon: f64) -> Result<Self> {
        if !lat.is_finite() || !lon.is_finite() {
            return Err(Error::InvalidLocation(
                "latitude and longitude must be finite".into(),
            ));
        }
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return Err(Error::InvalidLocation(format!(
                "lat or lon out of range: {lat},{lon}"
            )));
        }
        Ok(Self { lat, lon })
    }

    /// Parses a literal `"lat,lon"` string, whitespace-tolerant around the
    /// comma and ends. Anything else fails with `InvalidLocation`.
    pub fn parse(input: &str) -> Result<Self> {
        let caps = LAT_LON_RE
            .captures(input)
            .ok_or_else(|| Error::InvalidLocation(format!("must be 'lat,lon': {input:?}")))?;
        let lat: f64 = caps[1]
            .parse()
            .map_err(|_| Error::InvalidLocation(format!("bad latitude: {}", &caps[1])))?;
        let lon: f64 = caps[2]
            .parse()
            .map_err(|_| Error::InvalidLocation(format!("bad longitude: {}", &caps[2])))?;
        Self::new(lat, lon)
    }

    /// Canonical 6-decimal fixed-point rendering, so identical inputs always
    /// store byte-identical strings.
    pub fn normalized(&self) -> String {
        format!("{:.6},{:.6}", self.lat, self.lon)
    }

    /// Geodesic distance in kilometers on the WGS84 ellipsoid.
    pub fn distance_km(&self, other: &LatLon) -> f64 {
        let a = point!(x: self.lon, y: self.lat);
        let b = point!(x: other.lon, y: other.lat);
        a.geodesic_distance(&b) / 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_normalizes_idempotently() {
        let a = LatLon::parse("12.3,45.6").unwrap();
        let b = LatLon::parse("  12.300000 , 45.600000  ").unwrap();
        assert_eq!(a.normalized(), "12.300000,45.600000");
        assert_eq!(a.normalized(), b.normalized());
    }

    #[test]
    fn parse_accepts_signs_and_bare_fractions() {
        let p = LatLon::parse("-.5,+.25").unwrap();
        assert_eq!(p.normalized(), "-0.500000,0.250000");
    }

    #[test]
    fn rejects_out_of_range() {
        assert!(LatLon::parse("91,0").is_err());
        assert!(LatLon::parse("-90.5,10").is_err());
        assert!(LatLon::parse("0,181").is_err());
        assert!(LatLon::parse("0,-180.0001").is_err());
        // poles and the antimeridian are legal
        assert!(LatLon::parse("90,180").is_ok());
        assert!(LatLon::parse("-90,-180").is_ok());
    }

    #[test]
    fn rejects_non_coordinate_strings() {
        for input in ["", "london", "1;2", "1,2,3", "1e3,4", "nan,4", "10,", ",10"] {
            assert!(LatLon::parse(input).is_err(), "accepted {input:?}");
        }
    }

    #[test]
    fn distance_is_zero_at_origin() {
        let p = LatLon::parse("48.8566,2.3522").unwrap();
        assert!(p.distance_km(&p) < 1e-9);
    }

    #[test]
    fn distance_paris_london_is_plausible() {
        let paris = LatLon::parse("48.8566,2.3522").unwrap();
        let london = LatLon::parse("51.5074,-0.1278").unwrap();
        let d = paris.distance_km(&london);
        assert!((330.0..360.0).contains(&d), "got {d}");
    }
}
