//! Location - Geolocation value object and great-circle math
//!
//! All functions here are pure. The only impurity is the random bearing used
//! by [`random_point_at_distance`], and that comes in through the
//! [`RandomSource`] port so callers decide how (and whether) to seed it.

use core::f64::consts::PI;

/// Mean Earth radius used by every calculation in this module
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Source of uniformly distributed numbers in `[0, 1)`
///
/// This is a PORT: the adapter layer backs it with a real RNG,
/// tests back it with a fixed sequence.
pub trait RandomSource {
    /// Next value in `[0, 1)`
    fn next_unit(&mut self) -> f64;
}

/// Compass hemisphere of a DMS coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hemisphere {
    North,
    South,
    East,
    West,
}

impl Hemisphere {
    /// Parse a hemisphere letter (`N`, `S`, `E`, `W`, case-insensitive)
    pub fn parse(letter: &str) -> Result<Self, GeoError> {
        match letter.trim().to_ascii_uppercase().as_str() {
            "N" => Ok(Hemisphere::North),
            "S" => Ok(Hemisphere::South),
            "E" => Ok(Hemisphere::East),
            "W" => Ok(Hemisphere::West),
            other => Err(GeoError::InvalidHemisphere {
                value: other.to_string(),
            }),
        }
    }

    /// South and West negate the magnitude
    pub fn is_negative(&self) -> bool {
        matches!(self, Hemisphere::South | Hemisphere::West)
    }

    fn is_latitude(&self) -> bool {
        matches!(self, Hemisphere::North | Hemisphere::South)
    }
}

/// Degrees / minutes / seconds with a hemisphere letter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dms {
    pub degrees: f64,
    pub minutes: f64,
    pub seconds: f64,
    pub hemisphere: Hemisphere,
}

impl Dms {
    pub fn new(degrees: f64, minutes: f64, seconds: f64, hemisphere: Hemisphere) -> Self {
        Self {
            degrees,
            minutes,
            seconds,
            hemisphere,
        }
    }

    /// Convert to signed decimal degrees
    pub fn to_decimal(&self) -> Result<f64, GeoError> {
        from_dms(self.degrees, self.minutes, self.seconds, self.hemisphere)
    }
}

/// Convert degrees/minutes/seconds to signed decimal degrees
pub fn from_dms(
    degrees: f64,
    minutes: f64,
    seconds: f64,
    hemisphere: Hemisphere,
) -> Result<f64, GeoError> {
    for (field, value) in [("degrees", degrees), ("minutes", minutes), ("seconds", seconds)] {
        if !value.is_finite() || value < 0.0 {
            return Err(GeoError::MalformedComponent {
                field,
                value: value.to_string(),
            });
        }
    }
    if minutes >= 60.0 || seconds >= 60.0 {
        return Err(GeoError::MalformedComponent {
            field: if minutes >= 60.0 { "minutes" } else { "seconds" },
            value: if minutes >= 60.0 { minutes } else { seconds }.to_string(),
        });
    }

    let magnitude = degrees + minutes / 60.0 + seconds / 3600.0;
    Ok(if hemisphere.is_negative() {
        -magnitude
    } else {
        magnitude
    })
}

/// A point on the globe in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Location {
    latitude: f64,
    longitude: f64,
}

impl Location {
    /// Create a location, rejecting non-finite or out-of-range coordinates
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, GeoError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(GeoError::OutOfRange {
                axis: "latitude",
                value: latitude.to_string(),
            });
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(GeoError::OutOfRange {
                axis: "longitude",
                value: longitude.to_string(),
            });
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Build a location from a latitude DMS and a longitude DMS
    pub fn from_dms(latitude: &Dms, longitude: &Dms) -> Result<Self, GeoError> {
        if !latitude.hemisphere.is_latitude() {
            return Err(GeoError::WrongAxis { axis: "latitude" });
        }
        if longitude.hemisphere.is_latitude() {
            return Err(GeoError::WrongAxis { axis: "longitude" });
        }
        Self::new(latitude.to_decimal()?, longitude.to_decimal()?)
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Great-circle distance to `other` in meters
    pub fn distance_to(&self, other: &Location) -> f64 {
        distance_meters(self, other)
    }

    /// Initial compass bearing to `other` in degrees
    pub fn bearing_to(&self, other: &Location) -> f64 {
        bearing_degrees(self, other)
    }
}

/// Haversine distance in meters
pub fn distance_meters(a: &Location, b: &Location) -> f64 {
    let phi1 = a.latitude.to_radians();
    let phi2 = b.latitude.to_radians();
    let d_phi = (b.latitude - a.latitude).to_radians();
    let d_lambda = (b.longitude - a.longitude).to_radians();

    let h = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let central = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * central * 1000.0
}

/// Initial bearing from `a` to `b`, normalized to `[0, 360)`
pub fn bearing_degrees(a: &Location, b: &Location) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let x = d_lon.sin() * lat2.cos();
    let y = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * d_lon.cos();

    let bearing = x.atan2(y).to_degrees().rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if bearing >= 360.0 {
        0.0
    } else {
        bearing
    }
}

/// Destination point at `distance_km` from `origin` along a random bearing
pub fn random_point_at_distance(
    origin: &Location,
    distance_km: f64,
    rng: &mut dyn RandomSource,
) -> Location {
    let bearing = rng.next_unit() * 2.0 * PI;
    destination_point(origin, distance_km, bearing)
}

/// Spherical direct formula; `bearing` in radians
fn destination_point(origin: &Location, distance_km: f64, bearing: f64) -> Location {
    let lat = origin.latitude.to_radians();
    let lon = origin.longitude.to_radians();
    let angular = distance_km / EARTH_RADIUS_KM;

    let new_lat = (lat.sin() * angular.cos() + lat.cos() * angular.sin() * bearing.cos()).asin();
    let new_lon = lon
        + (bearing.sin() * angular.sin() * lat.cos())
            .atan2(angular.cos() - lat.sin() * new_lat.sin());

    Location {
        latitude: new_lat.to_degrees(),
        longitude: (new_lon.to_degrees() + 540.0).rem_euclid(360.0) - 180.0,
    }
}

/// Errors raised by malformed coordinate input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeoError {
    InvalidHemisphere { value: String },
    MalformedComponent { field: &'static str, value: String },
    OutOfRange { axis: &'static str, value: String },
    WrongAxis { axis: &'static str },
}

impl core::fmt::Display for GeoError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            GeoError::InvalidHemisphere { value } => {
                write!(f, "Invalid hemisphere '{}', expected N, S, E or W", value)
            }
            GeoError::MalformedComponent { field, value } => {
                write!(f, "Malformed {} value: {}", field, value)
            }
            GeoError::OutOfRange { axis, value } => {
                write!(f, "{} out of range: {}", axis, value)
            }
            GeoError::WrongAxis { axis } => {
                write!(f, "Hemisphere does not match the {} axis", axis)
            }
        }
    }
}

impl std::error::Error for GeoError {}

#[cfg(test)]
mod tests {
    use super::*;

    /// Cycles through a fixed list of values
    struct Sequence {
        values: Vec<f64>,
        next: usize,
    }

    impl Sequence {
        fn new(values: Vec<f64>) -> Self {
            Self { values, next: 0 }
        }
    }

    impl RandomSource for Sequence {
        fn next_unit(&mut self) -> f64 {
            let v = self.values[self.next % self.values.len()];
            self.next += 1;
            v
        }
    }

    fn loc(lat: f64, lon: f64) -> Location {
        Location::new(lat, lon).unwrap()
    }

    // ============== DMS Tests ==============

    #[test]
    fn test_from_dms_north_east_positive() {
        let lat = from_dms(52.0, 30.0, 0.0, Hemisphere::North).unwrap();
        let lon = from_dms(4.0, 15.0, 36.0, Hemisphere::East).unwrap();
        assert!((lat - 52.5).abs() < 1e-12);
        assert!((lon - 4.26).abs() < 1e-12);
    }

    #[test]
    fn test_from_dms_south_west_negative() {
        for (d, m, s) in [(0.0, 0.0, 1.0), (33.0, 51.0, 54.0), (179.0, 59.0, 59.0)] {
            assert!(from_dms(d, m, s, Hemisphere::South).unwrap() < 0.0);
            assert!(from_dms(d, m, s, Hemisphere::West).unwrap() < 0.0);
            assert!(from_dms(d, m, s, Hemisphere::North).unwrap() >= 0.0);
            assert!(from_dms(d, m, s, Hemisphere::East).unwrap() >= 0.0);
        }
    }

    #[test]
    fn test_from_dms_rejects_malformed() {
        assert!(from_dms(f64::NAN, 0.0, 0.0, Hemisphere::North).is_err());
        assert!(from_dms(10.0, 60.0, 0.0, Hemisphere::North).is_err());
        assert!(from_dms(10.0, 0.0, -1.0, Hemisphere::North).is_err());
    }

    #[test]
    fn test_hemisphere_parse() {
        assert_eq!(Hemisphere::parse("n").unwrap(), Hemisphere::North);
        assert_eq!(Hemisphere::parse(" W ").unwrap(), Hemisphere::West);
        assert!(Hemisphere::parse("X").is_err());
    }

    #[test]
    fn test_location_from_dms_checks_axes() {
        let lat = Dms::new(52.0, 0.0, 0.0, Hemisphere::North);
        let lon = Dms::new(4.0, 18.0, 0.0, Hemisphere::East);
        let location = Location::from_dms(&lat, &lon).unwrap();
        assert!((location.longitude() - 4.3).abs() < 1e-9);

        assert_eq!(
            Location::from_dms(&lon, &lat),
            Err(GeoError::WrongAxis { axis: "latitude" })
        );
    }

    #[test]
    fn test_location_rejects_out_of_range() {
        assert!(Location::new(91.0, 0.0).is_err());
        assert!(Location::new(0.0, -180.5).is_err());
        assert!(Location::new(f64::INFINITY, 0.0).is_err());
    }

    // ============== Distance & Bearing Tests ==============

    #[test]
    fn test_distance_symmetric_and_zero() {
        let a = loc(52.0, 4.3);
        let b = loc(48.8566, 2.3522);
        assert!((distance_meters(&a, &b) - distance_meters(&b, &a)).abs() < 1e-6);
        assert_eq!(distance_meters(&a, &a), 0.0);
    }

    #[test]
    fn test_distance_known_value() {
        // One degree of longitude on the equator
        let d = distance_meters(&loc(0.0, 0.0), &loc(0.0, 1.0));
        let expected = EARTH_RADIUS_KM * 1000.0 * PI / 180.0;
        assert!((d - expected).abs() < 1e-6);
    }

    #[test]
    fn test_bearing_cardinal_directions() {
        let origin = loc(0.0, 0.0);
        assert!((bearing_degrees(&origin, &loc(1.0, 0.0)) - 0.0).abs() < 1e-9);
        assert!((bearing_degrees(&origin, &loc(0.0, 1.0)) - 90.0).abs() < 1e-9);
        assert!((bearing_degrees(&origin, &loc(-1.0, 0.0)) - 180.0).abs() < 1e-9);
        assert!((bearing_degrees(&origin, &loc(0.0, -1.0)) - 270.0).abs() < 1e-9);
    }

    #[test]
    fn test_bearing_not_symmetric() {
        let a = loc(52.0, 4.3);
        let b = loc(52.1, 4.5);
        let ab = bearing_degrees(&a, &b);
        let ba = bearing_degrees(&b, &a);
        assert!((ab - ba).abs() > 1.0);
        assert!((0.0..360.0).contains(&ab));
        assert!((0.0..360.0).contains(&ba));
    }

    // ============== Random Point Tests ==============

    #[test]
    fn test_random_point_at_distance() {
        let origin = loc(52.0, 4.3);
        let mut rng = Sequence::new(vec![0.0, 0.125, 0.5, 0.77, 0.999]);
        for _ in 0..5 {
            let point = random_point_at_distance(&origin, 10.0, &mut rng);
            assert!((distance_meters(&origin, &point) - 10_000.0).abs() < 1e-3);
        }
    }

    #[test]
    fn test_random_point_normalizes_longitude() {
        let origin = loc(0.0, 179.99);
        // bearing = 90 degrees, straight east across the antimeridian
        let mut rng = Sequence::new(vec![0.25]);
        let point = random_point_at_distance(&origin, 10.0, &mut rng);
        assert!(point.longitude() < 0.0);
        assert!((-180.0..=180.0).contains(&point.longitude()));
    }

    #[test]
    fn test_random_point_zero_distance() {
        let origin = loc(-33.9, 151.2);
        let mut rng = Sequence::new(vec![0.3]);
        let point = random_point_at_distance(&origin, 0.0, &mut rng);
        assert!(distance_meters(&origin, &point) < 1e-6);
    }
}
