//! Coordinate extraction from free-form text
//!
//! Accepts `lat,lon`, `lat, lon` and `lat lon`, anywhere in the input, which
//! also covers map links such as `https://www.google.com/maps/@28.3809,-16.5379,15z`.

use crate::coord::Location;
use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;

static COORDS_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([-+]?\d*\.?\d+)[,| ] ?([-+]?\d*\.?\d+)").unwrap());

/// A latitude/longitude pair exactly as it appeared in the text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCoordinates {
    pub lat: String,
    pub lon: String,
}

impl RawCoordinates {
    /// Convert to a range-checked location
    pub fn to_location(&self) -> Result<Location> {
        let latitude: f64 = self
            .lat
            .parse()
            .map_err(|_| Error::InvalidCoordinates(format!("Invalid latitude: {}", self.lat)))?;
        let longitude: f64 = self
            .lon
            .parse()
            .map_err(|_| Error::InvalidCoordinates(format!("Invalid longitude: {}", self.lon)))?;
        Location::checked(latitude, longitude)
    }
}

/// Find the first coordinate pair in `text`
///
/// Returns `None` when the text holds no pair. Later pairs are ignored.
pub fn parse(text: &str) -> Option<RawCoordinates> {
    let captures = COORDS_PATTERN.captures(text)?;
    Some(RawCoordinates {
        lat: captures.get(1)?.as_str().to_string(),
        lon: captures.get(2)?.as_str().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(lat: &str, lon: &str) -> RawCoordinates {
        RawCoordinates {
            lat: lat.to_string(),
            lon: lon.to_string(),
        }
    }

    #[test]
    fn test_comma_separated() {
        assert_eq!(parse("29.97913,31.13427"), Some(raw("29.97913", "31.13427")));
    }

    #[test]
    fn test_space_separated() {
        assert_eq!(parse("28.3809 -16.5379"), Some(raw("28.3809", "-16.5379")));
    }

    #[test]
    fn test_comma_and_space() {
        assert_eq!(parse("28.3809, -16.5379"), Some(raw("28.3809", "-16.5379")));
    }

    #[test]
    fn test_no_coordinates() {
        assert_eq!(parse("no coordinates here"), None);
        assert_eq!(parse(""), None);
    }

    #[test]
    fn test_first_match_wins() {
        assert_eq!(
            parse("from 1.5,2.5 to 3.5,4.5"),
            Some(raw("1.5", "2.5"))
        );
    }

    #[test]
    fn test_embedded_in_text() {
        assert_eq!(
            parse("meet me at 51.5007,-0.1246 tomorrow"),
            Some(raw("51.5007", "-0.1246"))
        );
    }

    #[test]
    fn test_map_url() {
        let url = "https://www.google.com/maps/@28.3809,-16.5379,15z";
        assert_eq!(parse(url), Some(raw("28.3809", "-16.5379")));
    }

    #[test]
    fn test_signs_and_integers() {
        assert_eq!(parse("+45,-120"), Some(raw("+45", "-120")));
        assert_eq!(parse(".5 .25"), Some(raw(".5", ".25")));
    }

    #[test]
    fn test_to_location() {
        let location = raw("28.3809", "-16.5379").to_location().unwrap();
        assert_eq!(location.latitude, 28.3809);
        assert_eq!(location.longitude, -16.5379);

        let location = raw("+45", "-120").to_location().unwrap();
        assert_eq!(location.latitude, 45.0);
    }

    #[test]
    fn test_to_location_out_of_range() {
        assert!(raw("123.0", "10.0").to_location().is_err());
        assert!(raw("10.0", "200.0").to_location().is_err());
    }
}
