use serde::{Deserialize, Serialize};

/// Represents a geographical coordinate using latitude and longitude.
///
/// Latitude is the first element (index 0), and longitude is the second (index 1).
///
/// # Examples
///
/// ```
/// use aircast::LatLon;
///
/// let colaba = LatLon(18.906, 72.813);
/// assert_eq!(colaba.0, 18.906); // Latitude
/// assert_eq!(colaba.1, 72.813); // Longitude
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon(pub f64, pub f64);

/// A named location polled every ingestion cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Stored as `area_name` on every reading for this location.
    pub name: String,
    pub coordinates: LatLon,
}

impl Location {
    pub fn new(name: impl Into<String>, coordinates: LatLon) -> Self {
        Self {
            name: name.into(),
            coordinates,
        }
    }

    pub fn latitude(&self) -> f64 {
        self.coordinates.0
    }

    pub fn longitude(&self) -> f64 {
        self.coordinates.1
    }
}
