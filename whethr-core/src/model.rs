use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fallback coordinates used when no resolution strategy produces a location.
pub const DEFAULT_LOCATION: Location = Location {
    latitude: 33.9383776,
    longitude: -118.3111258,
};

/// A resolved latitude/longitude pair, always within geographic range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Coordinates")]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

/// Unchecked coordinates as they appear in config files and payloads.
#[derive(Debug, Deserialize)]
struct Coordinates {
    latitude: f64,
    longitude: f64,
}

impl TryFrom<Coordinates> for Location {
    type Error = String;

    fn try_from(raw: Coordinates) -> Result<Self, Self::Error> {
        Location::new(raw.latitude, raw.longitude).ok_or_else(|| {
            format!(
                "coordinates ({}, {}) are outside -90..90 / -180..180",
                raw.latitude, raw.longitude
            )
        })
    }
}

impl Location {
    /// Build a location, rejecting non-finite or out-of-range components.
    ///
    /// Zero is a perfectly good coordinate; only invalid numbers are refused.
    pub fn new(latitude: f64, longitude: f64) -> Option<Self> {
        let lat_ok = latitude.is_finite() && (-90.0..=90.0).contains(&latitude);
        let lon_ok = longitude.is_finite() && (-180.0..=180.0).contains(&longitude);

        (lat_ok && lon_ok).then_some(Self {
            latitude,
            longitude,
        })
    }

    /// Build a location from components that upstream services may leave null.
    pub fn from_parts(latitude: Option<f64>, longitude: Option<f64>) -> Option<Self> {
        Self::new(latitude?, longitude?)
    }

    /// Parse a pair of textual coordinates, e.g. request parameters.
    pub fn parse(latitude: &str, longitude: &str) -> Option<Self> {
        let lat = latitude.trim().parse::<f64>().ok()?;
        let lon = longitude.trim().parse::<f64>().ok()?;
        Self::new(lat, lon)
    }
}

impl Default for Location {
    fn default() -> Self {
        DEFAULT_LOCATION
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

/// Raw location-related parameters as submitted by a client, via query string or form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryParams {
    pub lat: Option<String>,
    pub lon: Option<String>,
    pub name: Option<String>,
    pub placename: Option<String>,
    /// Older `<lat>,<lon>` form.
    #[serde(rename = "where")]
    pub where_: Option<String>,
}

/// The single highest-priority way the caller asked us to locate them.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationQuery {
    Coordinates(Location),
    PlaceName(String),
    ClientIp,
}

impl LocationQuery {
    /// Pick the query variant from request parameters.
    ///
    /// Unparseable or out-of-range coordinates count as absent.
    pub fn from_params(params: &QueryParams) -> Self {
        let explicit = match (non_blank(&params.lat), non_blank(&params.lon)) {
            (Some(lat), Some(lon)) => Location::parse(lat, lon),
            _ => None,
        };

        let explicit = explicit.or_else(|| {
            non_blank(&params.where_)
                .and_then(|w| w.split_once(','))
                .and_then(|(lat, lon)| Location::parse(lat, lon))
        });

        if let Some(location) = explicit {
            return LocationQuery::Coordinates(location);
        }

        match non_blank(&params.placename).or_else(|| non_blank(&params.name)) {
            Some(name) => LocationQuery::PlaceName(name.to_string()),
            None => LocationQuery::ClientIp,
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Current conditions at a location, in imperial units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherObservation {
    pub place_name: Option<String>,
    pub temperature_f: Option<f64>,
    pub feels_like_f: f64,
    pub humidity_pct: Option<u8>,
    pub condition: String,
    pub rain: bool,
    pub snow: bool,
    pub observation_time: DateTime<Utc>,
    /// Payload exactly as the weather service returned it.
    pub raw: serde_json::Value,
}

/// Which strategy produced the location a report is based on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationSource {
    Coordinates,
    PlaceName,
    ClientIp,
    Default,
}

/// Outcome of the hat decision, with the observation it was derived from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HatRecommendation {
    pub needs_hat: bool,
    pub is_cold: bool,
    pub feels_like: i64,
    pub observation: WeatherObservation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WeatherStatus {
    Available(HatRecommendation),
    Unavailable { reason: String },
}

/// Everything a page needs to render the answer for one request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HatReport {
    pub place_name: String,
    pub location: Location,
    pub source: LocationSource,
    pub prompt_for_geolocation: bool,
    pub notices: Vec<String>,
    pub weather: WeatherStatus,
}

impl HatReport {
    pub fn recommendation(&self) -> Option<&HatRecommendation> {
        match &self.weather {
            WeatherStatus::Available(rec) => Some(rec),
            WeatherStatus::Unavailable { .. } => None,
        }
    }
}
