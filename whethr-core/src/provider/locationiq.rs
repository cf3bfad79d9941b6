use anyhow::{Context, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::{
    error::{LookupError, LookupResult},
    model::Location,
};

use super::{PlaceGeocoder, ServiceId, get_body};

const DEFAULT_BASE_URL: &str = "https://us1.locationiq.com/v1";

/// Forward and reverse geocoding through LocationIQ.
#[derive(Debug, Clone)]
pub struct LocationIqClient {
    api_key: String,
    base_url: String,
    http: Client,
}

impl LocationIqClient {
    pub fn new(http: Client, api_key: String) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            http,
        }
    }

    pub fn with_base_url(mut self, base_url: Option<&str>) -> Self {
        if let Some(url) = base_url {
            self.base_url = url.trim_end_matches('/').to_string();
        }
        self
    }
}

// Coordinates arrive as strings.
#[derive(Debug, Deserialize)]
struct LiPlace {
    lat: String,
    lon: String,
}

#[derive(Debug, Deserialize)]
struct LiAddress {
    city: Option<String>,
    state: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LiReverse {
    display_name: Option<String>,
    address: Option<LiAddress>,
}

impl LiReverse {
    /// "City, State" when there is a city, otherwise the full display string.
    fn into_place_name(self) -> Option<String> {
        let address_line = self.address.and_then(|addr| {
            let city = addr.city.filter(|c| !c.is_empty())?;
            Some(match addr.state.filter(|s| !s.is_empty() && *s != city) {
                Some(state) => format!("{city}, {state}"),
                None => city,
            })
        });

        address_line.or(self.display_name.filter(|d| !d.is_empty()))
    }
}

#[async_trait]
impl PlaceGeocoder for LocationIqClient {
    async fn forward(&self, place_name: &str) -> LookupResult<Location> {
        let url = format!("{}/search.php", self.base_url);

        let body = get_body(
            &self.http,
            ServiceId::LocationIq,
            &url,
            &[
                ("key", self.api_key.as_str()),
                ("q", place_name),
                ("format", "json"),
            ],
        )
        .await?;

        let places: Vec<LiPlace> =
            serde_json::from_str(&body).context("Failed to parse LocationIQ search JSON")?;

        let first = places
            .first()
            .ok_or_else(|| LookupError::NotFound(place_name.to_string()))?;

        let location = Location::parse(&first.lat, &first.lon).ok_or_else(|| {
            anyhow!("LocationIQ returned unusable coordinates ({}, {})", first.lat, first.lon)
        })?;

        tracing::debug!(place_name, %location, "geocoded place name");
        Ok(location)
    }

    async fn reverse(&self, location: Location) -> LookupResult<String> {
        let url = format!("{}/reverse.php", self.base_url);
        let lat = location.latitude.to_string();
        let lon = location.longitude.to_string();

        let body = get_body(
            &self.http,
            ServiceId::LocationIq,
            &url,
            &[
                ("key", self.api_key.as_str()),
                ("lat", lat.as_str()),
                ("lon", lon.as_str()),
                ("zoom", "14"),
                ("format", "json"),
            ],
        )
        .await?;

        let parsed: LiReverse =
            serde_json::from_str(&body).context("Failed to parse LocationIQ reverse JSON")?;

        parsed
            .into_place_name()
            .ok_or_else(|| LookupError::NotFound(location.to_string()))
    }
}
