use anyhow::{Context, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use std::{fmt::Debug, net::IpAddr};

use crate::{
    Config,
    error::LookupResult,
    model::{Location, WeatherObservation},
    provider::{
        ipstack::IpStackClient, locationiq::LocationIqClient, openweather::OpenWeatherClient,
    },
};

pub mod ipstack;
pub mod locationiq;
pub mod openweather;

/// Outbound services the resolver and advisor depend on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceId {
    IpStack,
    LocationIq,
    OpenWeather,
}

impl ServiceId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceId::IpStack => "ipstack",
            ServiceId::LocationIq => "locationiq",
            ServiceId::OpenWeather => "openweather",
        }
    }

    pub fn purpose(&self) -> &'static str {
        match self {
            ServiceId::IpStack => "IP geolocation",
            ServiceId::LocationIq => "place-name geocoding",
            ServiceId::OpenWeather => "current weather",
        }
    }

    pub const fn all() -> &'static [ServiceId] {
        &[ServiceId::IpStack, ServiceId::LocationIq, ServiceId::OpenWeather]
    }
}

impl std::fmt::Display for ServiceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ServiceId {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "ipstack" => Ok(ServiceId::IpStack),
            "locationiq" => Ok(ServiceId::LocationIq),
            "openweather" => Ok(ServiceId::OpenWeather),
            _ => Err(anyhow!(
                "Unknown service '{value}'. Supported services: ipstack, locationiq, openweather."
            )),
        }
    }
}

/// Current conditions for a location.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn current(&self, location: Location) -> anyhow::Result<WeatherObservation>;
}

/// Place name ↔ coordinates.
#[async_trait]
pub trait PlaceGeocoder: Send + Sync + Debug {
    async fn forward(&self, place_name: &str) -> LookupResult<Location>;

    /// Human-readable name for a location.
    async fn reverse(&self, location: Location) -> LookupResult<String>;
}

/// Network address → coordinates.
#[async_trait]
pub trait IpGeolocator: Send + Sync + Debug {
    async fn locate(&self, ip: IpAddr) -> LookupResult<Location>;
}

/// Everything the advisor needs to talk to the outside world.
#[derive(Debug)]
pub struct Services {
    pub weather: Box<dyn WeatherProvider>,
    pub places: Box<dyn PlaceGeocoder>,
    pub ip: Box<dyn IpGeolocator>,
}

fn api_key(id: ServiceId, config: &Config) -> anyhow::Result<String> {
    config.service_api_key(id).map(str::to_owned).ok_or_else(|| {
        anyhow!(
            "No API key configured for service '{id}' ({}).\n\
                 Hint: run `whethr configure {id}` and enter your API key.",
            id.purpose()
        )
    })
}

/// Construct all outbound clients from config; every service must have a key.
pub fn services_from_config(config: &Config) -> anyhow::Result<Services> {
    let http = Client::new();

    let weather = OpenWeatherClient::new(http.clone(), api_key(ServiceId::OpenWeather, config)?)
        .with_base_url(config.service_base_url(ServiceId::OpenWeather));
    let places = LocationIqClient::new(http.clone(), api_key(ServiceId::LocationIq, config)?)
        .with_base_url(config.service_base_url(ServiceId::LocationIq));
    let ip = IpStackClient::new(http, api_key(ServiceId::IpStack, config)?)
        .with_base_url(config.service_base_url(ServiceId::IpStack));

    Ok(Services {
        weather: Box::new(weather),
        places: Box::new(places),
        ip: Box::new(ip),
    })
}

/// Send a GET and return the body, failing on transport errors and non-success status.
pub(crate) async fn get_body(
    http: &Client,
    service: ServiceId,
    url: &str,
    query: &[(&str, &str)],
) -> anyhow::Result<String> {
    let res = http
        .get(url)
        .query(query)
        .send()
        .await
        .with_context(|| format!("Failed to send request to {service}"))?;

    let status = res.status();
    let body = res
        .text()
        .await
        .with_context(|| format!("Failed to read {service} response body"))?;

    if !status.is_success() {
        return Err(anyhow!(
            "{service} request failed with status {}: {}",
            status,
            truncate_body(&body),
        ));
    }

    Ok(body)
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    } else {
        body.to_string()
    }
}
