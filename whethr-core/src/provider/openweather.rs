use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use crate::model::{Location, WeatherObservation};

use super::{ServiceId, WeatherProvider, get_body};

const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";

#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenWeatherClient {
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

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: Option<f64>,
    feels_like: Option<f64>,
    humidity: Option<u8>,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    #[serde(default)]
    name: Option<String>,
    dt: Option<i64>,
    main: OwMain,
    #[serde(default)]
    weather: Vec<OwWeather>,
    #[serde(default)]
    rain: Value,
    #[serde(default)]
    snow: Value,
}

/// Precipitation blocks come either as a flag or as a volume mapping like `{"1h": 0.3}`.
fn precipitation_present(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Object(map) => !map.is_empty(),
        Value::Number(n) => n.as_f64().is_some_and(|v| v > 0.0),
        _ => false,
    }
}

fn parse_observation(body: &str) -> Result<WeatherObservation> {
    let raw: Value =
        serde_json::from_str(body).context("Failed to parse OpenWeather current JSON")?;
    let parsed: OwCurrentResponse = serde_json::from_value(raw.clone())
        .context("Unexpected OpenWeather current payload")?;

    let feels_like_f = parsed
        .main
        .feels_like
        .ok_or_else(|| anyhow!("OpenWeather response has no feels-like temperature"))?;

    let observation_time = parsed
        .dt
        .and_then(|ts| DateTime::from_timestamp(ts, 0))
        .unwrap_or_else(Utc::now);

    let condition = parsed
        .weather
        .first()
        .and_then(|w| w.description.clone())
        .filter(|d| !d.trim().is_empty())
        .unwrap_or_else(|| "Unknown".to_string());

    Ok(WeatherObservation {
        place_name: parsed.name.filter(|n| !n.trim().is_empty()),
        temperature_f: parsed.main.temp,
        feels_like_f,
        humidity_pct: parsed.main.humidity,
        condition,
        rain: precipitation_present(&parsed.rain),
        snow: precipitation_present(&parsed.snow),
        observation_time,
        raw,
    })
}

#[async_trait]
impl WeatherProvider for OpenWeatherClient {
    async fn current(&self, location: Location) -> Result<WeatherObservation> {
        let url = format!("{}/weather", self.base_url);
        let lat = location.latitude.to_string();
        let lon = location.longitude.to_string();

        let body = get_body(
            &self.http,
            ServiceId::OpenWeather,
            &url,
            &[
                ("appid", self.api_key.as_str()),
                ("lat", lat.as_str()),
                ("lon", lon.as_str()),
                ("units", "imperial"),
            ],
        )
        .await?;

        let observation = parse_observation(&body)?;
        tracing::debug!(
            %location,
            feels_like_f = observation.feels_like_f,
            rain = observation.rain,
            snow = observation.snow,
            "fetched current weather"
        );

        Ok(observation)
    }
}
