use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::net::IpAddr;

use crate::{
    error::{LookupError, LookupResult},
    model::Location,
};

use super::{IpGeolocator, ServiceId, get_body};

const DEFAULT_BASE_URL: &str = "http://api.ipstack.com";

#[derive(Debug, Clone)]
pub struct IpStackClient {
    api_key: String,
    base_url: String,
    http: Client,
}

impl IpStackClient {
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

/// Private and loopback addresses come back with null coordinates.
#[derive(Debug, Deserialize)]
struct IsLookup {
    latitude: Option<f64>,
    longitude: Option<f64>,
}

#[async_trait]
impl IpGeolocator for IpStackClient {
    async fn locate(&self, ip: IpAddr) -> LookupResult<Location> {
        let url = format!("{}/{}", self.base_url, ip);

        let body = get_body(
            &self.http,
            ServiceId::IpStack,
            &url,
            &[("access_key", self.api_key.as_str())],
        )
        .await?;

        let parsed: IsLookup =
            serde_json::from_str(&body).context("Failed to parse ipstack JSON")?;

        let location = Location::from_parts(parsed.latitude, parsed.longitude)
            .ok_or_else(|| LookupError::NotFound(ip.to_string()))?;

        tracing::debug!(%ip, %location, "located client address");
        Ok(location)
    }
}
