use std::net::IpAddr;

use crate::{
    Config,
    hat::HatPolicy,
    model::{HatReport, Location, LocationQuery, QueryParams, WeatherStatus},
    provider::{Services, services_from_config},
    resolve::LocationResolver,
};

/// Answers "should I wear a hat?" for one request at a time.
///
/// Each call runs the lookups one after another: location, then weather,
/// then a display name if the weather service didn't supply one.
#[derive(Debug)]
pub struct HatAdvisor {
    services: Services,
    policy: HatPolicy,
    fallback: Location,
}

impl HatAdvisor {
    pub fn new(services: Services, policy: HatPolicy, fallback: Location) -> Self {
        Self {
            services,
            policy,
            fallback,
        }
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let services = services_from_config(config)?;
        Ok(Self::new(services, config.hat, config.default_location))
    }

    pub async fn advise(&self, params: &QueryParams, client_ip: Option<IpAddr>) -> HatReport {
        let query = LocationQuery::from_params(params);
        let prompt_for_geolocation = matches!(query, LocationQuery::ClientIp);

        let resolver = LocationResolver::new(
            self.services.places.as_ref(),
            self.services.ip.as_ref(),
            self.fallback,
        );
        let resolution = resolver.resolve(&query, client_ip).await;
        let location = resolution.location;

        let observation = self
            .services
            .weather
            .current(location)
            .await
            .inspect_err(|err| {
                tracing::warn!(%location, error = %format!("{err:#}"), "weather unavailable");
            });

        let supplied_name = observation
            .as_ref()
            .ok()
            .and_then(|o| o.place_name.clone());
        let place_name = match supplied_name {
            Some(name) => name,
            None => self.display_name(location).await,
        };

        let weather = match observation {
            Ok(observation) => WeatherStatus::Available(self.policy.recommend(observation)),
            Err(_) => WeatherStatus::Unavailable {
                reason: "Weather data is unavailable right now.".to_string(),
            },
        };

        HatReport {
            place_name,
            location,
            source: resolution.source,
            prompt_for_geolocation,
            notices: resolution.notices,
            weather,
        }
    }

    async fn display_name(&self, location: Location) -> String {
        match self.services.places.reverse(location).await {
            Ok(name) => name,
            Err(err) => {
                tracing::debug!(%location, error = %err, "no display name, using coordinates");
                location.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        model::{DEFAULT_LOCATION, LocationSource, WeatherObservation},
        provider::WeatherProvider,
        resolve::tests::{FakeIp, FakePlaces},
    };
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Default)]
    struct FakeWeather {
        feels_like_f: Option<f64>,
        rain: bool,
        name: Option<String>,
        seen: Arc<Mutex<Vec<Location>>>,
    }

    #[async_trait]
    impl WeatherProvider for FakeWeather {
        async fn current(&self, location: Location) -> anyhow::Result<WeatherObservation> {
            self.seen.lock().unwrap().push(location);
            let feels_like_f = self
                .feels_like_f
                .ok_or_else(|| anyhow::anyhow!("status 500 Internal Server Error"))?;
            Ok(WeatherObservation {
                place_name: self.name.clone(),
                temperature_f: Some(feels_like_f),
                feels_like_f,
                humidity_pct: None,
                condition: "clear sky".into(),
                rain: self.rain,
                snow: false,
                observation_time: Utc::now(),
                raw: serde_json::json!({"main": {"feels_like": feels_like_f}}),
            })
        }
    }

    fn advisor(weather: FakeWeather, places: FakePlaces, ip: FakeIp) -> HatAdvisor {
        let services = Services {
            weather: Box::new(weather),
            places: Box::new(places),
            ip: Box::new(ip),
        };
        HatAdvisor::new(services, HatPolicy::default(), DEFAULT_LOCATION)
    }

    fn client() -> Option<IpAddr> {
        Some("198.51.100.20".parse().unwrap())
    }

    #[tokio::test]
    async fn cold_explicit_coordinates() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let weather = FakeWeather {
            feels_like_f: Some(55.0),
            name: Some("Los Angeles".into()),
            seen: seen.clone(),
            ..FakeWeather::default()
        };
        let advisor = advisor(weather, FakePlaces::default(), FakeIp::default());

        let params = QueryParams {
            lat: Some("34.05".into()),
            lon: Some("-118.25".into()),
            ..QueryParams::default()
        };
        let report = advisor.advise(&params, client()).await;

        let rec = report.recommendation().expect("weather available");
        assert!(rec.is_cold);
        assert!(rec.needs_hat);
        assert_eq!(rec.feels_like, 55);
        assert_eq!(report.place_name, "Los Angeles");
        assert_eq!(report.source, LocationSource::Coordinates);
        assert!(!report.prompt_for_geolocation);
        let expected = Location::new(34.05, -118.25).unwrap();
        assert_eq!(seen.lock().unwrap().as_slice(), &[expected]);
    }

    #[tokio::test]
    async fn unknown_place_uses_default_with_notice() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let weather = FakeWeather {
            feels_like_f: Some(70.0),
            seen: seen.clone(),
            ..FakeWeather::default()
        };
        let places = FakePlaces {
            reverse: Some("Hawthorne, California".into()),
            ..FakePlaces::default()
        };
        let advisor = advisor(weather, places, FakeIp::default());

        let params = QueryParams {
            placename: Some("Nowhereville".into()),
            ..QueryParams::default()
        };
        let report = advisor.advise(&params, client()).await;

        assert_eq!(report.location, DEFAULT_LOCATION);
        assert_eq!(report.source, LocationSource::Default);
        assert!(
            report
                .notices
                .iter()
                .any(|n| n.contains("Nowhereville") && n.contains("could not be found"))
        );
        assert!(!report.prompt_for_geolocation);
        assert_eq!(seen.lock().unwrap().as_slice(), &[DEFAULT_LOCATION]);
    }

    #[tokio::test]
    async fn missing_weather_name_is_reverse_geocoded() {
        let weather = FakeWeather {
            feels_like_f: Some(65.0),
            ..FakeWeather::default()
        };
        let places = FakePlaces {
            reverse: Some("Springfield, Illinois".into()),
            ..FakePlaces::default()
        };
        let advisor = advisor(weather, places, FakeIp::at(39.8, -89.6));

        let report = advisor.advise(&QueryParams::default(), client()).await;

        assert_eq!(report.place_name, "Springfield, Illinois");
        assert_eq!(report.source, LocationSource::ClientIp);
        assert!(report.prompt_for_geolocation);
        let rec = report.recommendation().expect("weather available");
        assert!(!rec.needs_hat);
    }

    #[tokio::test]
    async fn supplied_weather_name_skips_reverse_geocoding() {
        let weather = FakeWeather {
            feels_like_f: Some(65.0),
            name: Some("Quito".into()),
            ..FakeWeather::default()
        };
        let places = FakePlaces {
            reverse: Some("unused".into()),
            ..FakePlaces::default()
        };
        let advisor = advisor(weather, places, FakeIp::default());

        let report = advisor.advise(&QueryParams::default(), client()).await;
        assert_eq!(report.place_name, "Quito");
    }

    #[tokio::test]
    async fn weather_failure_is_reported_not_raised() {
        let advisor = advisor(FakeWeather::default(), FakePlaces::default(), FakeIp::default());

        let report = advisor.advise(&QueryParams::default(), client()).await;

        assert!(matches!(report.weather, WeatherStatus::Unavailable { .. }));
        assert!(report.recommendation().is_none());
        assert_eq!(report.location, DEFAULT_LOCATION);
        assert!(report.prompt_for_geolocation);
        // Neither weather nor reverse geocoding produced a name.
        assert_eq!(report.place_name, DEFAULT_LOCATION.to_string());
    }

    #[tokio::test]
    async fn rain_on_a_warm_day() {
        let weather = FakeWeather {
            feels_like_f: Some(75.0),
            rain: true,
            name: Some("Seattle".into()),
            ..FakeWeather::default()
        };
        let advisor = advisor(weather, FakePlaces::default(), FakeIp::default());

        let params = QueryParams {
            where_: Some("47.6,-122.3".into()),
            ..QueryParams::default()
        };
        let report = advisor.advise(&params, None).await;

        let rec = report.recommendation().expect("weather available");
        assert!(!rec.is_cold);
        assert!(rec.needs_hat);
        assert!(crate::needs_hat(&rec.observation));
    }

    #[test]
    fn from_config_requires_keys() {
        let err = HatAdvisor::from_config(&Config::default()).unwrap_err();
        assert!(err.to_string().contains("No API key configured"));
    }
}
