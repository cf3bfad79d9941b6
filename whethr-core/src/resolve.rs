use std::net::IpAddr;

use crate::{
    error::LookupError,
    model::{Location, LocationQuery, LocationSource},
    provider::{IpGeolocator, PlaceGeocoder},
};

/// The location a request will be answered for, and how it was obtained.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub location: Location,
    pub source: LocationSource,
    /// Messages meant for the person making the request.
    pub notices: Vec<String>,
}

/// Tries explicit coordinates, then the place name, then the client address,
/// and finally the fallback location. The first strategy to succeed wins.
#[derive(Debug, Clone, Copy)]
pub struct LocationResolver<'a> {
    places: &'a dyn PlaceGeocoder,
    ip: &'a dyn IpGeolocator,
    fallback: Location,
}

impl<'a> LocationResolver<'a> {
    pub fn new(
        places: &'a dyn PlaceGeocoder,
        ip: &'a dyn IpGeolocator,
        fallback: Location,
    ) -> Self {
        Self {
            places,
            ip,
            fallback,
        }
    }

    pub async fn resolve(&self, query: &LocationQuery, client_ip: Option<IpAddr>) -> Resolution {
        let mut notices = Vec::new();

        if let LocationQuery::Coordinates(location) = query {
            return Resolution {
                location: *location,
                source: LocationSource::Coordinates,
                notices,
            };
        }

        if let LocationQuery::PlaceName(name) = query {
            match self.places.forward(name).await {
                Ok(location) => {
                    return Resolution {
                        location,
                        source: LocationSource::PlaceName,
                        notices,
                    };
                }
                Err(err) => {
                    log_miss("place name", name, &err);
                    notices.push(format!("'{name}' could not be found."));
                }
            }
        }

        if let Some(ip) = client_ip {
            match self.ip.locate(ip).await {
                Ok(location) => {
                    return Resolution {
                        location,
                        source: LocationSource::ClientIp,
                        notices,
                    };
                }
                Err(err) => log_miss("client address", &ip.to_string(), &err),
            }
        }

        tracing::info!(location = %self.fallback, "falling back to default location");
        Resolution {
            location: self.fallback,
            source: LocationSource::Default,
            notices,
        }
    }
}

fn log_miss(strategy: &str, input: &str, err: &LookupError) {
    match err {
        LookupError::NotFound(_) => tracing::info!(strategy, input, "no location found"),
        LookupError::Upstream(e) => {
            tracing::warn!(strategy, input, error = %e, "location lookup failed")
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{error::LookupResult, model::DEFAULT_LOCATION};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Geocoder answering from fixed results and counting calls.
    #[derive(Debug, Default)]
    pub(crate) struct FakePlaces {
        pub forward: Option<Location>,
        pub reverse: Option<String>,
        pub forward_calls: AtomicUsize,
        pub reverse_calls: AtomicUsize,
    }

    #[async_trait]
    impl PlaceGeocoder for FakePlaces {
        async fn forward(&self, place_name: &str) -> LookupResult<Location> {
            self.forward_calls.fetch_add(1, Ordering::SeqCst);
            self.forward
                .ok_or_else(|| LookupError::NotFound(place_name.to_string()))
        }

        async fn reverse(&self, location: Location) -> LookupResult<String> {
            self.reverse_calls.fetch_add(1, Ordering::SeqCst);
            self.reverse
                .clone()
                .ok_or_else(|| LookupError::NotFound(location.to_string()))
        }
    }

    /// Mirrors ipstack: either component may be null.
    #[derive(Debug, Default)]
    pub(crate) struct FakeIp {
        pub latitude: Option<f64>,
        pub longitude: Option<f64>,
        pub calls: AtomicUsize,
    }

    impl FakeIp {
        pub fn at(latitude: f64, longitude: f64) -> Self {
            Self {
                latitude: Some(latitude),
                longitude: Some(longitude),
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl IpGeolocator for FakeIp {
        async fn locate(&self, ip: IpAddr) -> LookupResult<Location> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Location::from_parts(self.latitude, self.longitude)
                .ok_or_else(|| LookupError::NotFound(ip.to_string()))
        }
    }

    fn client() -> Option<IpAddr> {
        Some("203.0.113.7".parse().unwrap())
    }

    #[tokio::test]
    async fn explicit_coordinates_skip_geocoding() {
        let places = FakePlaces {
            forward: Location::new(1.0, 1.0),
            ..FakePlaces::default()
        };
        let ip = FakeIp::at(2.0, 2.0);
        let resolver = LocationResolver::new(&places, &ip, DEFAULT_LOCATION);

        for (lat, lon) in [(34.05, -118.25), (0.0, 0.0), (-90.0, 180.0)] {
            let loc = Location::new(lat, lon).unwrap();
            let res = resolver.resolve(&LocationQuery::Coordinates(loc), client()).await;

            assert_eq!(res.location, loc);
            assert_eq!(res.source, LocationSource::Coordinates);
            assert!(res.notices.is_empty());
        }

        assert_eq!(places.forward_calls.load(Ordering::SeqCst), 0);
        assert_eq!(ip.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn place_name_is_geocoded() {
        let paris = Location::new(48.8566, 2.3522).unwrap();
        let places = FakePlaces {
            forward: Some(paris),
            ..FakePlaces::default()
        };
        let ip = FakeIp::at(2.0, 2.0);
        let resolver = LocationResolver::new(&places, &ip, DEFAULT_LOCATION);

        let query = LocationQuery::PlaceName("Paris".into());
        let res = resolver.resolve(&query, client()).await;

        assert_eq!(res.location, paris);
        assert_eq!(res.source, LocationSource::PlaceName);
        assert_eq!(ip.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unknown_place_falls_back_to_ip_with_notice() {
        let places = FakePlaces::default();
        let ip = FakeIp::at(40.0, -74.0);
        let resolver = LocationResolver::new(&places, &ip, DEFAULT_LOCATION);

        let query = LocationQuery::PlaceName("Nowhereville".into());
        let res = resolver.resolve(&query, client()).await;

        assert_eq!(res.location, Location::new(40.0, -74.0).unwrap());
        assert_eq!(res.source, LocationSource::ClientIp);
        assert_eq!(res.notices.len(), 1);
        assert!(res.notices[0].contains("Nowhereville"));
        assert!(res.notices[0].contains("could not be found"));
    }

    #[tokio::test]
    async fn null_component_means_default() {
        let places = FakePlaces::default();
        for ip in [
            FakeIp {
                latitude: None,
                longitude: Some(-118.0),
                ..FakeIp::default()
            },
            FakeIp {
                latitude: Some(33.0),
                longitude: None,
                ..FakeIp::default()
            },
            FakeIp::default(),
        ] {
            let resolver = LocationResolver::new(&places, &ip, DEFAULT_LOCATION);
            let res = resolver.resolve(&LocationQuery::ClientIp, client()).await;

            assert_eq!(res.location, DEFAULT_LOCATION);
            assert_eq!(res.location, Location::new(33.9383776, -118.3111258).unwrap());
            assert_eq!(res.source, LocationSource::Default);
        }
    }

    #[tokio::test]
    async fn zero_from_ip_is_not_missing() {
        let places = FakePlaces::default();
        let ip = FakeIp::at(0.0, 0.0);
        let resolver = LocationResolver::new(&places, &ip, DEFAULT_LOCATION);

        let res = resolver.resolve(&LocationQuery::ClientIp, client()).await;

        assert_eq!(res.location, Location::new(0.0, 0.0).unwrap());
        assert_eq!(res.source, LocationSource::ClientIp);
    }

    #[tokio::test]
    async fn no_client_address_means_default() {
        let places = FakePlaces::default();
        let ip = FakeIp::at(1.0, 1.0);
        let resolver = LocationResolver::new(&places, &ip, DEFAULT_LOCATION);

        let query = LocationQuery::PlaceName("Nowhereville".into());
        let res = resolver.resolve(&query, None).await;

        assert_eq!(res.location, DEFAULT_LOCATION);
        assert_eq!(res.source, LocationSource::Default);
        assert_eq!(res.notices.len(), 1);
        assert_eq!(ip.calls.load(Ordering::SeqCst), 0);
    }
}
