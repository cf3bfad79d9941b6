//! Core library for the `whethr` service.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - Clients for the geolocation, geocoding and weather services
//! - Location resolution and the hat decision
//! - Per-request orchestration (`HatAdvisor`) and the session store
//!
//! It is used by the `whethr` server binary.

pub mod advisor;
pub mod config;
pub mod error;
pub mod hat;
pub mod model;
pub mod provider;
pub mod resolve;
pub mod session;

pub use advisor::HatAdvisor;
pub use config::{Config, ServerConfig, ServiceConfig};
pub use error::{LookupError, LookupResult};
pub use hat::{HatPolicy, PrecipitationPolicy, needs_hat};
pub use model::{
    DEFAULT_LOCATION, HatRecommendation, HatReport, Location, LocationQuery, LocationSource,
    QueryParams, WeatherObservation, WeatherStatus,
};
pub use provider::{IpGeolocator, PlaceGeocoder, ServiceId, Services, WeatherProvider};
pub use resolve::{LocationResolver, Resolution};
pub use session::{FORM_SLOT, MemorySessionStore, SessionStore};
