use serde::{Deserialize, Serialize};

use crate::model::{HatRecommendation, WeatherObservation};

/// Feels-like temperature (°F) below which it counts as cold.
pub const COLD_THRESHOLD_F: f64 = 60.0;

/// Which kinds of precipitation call for a hat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrecipitationPolicy {
    RainOnly,
    #[default]
    RainOrSnow,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HatPolicy {
    pub cold_below_f: f64,
    pub precipitation: PrecipitationPolicy,
}

impl Default for HatPolicy {
    fn default() -> Self {
        Self {
            cold_below_f: COLD_THRESHOLD_F,
            precipitation: PrecipitationPolicy::default(),
        }
    }
}

impl HatPolicy {
    pub fn is_cold(&self, observation: &WeatherObservation) -> bool {
        observation.feels_like_f < self.cold_below_f
    }

    pub fn is_precipitating(&self, observation: &WeatherObservation) -> bool {
        match self.precipitation {
            PrecipitationPolicy::RainOnly => observation.rain,
            PrecipitationPolicy::RainOrSnow => observation.rain || observation.snow,
        }
    }

    pub fn needs_hat(&self, observation: &WeatherObservation) -> bool {
        self.is_cold(observation) || self.is_precipitating(observation)
    }

    pub fn recommend(&self, observation: WeatherObservation) -> HatRecommendation {
        HatRecommendation {
            needs_hat: self.needs_hat(&observation),
            is_cold: self.is_cold(&observation),
            feels_like: observation.feels_like_f.round() as i64,
            observation,
        }
    }
}

/// Hat decision under the default policy.
pub fn needs_hat(observation: &WeatherObservation) -> bool {
    HatPolicy::default().needs_hat(observation)
}
