//! Environmental condition snapshots and stress classification.

use crate::config::AdaptationConfig;
use serde::{Deserialize, Serialize};

/// Environmental readings supplied by the grow-room simulation
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentalConditions {
    /// Air temperature (°C)
    pub temperature: f32,
    /// Relative humidity (%)
    pub humidity: f32,
    /// Light intensity (PPFD, µmol/m²/s)
    pub light_intensity: f32,
    /// CO₂ concentration (ppm)
    pub co2: f32,
}

impl Default for EnvironmentalConditions {
    fn default() -> Self {
        Self {
            temperature: 24.0,
            humidity: 55.0,
            light_intensity: 800.0,
            co2: 400.0,
        }
    }
}

/// Environmental stress kinds
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stressor {
    Heat,
    Cold,
    HighLight,
    Drought,
    HighHumidity,
}

impl Stressor {
    /// Epigenetic mark key this stressor accumulates into
    pub fn mark_key(&self) -> &'static str {
        match self {
            Stressor::Heat => "heat_stress",
            Stressor::Cold => "cold_stress",
            Stressor::HighLight => "light_stress",
            Stressor::Drought => "drought_stress",
            Stressor::HighHumidity => "humidity_stress",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Stressor::Heat => "Heat",
            Stressor::Cold => "Cold",
            Stressor::HighLight => "High Light",
            Stressor::Drought => "Drought",
            Stressor::HighHumidity => "High Humidity",
        }
    }
}

/// Quantized conditions; two snapshots in the same bucket share adaptation progress
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConditionsBucket {
    pub temperature: i32,
    pub humidity: i32,
    pub light: i32,
    pub co2: i32,
}

/// Per-stressor severity in [0, 1]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StressLevels {
    pub heat: f32,
    pub cold: f32,
    pub light: f32,
    pub drought: f32,
    pub humidity: f32,
}

impl EnvironmentalConditions {
    pub fn new(temperature: f32, humidity: f32, light_intensity: f32, co2: f32) -> Self {
        Self {
            temperature,
            humidity,
            light_intensity,
            co2,
        }
    }

    /// Stressors present, in a fixed order
    pub fn stressors(&self, config: &AdaptationConfig) -> Vec<Stressor> {
        let mut stressors = Vec::new();
        if self.temperature > config.max_temperature {
            stressors.push(Stressor::Heat);
        }
        if self.temperature < config.min_temperature {
            stressors.push(Stressor::Cold);
        }
        if self.light_intensity > config.max_light {
            stressors.push(Stressor::HighLight);
        }
        if self.humidity < config.min_humidity {
            stressors.push(Stressor::Drought);
        }
        if self.humidity > config.max_humidity {
            stressors.push(Stressor::HighHumidity);
        }
        stressors
    }

    /// Stressors that feed the epigenetic pass (temperature band and light only)
    pub fn epigenetic_stressors(&self, config: &AdaptationConfig) -> Vec<Stressor> {
        self.stressors(config)
            .into_iter()
            .filter(|s| matches!(s, Stressor::Heat | Stressor::Cold | Stressor::HighLight))
            .collect()
    }

    /// Severity of each stressor, scaled by distance past its threshold
    pub fn stress_levels(&self, config: &AdaptationConfig) -> StressLevels {
        let over = |value: f32, limit: f32, span: f32| ((value - limit) / span).clamp(0.0, 1.0);
        StressLevels {
            heat: over(self.temperature, config.max_temperature, 10.0),
            cold: over(config.min_temperature, self.temperature, 10.0),
            light: over(self.light_intensity, config.max_light, 800.0),
            drought: over(config.min_humidity, self.humidity, 30.0),
            humidity: over(self.humidity, config.max_humidity, 30.0),
        }
    }

    pub fn bucket(&self, config: &AdaptationConfig) -> ConditionsBucket {
        let q = |value: f32, width: f32| (value / width).floor() as i32;
        ConditionsBucket {
            temperature: q(self.temperature, config.temperature_bucket),
            humidity: q(self.humidity, config.humidity_bucket),
            light: q(self.light_intensity, config.light_bucket),
            co2: q(self.co2, config.co2_bucket),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_unstressed() {
        let config = AdaptationConfig::default();
        let conditions = EnvironmentalConditions::default();
        assert!(conditions.stressors(&config).is_empty());
        assert_eq!(conditions.stress_levels(&config), StressLevels::default());
    }

    #[test]
    fn test_heat_and_light_stress() {
        let config = AdaptationConfig::default();
        let conditions = EnvironmentalConditions::new(35.0, 55.0, 1500.0, 400.0);
        assert_eq!(
            conditions.stressors(&config),
            vec![Stressor::Heat, Stressor::HighLight]
        );

        let levels = conditions.stress_levels(&config);
        assert!((levels.heat - 0.5).abs() < 1e-5);
        assert!(levels.light > 0.0);
        assert_eq!(levels.cold, 0.0);
    }

    #[test]
    fn test_epigenetic_stressors_ignore_humidity() {
        let config = AdaptationConfig::default();
        let conditions = EnvironmentalConditions::new(15.0, 10.0, 500.0, 400.0);
        assert_eq!(conditions.stressors(&config), vec![Stressor::Cold, Stressor::Drought]);
        assert_eq!(conditions.epigenetic_stressors(&config), vec![Stressor::Cold]);
    }

    #[test]
    fn test_bucket_groups_nearby_conditions() {
        let config = AdaptationConfig::default();
        let a = EnvironmentalConditions::new(31.0, 52.0, 1250.0, 420.0);
        let b = EnvironmentalConditions::new(33.5, 58.0, 1390.0, 590.0);
        let c = EnvironmentalConditions::new(36.0, 58.0, 1390.0, 590.0);
        assert_eq!(a.bucket(&config), b.bucket(&config));
        assert_ne!(a.bucket(&config), c.bucket(&config));
    }
}
