/// Development mode utilities.
///
/// When no AccuWeather key is available, a simulated reading source keeps
/// the full evaluation loop exercisable end to end: mostly light drizzle,
/// with an occasional storm hour so triggers actually fire during manual
/// testing. Enabled with `[weather] simulated = true` in the config.

use rand::Rng;

use crate::engine::ReadingSource;

/// Synthetic hourly rainfall generator.
pub struct SimulatedSource {
    /// Probability that a given hour is a storm, in [0, 1].
    pub storm_probability: f64,
    /// Upper bound of storm rainfall in millimeters.
    pub storm_max_mm: f64,
    /// Upper bound of ordinary-hour rainfall in millimeters.
    pub drizzle_max_mm: f64,
}

impl SimulatedSource {
    pub fn new() -> SimulatedSource {
        SimulatedSource {
            storm_probability: 0.05,
            storm_max_mm: 20.0,
            drizzle_max_mm: 2.0,
        }
    }
}

impl Default for SimulatedSource {
    fn default() -> SimulatedSource {
        SimulatedSource::new()
    }
}

impl ReadingSource for SimulatedSource {
    fn resolve_location(&self, lat: f64, lon: f64) -> String {
        format!("MOCK_{}_{}", lat.floor(), lon.floor())
    }

    fn hourly_rainfall(&self, _location_key: Option<&str>) -> f64 {
        let mut rng = rand::thread_rng();
        let amount = if rng.gen_bool(self.storm_probability) {
            rng.gen_range(0.0..self.storm_max_mm)
        } else {
            rng.gen_range(0.0..self.drizzle_max_mm)
        };
        // One-decimal readings, like the live provider reports them.
        (amount * 10.0).round() / 10.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_location_key_format() {
        let source = SimulatedSource::new();
        assert_eq!(source.resolve_location(40.7128, -74.006), "MOCK_40_-75");
    }

    #[test]
    fn test_simulated_readings_stay_in_range() {
        let source = SimulatedSource::new();
        for _ in 0..200 {
            let mm = source.hourly_rainfall(Some("MOCK_0_0"));
            assert!(mm >= 0.0, "rainfall must be non-negative, got {}", mm);
            assert!(mm <= source.storm_max_mm, "rainfall above storm bound: {}", mm);
        }
    }

    #[test]
    fn test_readings_have_one_decimal_resolution() {
        let source = SimulatedSource::new();
        for _ in 0..50 {
            let mm = source.hourly_rainfall(None);
            let scaled = mm * 10.0;
            assert!((scaled - scaled.round()).abs() < 1e-9);
        }
    }
}
