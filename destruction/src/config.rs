//! Named tunables for the destruction subsystem.
//!
//! Every numeric knob lives on [`Tunables`]. Defaults come from
//! [`crate::constants`]; a TOML document may override any subset of them.
//!
//! Durations are written in milliseconds (fractions allowed):
//!
//! ```toml
//! cull_distance = 90.0
//! break_batch_size = 24
//! break_time_budget = 3.5
//! remove_timeout = 15000
//! ```

use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::constants::*;
use crate::error::ConfigError;

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Tunables {
    pub chunk_size: i32,
    pub cull_distance: f32,
    #[serde(deserialize_with = "millis")]
    pub fragment_active_duration: Duration,
    pub sleep_distance: f32,
    pub remove_distance: f32,
    pub remove_height: f32,
    #[serde(deserialize_with = "millis")]
    pub remove_timeout: Duration,
    pub break_batch_size: usize,
    #[serde(deserialize_with = "millis")]
    pub break_time_budget: Duration,
    pub impulse_batch_per_frame: usize,
    pub impulse_max_queue: usize,
    pub max_impulse_magnitude: f32,
    #[serde(deserialize_with = "millis")]
    pub max_impulse_delay: Duration,
    pub fragment_min_mass: f32,
    pub fragment_mass_per_cell: f32,
    pub fragment_linear_damping: f32,
    pub fragment_angular_damping: f32,
    pub max_physics_dt: f32,
    pub gravity: f32,
}

impl Default for Tunables {
    fn default() -> Self {
        Self {
            chunk_size: CHUNK_SIZE,
            cull_distance: CULL_DISTANCE,
            fragment_active_duration: FRAGMENT_ACTIVE_DURATION,
            sleep_distance: SLEEP_DISTANCE,
            remove_distance: REMOVE_DISTANCE,
            remove_height: REMOVE_HEIGHT,
            remove_timeout: REMOVE_TIMEOUT,
            break_batch_size: BREAK_BATCH_SIZE,
            break_time_budget: BREAK_TIME_BUDGET,
            impulse_batch_per_frame: IMPULSE_BATCH_PER_FRAME,
            impulse_max_queue: IMPULSE_MAX_QUEUE,
            max_impulse_magnitude: MAX_IMPULSE_MAGNITUDE,
            max_impulse_delay: MAX_IMPULSE_DELAY,
            fragment_min_mass: FRAGMENT_MIN_MASS,
            fragment_mass_per_cell: FRAGMENT_MASS_PER_CELL,
            fragment_linear_damping: FRAGMENT_LINEAR_DAMPING,
            fragment_angular_damping: FRAGMENT_ANGULAR_DAMPING,
            max_physics_dt: MAX_PHYSICS_DT,
            gravity: GRAVITY_MPS2,
        }
    }
}

impl Tunables {
    /// Parse a TOML document; unspecified keys keep their defaults.
    pub fn from_toml_str(src: &str) -> Result<Self, ConfigError> {
        let tunables: Tunables = toml::from_str(src)?;
        tunables.validate()?;
        Ok(tunables)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        fn positive(name: &'static str, v: f32) -> Result<(), ConfigError> {
            if v.is_finite() && v > 0.0 {
                Ok(())
            } else {
                Err(ConfigError::OutOfRange {
                    name,
                    reason: "must be a positive finite number",
                })
            }
        }

        if self.chunk_size <= 0 {
            return Err(ConfigError::OutOfRange {
                name: "chunk_size",
                reason: "must be at least 1",
            });
        }
        if self.break_batch_size == 0 {
            return Err(ConfigError::OutOfRange {
                name: "break_batch_size",
                reason: "must be at least 1",
            });
        }
        if self.impulse_max_queue == 0 {
            return Err(ConfigError::OutOfRange {
                name: "impulse_max_queue",
                reason: "must be at least 1",
            });
        }
        positive("cull_distance", self.cull_distance)?;
        positive("sleep_distance", self.sleep_distance)?;
        positive("remove_distance", self.remove_distance)?;
        positive("max_impulse_magnitude", self.max_impulse_magnitude)?;
        positive("fragment_min_mass", self.fragment_min_mass)?;
        positive("max_physics_dt", self.max_physics_dt)?;
        if !self.remove_height.is_finite() {
            return Err(ConfigError::OutOfRange {
                name: "remove_height",
                reason: "must be finite",
            });
        }

        if self.remove_timeout <= self.fragment_active_duration {
            log::warn!(
                "remove_timeout ({:?}) <= fragment_active_duration ({:?}); fragments will never go passive",
                self.remove_timeout,
                self.fragment_active_duration
            );
        }
        Ok(())
    }

    /// Mass of one debris fragment for a given cell size.
    #[inline]
    pub fn fragment_mass(&self, cell_size: f32) -> f32 {
        self.fragment_min_mass
            .max(cell_size * self.fragment_mass_per_cell)
    }
}

fn millis<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let ms = f64::deserialize(deserializer)?;
    if !ms.is_finite() || ms < 0.0 {
        return Err(serde::de::Error::custom(
            "duration must be a non-negative number of milliseconds",
        ));
    }
    Ok(Duration::from_secs_f64(ms / 1000.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let t = Tunables::from_toml_str("").unwrap();
        assert_eq!(t, Tunables::default());
    }

    #[test]
    fn overrides_are_applied_in_milliseconds() {
        let t = Tunables::from_toml_str(
            r#"
            cull_distance = 90.0
            break_batch_size = 12
            break_time_budget = 2.5
            remove_timeout = 15000
            "#,
        )
        .unwrap();
        assert_eq!(t.cull_distance, 90.0);
        assert_eq!(t.break_batch_size, 12);
        assert_eq!(t.break_time_budget, Duration::from_micros(2500));
        assert_eq!(t.remove_timeout, Duration::from_secs(15));
        assert_eq!(t.sleep_distance, SLEEP_DISTANCE);
    }

    #[test]
    fn rejects_unknown_keys_and_bad_ranges() {
        assert!(matches!(
            Tunables::from_toml_str("cull_distanse = 1.0"),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            Tunables::from_toml_str("break_batch_size = 0"),
            Err(ConfigError::OutOfRange {
                name: "break_batch_size",
                ..
            })
        ));
        assert!(matches!(
            Tunables::from_toml_str("max_impulse_delay = -5"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn fragment_mass_has_a_floor() {
        let t = Tunables::default();
        assert_eq!(t.fragment_mass(0.2), FRAGMENT_MIN_MASS);
        assert_eq!(t.fragment_mass(2.0), 1.0);
    }
}
