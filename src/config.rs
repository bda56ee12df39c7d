// MIT License
//
// Copyright (c) 2024 Erik Holum
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

//! Planner configuration.
//!
//! Loaded from a YAML file; every field has a default so partial files are accepted.

use crate::error::{ConfigError, PlanningError, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::path::Path;

mod defaults {
    pub fn sample_budget() -> usize {
        1000
    }

    pub fn granularity() -> f64 {
        0.1
    }

    pub fn d_threshold() -> f64 {
        0.5
    }

    pub fn dt() -> f64 {
        0.5
    }

    pub fn enabled() -> bool {
        true
    }

    pub fn time_decimals() -> u32 {
        1
    }

    pub fn wheelbase() -> f64 {
        4.0
    }

    pub fn velocity_range() -> (f64, f64) {
        (0.0, 10.0)
    }

    pub fn steering_range_deg() -> (f64, f64) {
        (-30.0, 30.0)
    }
}

/// Sampling and steering parameters shared by every planner variant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Number of samples drawn before giving up
    #[serde(default = "defaults::sample_budget")]
    pub sample_budget: usize,

    /// Step used to discretize edges for collision checks, in spatial units.
    /// Smaller is safer and slower.
    #[serde(default = "defaults::granularity")]
    pub granularity: f64,

    /// Max length of a holonomic extension, also caps the RRT* neighbor radius
    #[serde(default = "defaults::d_threshold")]
    pub d_threshold: f64,

    /// Integration step of the bicycle model (seconds)
    #[serde(default = "defaults::dt")]
    pub dt: f64,

    /// Keep sampling after the first target hit and return the cheapest one
    #[serde(default = "defaults::enabled")]
    pub find_optimal: bool,

    /// Decimal places moving obstacle timestamps are rounded to
    #[serde(default = "defaults::time_decimals")]
    pub time_decimals: u32,

    /// RNG seed, entropy when absent
    #[serde(default)]
    pub seed: Option<u64>,

    #[serde(default)]
    pub vehicle: BicycleConfig,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            sample_budget: defaults::sample_budget(),
            granularity: defaults::granularity(),
            d_threshold: defaults::d_threshold(),
            dt: defaults::dt(),
            find_optimal: defaults::enabled(),
            time_decimals: defaults::time_decimals(),
            seed: None,
            vehicle: BicycleConfig::default(),
        }
    }
}

/// Bicycle model and control sampling bounds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BicycleConfig {
    /// Distance between the axles (meters)
    #[serde(default = "defaults::wheelbase")]
    pub wheelbase: f64,

    /// Inclusive (min, max) sampled velocity
    #[serde(default = "defaults::velocity_range")]
    pub velocity_range: (f64, f64),

    /// Inclusive (min, max) sampled steering angle (degrees)
    #[serde(default = "defaults::steering_range_deg")]
    pub steering_range_deg: (f64, f64),
}

impl Default for BicycleConfig {
    fn default() -> Self {
        Self {
            wheelbase: defaults::wheelbase(),
            velocity_range: defaults::velocity_range(),
            steering_range_deg: defaults::steering_range_deg(),
        }
    }
}

fn invalid(msg: String) -> PlanningError {
    PlanningError::InvalidConfiguration(msg)
}

fn check_positive(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(format!("{name} must be positive, got {value}")))
    }
}

fn check_range(name: &str, (low, high): (f64, f64)) -> Result<()> {
    if low.is_finite() && high.is_finite() && low <= high {
        Ok(())
    } else {
        Err(invalid(format!("{name} must be a finite (min, max) pair, got ({low}, {high})")))
    }
}

impl PlannerConfig {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    ///
    /// If the file cannot be read or parsed.
    pub fn load(path: &Path) -> std::result::Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_yaml(&contents)
    }

    /// Parse from YAML string
    ///
    /// # Errors
    ///
    /// If the YAML is malformed or a field has the wrong type.
    pub fn from_yaml(yaml: &str) -> std::result::Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Checks every parameter before any sampling begins.
    ///
    /// # Errors
    ///
    /// [`PlanningError::InvalidConfiguration`] on a zero sample budget, a non-positive
    /// step, or malformed vehicle bounds.
    pub fn validate(&self) -> Result<()> {
        if self.sample_budget == 0 {
            return Err(invalid("sample_budget must be positive".into()));
        }
        check_positive("granularity", self.granularity)?;
        check_positive("d_threshold", self.d_threshold)?;
        check_positive("dt", self.dt)?;
        self.vehicle.validate()
    }

    /// Random source for a planning run, reproducible when `seed` is set.
    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

impl BicycleConfig {
    /// # Errors
    ///
    /// [`PlanningError::InvalidConfiguration`] on a non-positive wheelbase or an empty
    /// control range.
    pub fn validate(&self) -> Result<()> {
        check_positive("wheelbase", self.wheelbase)?;
        check_range("velocity_range", self.velocity_range)?;
        check_range("steering_range_deg", self.steering_range_deg)
    }
}
