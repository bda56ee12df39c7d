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

//! Static and time-indexed obstacle maps.
//!
//! Fixed obstacles (curbs, dividers, lane restrictions) are full-dimensional regions in
//! the planning state space. Moving obstacles are planar footprints bucketed by their
//! timestamp rounded to a fixed number of decimals; lookups round the query time the
//! same way, so a sample only ever collides with footprints recorded at its own bucket.

use crate::error::Result;
use crate::geometry::{Region, State, SPATIAL_DIMS};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Planar region occupied by a moving obstacle at one timestamp.
pub type Footprint = Region<SPATIAL_DIMS>;

/// Default rounding resolution of obstacle timestamps.
pub const DEFAULT_TIME_DECIMALS: u32 = 1;

/// One recorded pose of a moving obstacle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrajectorySample {
    pub x: f64,
    pub y: f64,
    pub heading_deg: f64,
    pub t: f64,
}

impl TrajectorySample {
    pub fn new(x: f64, y: f64, heading_deg: f64, t: f64) -> Self {
        TrajectorySample {
            x,
            y,
            heading_deg,
            t,
        }
    }
}

/// Planar size of a vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VehicleDims {
    pub length: f64,
    pub width: f64,
}

impl VehicleDims {
    pub fn new(length: f64, width: f64) -> Self {
        VehicleDims { length, width }
    }

    /// Axis-aligned footprint centered on `(x, y)`.
    ///
    /// The long side lies along x when the heading is closer to horizontal, along y
    /// otherwise.
    pub fn footprint(&self, x: f64, y: f64, heading_deg: f64) -> Footprint {
        let heading = heading_deg.to_radians();
        let (dx, dy) = if heading.cos().abs() >= heading.sin().abs() {
            (self.length, self.width)
        } else {
            (self.width, self.length)
        };
        Region::new([x - dx / 2.0, y - dy / 2.0], [dx, dy])
    }
}

/// Moving obstacle footprints keyed by rounded timestamp.
#[derive(Debug, Clone)]
pub struct DynamicObstacles {
    decimals: u32,
    scale: f64,
    buckets: HashMap<i64, Vec<Footprint>>,
}

impl Default for DynamicObstacles {
    fn default() -> Self {
        DynamicObstacles::new(DEFAULT_TIME_DECIMALS)
    }
}

impl DynamicObstacles {
    /// Creates an empty map rounding timestamps to `decimals` decimal places.
    pub fn new(decimals: u32) -> Self {
        DynamicObstacles {
            decimals,
            scale: (0..decimals).fold(1.0, |scale, _| scale * 10.0),
            buckets: HashMap::new(),
        }
    }

    /// Buckets recorded trajectories into footprints of the given size.
    pub fn from_trajectories<'a, I>(trajectories: I, dims: VehicleDims, decimals: u32) -> Self
    where
        I: IntoIterator<Item = &'a [TrajectorySample]>,
    {
        let mut obstacles = DynamicObstacles::new(decimals);
        for trajectory in trajectories {
            for sample in trajectory {
                obstacles.insert(sample.t, dims.footprint(sample.x, sample.y, sample.heading_deg));
            }
        }
        obstacles
    }

    pub fn decimals(&self) -> u32 {
        self.decimals
    }

    /// Number of distinct bucket keys per second of time, `10^decimals`.
    pub fn buckets_per_second(&self) -> f64 {
        self.scale
    }

    /// Bucket key of a timestamp.
    #[allow(clippy::cast_possible_truncation)]
    pub fn time_key(&self, t: f64) -> i64 {
        (t * self.scale).round() as i64
    }

    pub fn insert(&mut self, t: f64, footprint: Footprint) {
        self.buckets
            .entry(self.time_key(t))
            .or_default()
            .push(footprint);
    }

    /// Footprints recorded in the same bucket as `t`, empty if none were.
    pub fn at(&self, t: f64) -> &[Footprint] {
        self.buckets
            .get(&self.time_key(t))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Whether the planar position `xy` lies inside any footprint recorded at `t`.
    pub fn collides(&self, xy: &[f64; SPATIAL_DIMS], t: f64) -> bool {
        self.at(t).iter().any(|footprint| footprint.contains_coords(xy))
    }

    /// Number of distinct timestamps.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// # Errors
    ///
    /// [`crate::PlanningError::InvalidConfiguration`] if any footprint is malformed.
    pub fn validate(&self) -> Result<()> {
        for (key, footprints) in &self.buckets {
            for footprint in footprints {
                footprint.validate(&format!("dynamic obstacle footprint at time key {key}"))?;
            }
        }
        Ok(())
    }
}

/// Every obstacle the planner checks edges against.
#[derive(Debug, Clone, Default)]
pub struct ObstacleMap<const N: usize> {
    fixed: BTreeMap<String, Region<N>>,
    dynamic: DynamicObstacles,
}

impl<const N: usize> ObstacleMap<N> {
    pub fn new() -> Self {
        ObstacleMap {
            fixed: BTreeMap::new(),
            dynamic: DynamicObstacles::default(),
        }
    }

    #[must_use]
    pub fn with_fixed(mut self, name: impl Into<String>, region: Region<N>) -> Self {
        self.insert_fixed(name, region);
        self
    }

    #[must_use]
    pub fn with_dynamic(mut self, dynamic: DynamicObstacles) -> Self {
        self.dynamic = dynamic;
        self
    }

    /// Adds a named fixed obstacle or lane restriction, returning any region it replaced.
    pub fn insert_fixed(&mut self, name: impl Into<String>, region: Region<N>) -> Option<Region<N>> {
        self.fixed.insert(name.into(), region)
    }

    /// Named fixed regions, ordered by name.
    pub fn fixed(&self) -> impl Iterator<Item = (&str, &Region<N>)> {
        self.fixed.iter().map(|(name, region)| (name.as_str(), region))
    }

    pub fn fixed_regions(&self) -> impl Iterator<Item = &Region<N>> {
        self.fixed.values()
    }

    pub fn dynamic(&self) -> &DynamicObstacles {
        &self.dynamic
    }

    /// Name of the first fixed region containing `state`, if any.
    pub fn blocking_fixed(&self, state: &State<N>) -> Option<&str> {
        self.fixed()
            .find(|(_, region)| region.contains(state))
            .map(|(name, _)| name)
    }

    pub fn collides_fixed(&self, state: &State<N>) -> bool {
        self.fixed.values().any(|region| region.contains(state))
    }

    /// Whether the planar position of `state` hits a moving obstacle at time `t`.
    pub fn collides_dynamic(&self, state: &State<N>, t: f64) -> bool {
        N >= SPATIAL_DIMS && self.dynamic.collides(&[state.x(), state.y()], t)
    }

    /// # Errors
    ///
    /// [`crate::PlanningError::InvalidConfiguration`] if any fixed region or footprint is
    /// malformed.
    pub fn validate(&self) -> Result<()> {
        for (name, region) in &self.fixed {
            region.validate(&format!("obstacle '{name}'"))?;
        }
        self.dynamic.validate()
    }
}
