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

//! Geometry primitives shared by every planner variant.
//!
//! States and regions are const-generic over their dimensionality, so a region can only
//! ever be tested against a state of the same shape. The first [`SPATIAL_DIMS`] axes of
//! a state are always its planar position; distances are measured over those axes only.

use crate::error::{PlanningError, Result};
use crate::tree::Distance;
use ordered_float::OrderedFloat;
use std::f64::consts::PI;
use std::fmt;

/// Number of leading state axes that hold the planar position `(x, y)`.
pub const SPATIAL_DIMS: usize = 2;

/// A configuration in an `N`-dimensional state space.
///
/// Coordinates are wrapped in [`OrderedFloat`] so that states hash and compare by exact
/// value and can be used directly as tree keys.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
pub struct State<const N: usize>([OrderedFloat<f64>; N]);

impl<const N: usize> State<N> {
    pub fn new(coords: [f64; N]) -> Self {
        State(coords.map(OrderedFloat))
    }

    pub fn coords(&self) -> [f64; N] {
        self.0.map(OrderedFloat::into_inner)
    }

    /// Returns the coordinate on the given axis.
    ///
    /// # Panics
    ///
    /// If `axis >= N`.
    pub fn get(&self, axis: usize) -> f64 {
        self.0[axis].into_inner()
    }

    pub fn x(&self) -> f64 {
        self.get(0)
    }

    pub fn y(&self) -> f64 {
        self.get(1)
    }

    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|c| c.into_inner().is_finite())
    }
}

impl<const N: usize> From<[f64; N]> for State<N> {
    fn from(coords: [f64; N]) -> Self {
        State::new(coords)
    }
}

// Euclidean distance over the planar position
impl<const N: usize> Distance for State<N> {
    fn distance(&self, other: &Self) -> f64 {
        self.0
            .iter()
            .zip(other.0.iter())
            .take(SPATIAL_DIMS)
            .map(|(a, b)| (a.into_inner() - b.into_inner()).powi(2))
            .sum::<f64>()
            .sqrt()
    }
}

// Handy for debugging
impl<const N: usize> fmt::Display for State<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, c) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{:.2}", c.into_inner())?;
        }
        write!(f, ")")
    }
}

/// Planar distance between two states.
pub fn distance<const N: usize>(a: &State<N>, b: &State<N>) -> f64 {
    a.distance(b)
}

/// Axis-aligned hyper-rectangle `[origin_i, origin_i + extents_i)` on every axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region<const N: usize> {
    pub origin: [f64; N],
    pub extents: [f64; N],
}

impl<const N: usize> Region<N> {
    pub fn new(origin: [f64; N], extents: [f64; N]) -> Self {
        Region { origin, extents }
    }

    /// Builds a region from its lower (inclusive) and upper (exclusive) corners.
    pub fn from_bounds(lower: [f64; N], upper: [f64; N]) -> Self {
        let mut extents = [0.0; N];
        for (e, (l, u)) in extents.iter_mut().zip(lower.iter().zip(upper.iter())) {
            *e = u - l;
        }
        Region::new(lower, extents)
    }

    /// Exclusive upper bound on the given axis.
    pub fn upper(&self, axis: usize) -> f64 {
        self.origin[axis] + self.extents[axis]
    }

    pub fn contains(&self, state: &State<N>) -> bool {
        self.contains_coords(&state.coords())
    }

    pub fn contains_coords(&self, coords: &[f64; N]) -> bool {
        coords
            .iter()
            .enumerate()
            .all(|(i, &c)| self.origin[i] <= c && c < self.upper(i))
    }

    pub fn volume(&self) -> f64 {
        self.extents.iter().product()
    }

    /// Volume of the intersection of the two regions, zero if they are disjoint.
    pub fn overlap_volume(&self, other: &Region<N>) -> f64 {
        (0..N)
            .map(|i| {
                let low = self.origin[i].max(other.origin[i]);
                let high = self.upper(i).min(other.upper(i));
                (high - low).max(0.0)
            })
            .product()
    }

    /// Ensures every extent is strictly positive and every bound is finite.
    ///
    /// # Errors
    ///
    /// [`PlanningError::InvalidConfiguration`] naming `label` if the region is malformed.
    pub fn validate(&self, label: &str) -> Result<()> {
        if self.origin.iter().any(|o| !o.is_finite()) {
            return Err(PlanningError::InvalidConfiguration(format!(
                "{label} has a non-finite origin {:?}",
                self.origin
            )));
        }
        if self.extents.iter().any(|&e| !e.is_finite() || e <= 0.0) {
            return Err(PlanningError::InvalidConfiguration(format!(
                "{label} extents must be positive, got {:?}",
                self.extents
            )));
        }
        Ok(())
    }
}

/// Membership test, see [`Region::contains`].
pub fn contains<const N: usize>(region: &Region<N>, state: &State<N>) -> bool {
    region.contains(state)
}

/// Volume of the unit ball in `dim` dimensions.
#[allow(clippy::cast_precision_loss)]
pub fn unit_ball_volume(dim: usize) -> f64 {
    // V(d) = V(d - 2) * 2 * pi / d, seeded with V(0) = 1 and V(1) = 2
    let mut volume = if dim % 2 == 0 { 1.0 } else { 2.0 };
    let mut d = if dim % 2 == 0 { 2 } else { 3 };
    while d <= dim {
        volume *= 2.0 * PI / d as f64;
        d += 2;
    }
    volume
}

/// Estimate of the obstacle-free volume of `space`.
///
/// Subtracts the part of each obstacle that lies inside the space. Overlapping
/// obstacles are subtracted twice, so the estimate errs on the small side, and it is
/// clamped at zero.
pub fn free_volume<'a, const N: usize, I>(space: &Region<N>, obstacles: I) -> f64
where
    I: IntoIterator<Item = &'a Region<N>>,
{
    let occupied: f64 = obstacles
        .into_iter()
        .map(|obstacle| space.overlap_volume(obstacle))
        .sum();
    (space.volume() - occupied).max(0.0)
}
