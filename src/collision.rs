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

//! Space-time collision checking of tree edges.
//!
//! An edge is discretized into evenly spaced samples no further than `granularity`
//! apart (planar distance), both endpoints included. On timed states the samples are
//! also no further apart in time than one moving obstacle bucket, so every rounded
//! timestamp the edge spans is visited. Each sample is tested against the fixed regions
//! and, when the state carries a time coordinate, against the moving obstacle
//! footprints recorded at that sample's rounded time. A coarser granularity is faster
//! but can step over thin obstacles.

use crate::geometry::State;
use crate::motion::wrap_degrees;
use crate::obstacles::ObstacleMap;
use crate::tree::Distance;

/// Lazy sequence of states interpolated along an edge.
#[derive(Debug, Clone)]
pub struct EdgeSamples<const N: usize> {
    from: [f64; N],
    to: [f64; N],
    steps: usize,
    next: usize,
    heading_axis: Option<usize>,
}

impl<const N: usize> EdgeSamples<N> {
    /// Samples no further than `granularity` apart on the plane.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn new(from: &State<N>, to: &State<N>, granularity: f64) -> Self {
        let steps = (from.distance(to) / granularity).ceil().max(1.0) as usize;
        EdgeSamples::with_steps(from, to, steps)
    }

    /// Splits the edge into `steps` equal segments, at least one.
    pub fn with_steps(from: &State<N>, to: &State<N>, steps: usize) -> Self {
        EdgeSamples {
            from: from.coords(),
            to: to.coords(),
            steps: steps.max(1),
            next: 0,
            heading_axis: None,
        }
    }

    /// Interpolates `axis` as a heading in degrees, turning the short way around.
    #[must_use]
    pub fn with_heading_axis(mut self, axis: Option<usize>) -> Self {
        self.heading_axis = axis;
        self
    }

    pub fn steps(&self) -> usize {
        self.steps
    }
}

impl<const N: usize> Iterator for EdgeSamples<N> {
    type Item = State<N>;

    #[allow(clippy::cast_precision_loss)]
    fn next(&mut self) -> Option<Self::Item> {
        if self.next > self.steps {
            return None;
        }
        let i = self.next;
        self.next += 1;

        // Land exactly on the destination
        if i == self.steps {
            return Some(State::new(self.to));
        }
        let fraction = i as f64 / self.steps as f64;
        let mut coords = self.from;
        for (axis, (c, (a, b))) in coords.iter_mut().zip(self.from.iter().zip(self.to.iter())).enumerate() {
            *c = if self.heading_axis == Some(axis) {
                // Signed difference in [-180, 180)
                let delta = (b - a + 180.0).rem_euclid(360.0) - 180.0;
                wrap_degrees(a + delta * fraction)
            } else {
                a + (b - a) * fraction
            };
        }
        Some(State::new(coords))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.steps + 1).saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl<const N: usize> ExactSizeIterator for EdgeSamples<N> {}

/// Validates states and edges against an [`ObstacleMap`].
#[derive(Debug, Clone, Copy)]
pub struct CollisionChecker<'a, const N: usize> {
    obstacles: &'a ObstacleMap<N>,
    granularity: f64,
    time_axis: Option<usize>,
    heading_axis: Option<usize>,
}

impl<'a, const N: usize> CollisionChecker<'a, N> {
    /// `time_axis` is the state coordinate holding time, None if states are untimed.
    pub fn new(obstacles: &'a ObstacleMap<N>, granularity: f64, time_axis: Option<usize>) -> Self {
        CollisionChecker {
            obstacles,
            granularity,
            time_axis,
            heading_axis: None,
        }
    }

    /// Marks the state coordinate holding a heading in degrees, if any.
    #[must_use]
    pub fn with_heading_axis(mut self, axis: Option<usize>) -> Self {
        self.heading_axis = axis;
        self
    }

    pub fn granularity(&self) -> f64 {
        self.granularity
    }

    pub fn time_axis(&self) -> Option<usize> {
        self.time_axis
    }

    /// Whether a single state clears every fixed and moving obstacle.
    pub fn is_state_free(&self, state: &State<N>) -> bool {
        if self.obstacles.collides_fixed(state) {
            return false;
        }
        match self.time_axis {
            Some(axis) => !self.obstacles.collides_dynamic(state, state.get(axis)),
            None => true,
        }
    }

    /// The states tested along an edge.
    ///
    /// On timed states there are at least as many segments as moving obstacle buckets
    /// spanned, so an edge that barely moves is still checked at every rounded time.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn edge_samples(&self, source: &State<N>, destination: &State<N>) -> EdgeSamples<N> {
        let spatial = (source.distance(destination) / self.granularity).ceil();
        let temporal = self.time_axis.map_or(0.0, |axis| {
            let span = (destination.get(axis) - source.get(axis)).abs();
            (span * self.obstacles.dynamic().buckets_per_second()).ceil()
        });
        let steps = spatial.max(temporal).max(1.0) as usize;
        EdgeSamples::with_steps(source, destination, steps).with_heading_axis(self.heading_axis)
    }

    /// Whether every sample along the straight edge clears the obstacles.
    pub fn is_collision_free(&self, source: &State<N>, destination: &State<N>) -> bool {
        self.edge_samples(source, destination)
            .all(|state| self.is_state_free(&state))
    }
}

/// Edge check against `obstacles` at the given granularity, see [`CollisionChecker`].
pub fn is_collision_free<const N: usize>(
    source: &State<N>,
    destination: &State<N>,
    obstacles: &ObstacleMap<N>,
    granularity: f64,
    time_axis: Option<usize>,
) -> bool {
    CollisionChecker::new(obstacles, granularity, time_axis).is_collision_free(source, destination)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Region;
    use crate::motion::{BicycleModel, Control};
    use crate::obstacles::DynamicObstacles;
    use float_cmp::approx_eq;

    #[test]
    fn test_edge_samples_include_endpoints() {
        let from = State::new([0.0, 0.0]);
        let to = State::new([1.0, 0.0]);

        let samples: Vec<State<2>> = EdgeSamples::new(&from, &to, 0.25).collect();
        assert_eq!(samples.len(), 5);
        assert_eq!(samples[0], from);
        assert_eq!(samples[2], State::new([0.5, 0.0]));
        assert_eq!(samples[4], to);
    }

    #[test]
    fn test_edge_samples_never_exceed_granularity() {
        let from = State::new([0.0, 0.0]);
        let to = State::new([1.0, 1.0]);

        let samples: Vec<State<2>> = EdgeSamples::new(&from, &to, 0.3).collect();
        assert_eq!(samples.len(), EdgeSamples::new(&from, &to, 0.3).len());
        for pair in samples.windows(2) {
            assert!(pair[0].distance(&pair[1]) <= 0.3 + 1e-12);
        }
        assert_eq!(*samples.last().unwrap(), to);
    }

    #[test]
    fn test_edge_samples_interpolate_time() {
        // Same position, time still advances
        let from = State::new([2.0, 2.0, 0.0, 1.0, 0.0]);
        let to = State::new([2.0, 2.0, 0.0, 1.0, 0.5]);

        let samples: Vec<State<5>> = EdgeSamples::new(&from, &to, 0.1).collect();
        assert_eq!(samples.len(), 2);
        assert!(approx_eq!(f64, samples[1].get(4), 0.5, ulps = 2));
    }

    #[test]
    fn test_static_collision() {
        let obstacles = ObstacleMap::new().with_fixed("wall", Region::new([4.0, 0.0], [2.0, 10.0]));
        let checker = CollisionChecker::new(&obstacles, 0.1, None);

        assert!(checker.is_collision_free(&State::new([1.0, 1.0]), &State::new([3.9, 1.0])));
        assert!(!checker.is_collision_free(&State::new([3.5, 1.0]), &State::new([6.5, 1.0])));
        assert!(!checker.is_state_free(&State::new([5.0, 5.0])));

        // Endpoints are checked too
        assert!(!is_collision_free(
            &State::new([3.0, 1.0]),
            &State::new([4.0, 1.0]),
            &obstacles,
            10.0,
            None
        ));
    }

    #[test]
    fn test_coarse_granularity_can_step_over_thin_obstacles() {
        let obstacles = ObstacleMap::new().with_fixed("post", Region::new([4.9, 0.0], [0.2, 10.0]));
        let from = State::new([0.0, 1.0]);
        let to = State::new([10.0, 1.0]);

        assert!(!is_collision_free(&from, &to, &obstacles, 0.1, None));
        assert!(is_collision_free(&from, &to, &obstacles, 2.0, None));
    }

    #[test]
    fn test_dynamic_collision_uses_rounded_time() {
        let mut dynamic = DynamicObstacles::new(1);
        dynamic.insert(1.0, Region::new([4.0, 4.0], [2.0, 2.0]));
        let obstacles: ObstacleMap<5> = ObstacleMap::new().with_dynamic(dynamic);
        let checker = CollisionChecker::new(&obstacles, 0.1, Some(4));

        assert!(!checker.is_state_free(&State::new([5.0, 5.0, 0.0, 1.0, 1.0])));
        assert!(!checker.is_state_free(&State::new([5.0, 5.0, 0.0, 1.0, 1.04])));
        assert!(checker.is_state_free(&State::new([5.0, 5.0, 0.0, 1.0, 1.2])));
        assert!(checker.is_state_free(&State::new([8.0, 5.0, 0.0, 1.0, 1.0])));

        // Passing through the footprint before it is there
        assert!(checker.is_collision_free(
            &State::new([3.0, 5.0, 1.0, 0.0, 0.0]),
            &State::new([7.0, 5.0, 1.0, 0.0, 0.5])
        ));
        // Passing through while it is
        assert!(!checker.is_collision_free(
            &State::new([3.0, 5.0, 1.0, 0.0, 0.8]),
            &State::new([7.0, 5.0, 1.0, 0.0, 1.2])
        ));
    }

    #[test]
    fn test_standing_still_meets_passing_car() {
        // A car crosses (5, 5) at t = 0.2 only
        let mut dynamic = DynamicObstacles::new(1);
        dynamic.insert(0.2, Region::new([4.0, 4.0], [2.0, 2.0]));
        let obstacles: ObstacleMap<5> = ObstacleMap::new().with_dynamic(dynamic);
        let checker = CollisionChecker::new(&obstacles, 0.1, Some(4));

        let from = State::new([5.0, 5.0, 0.0, 1.0, 0.0]);
        let to = BicycleModel::new(2.5).step_timed(&from, &Control::new(0.0, 0.0), 0.5);
        assert_eq!(from.distance(&to), 0.0);
        assert!(checker.is_state_free(&from));
        assert!(checker.is_state_free(&to));

        // One sample per tenth of a second
        assert_eq!(checker.edge_samples(&from, &to).len(), 6);
        assert!(!checker.is_collision_free(&from, &to));

        // Later, the car is gone
        let later = State::new([5.0, 5.0, 0.0, 1.0, 0.3]);
        let after = BicycleModel::new(2.5).step_timed(&later, &Control::new(0.0, 0.0), 0.5);
        assert!(checker.is_collision_free(&later, &after));
    }

    #[test]
    fn test_heading_interpolates_the_short_way() {
        let from = State::new([0.0, 0.0, 350.0]);
        let to = State::new([0.0, 0.0, 10.0]);

        let headings: Vec<f64> = EdgeSamples::with_steps(&from, &to, 4)
            .with_heading_axis(Some(2))
            .map(|s| s.get(2))
            .collect();
        assert_eq!(headings.len(), 5);
        assert!(approx_eq!(f64, headings[1], 355.0, epsilon = 1e-9));
        assert!(approx_eq!(f64, headings[2], 0.0, epsilon = 1e-9));
        assert!(approx_eq!(f64, headings[3], 5.0, epsilon = 1e-9));
        assert_eq!(headings[4], 10.0);

        // A region only covering headings pointing west is never crossed by a small
        // left turn through north-east, unless the heading is treated as a plain number
        let obstacles = ObstacleMap::new().with_fixed("westbound", Region::new([-1.0, -1.0, 90.0], [3.0, 2.0, 180.0]));
        let (from, to) = (State::new([0.0, 0.0, 350.0]), State::new([1.0, 0.0, 10.0]));
        let checker = CollisionChecker::new(&obstacles, 0.1, None);
        assert!(checker.with_heading_axis(Some(2)).is_collision_free(&from, &to));
        assert!(!checker.is_collision_free(&from, &to));
    }

    #[test]
    fn test_untimed_checker_ignores_dynamic_obstacles() {
        let mut dynamic = DynamicObstacles::new(1);
        dynamic.insert(0.0, Region::new([4.0, 4.0], [2.0, 2.0]));
        let obstacles: ObstacleMap<2> = ObstacleMap::new().with_dynamic(dynamic);
        let checker = CollisionChecker::new(&obstacles, 0.1, None);

        assert!(checker.is_state_free(&State::new([5.0, 5.0])));
    }
}
