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

//! RRT and RRT* planners.
//!
//! Both engines share the same expansion step: pick the tree node nearest to a random
//! sample, steer from it, and keep the successor only if it lies inside the space, is
//! strictly later in time than its parent on timed states, and the connecting edge is
//! collision free. Rejected samples are dropped silently; only
//! an invalid problem or configuration is reported as an error, before any sampling.

pub mod rrt;
pub mod rrt_star;

pub use rrt::{rrt, rrt_holonomic, rrt_non_holonomic};
pub use rrt_star::{rrt_star, rrt_star_holonomic, rrt_star_non_holonomic};

use crate::collision::CollisionChecker;
use crate::config::PlannerConfig;
use crate::error::{PlanningError, Result};
use crate::geometry::{Region, State, SPATIAL_DIMS};
use crate::motion::{Maneuver, Steer};
use crate::obstacles::ObstacleMap;
use crate::sampling::select_node_to_expand;
use crate::tree::Tree;
use log::trace;
use rand::Rng;

/// Everything a planner needs to know about the scenario.
#[derive(Debug, Clone, Copy)]
pub struct PlanningProblem<'a, const N: usize> {
    /// Bounds of the state space, samples outside are discarded
    pub space: Region<N>,
    pub start: State<N>,
    /// Any state inside this region ends a path
    pub target: Region<N>,
    /// Fixed obstacles, lane restrictions and moving obstacle footprints
    pub obstacles: &'a ObstacleMap<N>,
    /// State coordinate holding time, enables moving obstacle checks
    pub time_axis: Option<usize>,
}

impl<'a, const N: usize> PlanningProblem<'a, N> {
    pub fn new(space: Region<N>, start: State<N>, target: Region<N>, obstacles: &'a ObstacleMap<N>) -> Self {
        PlanningProblem {
            space,
            start,
            target,
            obstacles,
            time_axis: None,
        }
    }

    #[must_use]
    pub fn with_time_axis(mut self, axis: usize) -> Self {
        self.time_axis = Some(axis);
        self
    }

    /// Checks the problem and the configuration before planning starts.
    ///
    /// # Errors
    ///
    /// [`PlanningError::InvalidConfiguration`] if the state has fewer than two axes, a
    /// region is malformed, the time axis is out of range or planar, the start is not
    /// finite or lies outside the space, or the configuration itself is invalid.
    pub fn validate(&self, config: &PlannerConfig) -> Result<()> {
        config.validate()?;
        if N < SPATIAL_DIMS {
            return Err(PlanningError::InvalidConfiguration(format!(
                "states need at least {SPATIAL_DIMS} dimensions, got {N}"
            )));
        }
        self.space.validate("space region")?;
        self.target.validate("target region")?;
        self.obstacles.validate()?;

        if let Some(axis) = self.time_axis {
            if !(SPATIAL_DIMS..N).contains(&axis) {
                return Err(PlanningError::InvalidConfiguration(format!(
                    "time axis {axis} must be in {SPATIAL_DIMS}..{N}"
                )));
            }
        }
        if !self.start.is_finite() || !self.space.contains(&self.start) {
            return Err(PlanningError::InvalidConfiguration(format!(
                "starting state {} lies outside the space region",
                self.start
            )));
        }
        Ok(())
    }

    pub fn checker(&self, granularity: f64) -> CollisionChecker<'a, N> {
        CollisionChecker::new(self.obstacles, granularity, self.time_axis)
    }
}

/// Outcome of a planning run.
#[derive(Debug)]
pub struct PlanResult<const N: usize> {
    /// The grown tree, returned even when the target was not reached
    pub tree: Tree<State<N>, Maneuver>,
    /// Cheapest (or first) state found inside the target region
    pub terminal: Option<State<N>>,
    /// One maneuver per edge of the returned path, for the non-holonomic variants
    pub controls: Option<Vec<Maneuver>>,
}

impl<const N: usize> PlanResult<N> {
    fn new(tree: Tree<State<N>, Maneuver>, terminal: Option<State<N>>, record_controls: bool) -> Result<Self> {
        let controls = match terminal {
            Some(end) if record_controls => Some(tree.edges_to(&end)?),
            _ => None,
        };
        Ok(PlanResult {
            tree,
            terminal,
            controls,
        })
    }

    pub fn reached(&self) -> bool {
        self.terminal.is_some()
    }

    /// States from the start to the terminal state.
    pub fn path(&self) -> Option<Vec<State<N>>> {
        self.terminal.and_then(|end| self.tree.path(&end).ok())
    }

    /// Cost-to-come of the terminal state.
    pub fn cost(&self) -> Option<f64> {
        self.terminal.and_then(|end| self.tree.cost(&end))
    }
}

// Whether an edge from `from` to `to` moves forward in time, always true for untimed states.
pub(crate) fn forward_in_time<const N: usize>(from: &State<N>, to: &State<N>, time_axis: Option<usize>) -> bool {
    time_axis.map_or(true, |axis| from.get(axis) < to.get(axis))
}

/// Samples, steers and validates one candidate successor.
///
/// Returns the new state, the node it was grown from and the maneuver used, or None if
/// the candidate left the space, went back in time or collided.
pub(crate) fn extend_tree<S, R, const N: usize>(
    tree: &Tree<State<N>, Maneuver>,
    problem: &PlanningProblem<N>,
    steering: &S,
    checker: &CollisionChecker<N>,
    rng: &mut R,
) -> Option<(State<N>, State<N>, Maneuver)>
where
    S: Steer<N>,
    R: Rng + ?Sized,
{
    // Sample, grab the nearest node, and extend in that direction
    let (nearest, sample) = select_node_to_expand(tree, &problem.space, rng);
    let (new_state, maneuver) = steering.steer(&nearest, &sample, rng);

    if !problem.space.contains(&new_state) {
        trace!("[Planner] {new_state} is out of bounds");
        return None;
    }
    if !forward_in_time(&nearest, &new_state, checker.time_axis()) {
        trace!("[Planner] {nearest} -> {new_state} does not move forward in time");
        return None;
    }
    if !checker.is_collision_free(&nearest, &new_state) {
        trace!("[Planner] edge {nearest} -> {new_state} collides");
        return None;
    }
    Some((new_state, nearest, maneuver))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Region<2> {
        Region::new([0.0, 0.0], [10.0, 10.0])
    }

    #[test]
    fn test_problem_validation() {
        let obstacles = ObstacleMap::new();
        let config = PlannerConfig::default();
        let target = Region::new([9.0, 9.0], [1.0, 1.0]);

        let ok = PlanningProblem::new(square(), State::new([0.0, 0.0]), target, &obstacles);
        assert!(ok.validate(&config).is_ok());

        let outside = PlanningProblem::new(square(), State::new([10.0, 0.0]), target, &obstacles);
        assert!(outside.validate(&config).is_err());

        let flat = PlanningProblem::new(
            Region::new([0.0, 0.0], [10.0, 0.0]),
            State::new([0.0, 0.0]),
            target,
            &obstacles,
        );
        assert!(flat.validate(&config).is_err());

        let planar_time = ok.with_time_axis(1);
        assert!(planar_time.validate(&config).is_err());

        let no_budget = PlannerConfig {
            sample_budget: 0,
            ..Default::default()
        };
        assert!(matches!(
            ok.validate(&no_budget),
            Err(PlanningError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_problem_validation_rejects_bad_obstacles() {
        let obstacles = ObstacleMap::new().with_fixed("bad", Region::new([1.0, 1.0], [-1.0, 1.0]));
        let problem = PlanningProblem::new(
            square(),
            State::new([0.0, 0.0]),
            Region::new([9.0, 9.0], [1.0, 1.0]),
            &obstacles,
        );
        assert!(problem.validate(&PlannerConfig::default()).is_err());
    }

    #[test]
    fn test_one_dimensional_states_are_rejected() {
        let obstacles: ObstacleMap<1> = ObstacleMap::new();
        let problem = PlanningProblem::new(
            Region::new([0.0], [10.0]),
            State::new([0.0]),
            Region::new([9.0], [1.0]),
            &obstacles,
        );
        assert!(problem.validate(&PlannerConfig::default()).is_err());
    }
}
