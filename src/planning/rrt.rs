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

//! Baseline RRT.

use crate::config::PlannerConfig;
use crate::error::{Result, TreeError};
use crate::geometry::State;
use crate::motion::{BicycleSteering, Maneuver, Steer, Unconstrained};
use crate::planning::{extend_tree, PlanResult, PlanningProblem};
use crate::tree::{Distance, Tree};
use log::{debug, info, trace};
use rand::Rng;

/// Implementation of the RRT planning algorithm.
///
/// Grows a tree from `problem.start` for `config.sample_budget` samples. Every accepted
/// successor is attached to the node it was steered from with an edge weighted by the
/// planar distance between them.
///
/// A successor inside the target region becomes the terminal state. With
/// `config.find_optimal` unset the search stops at the first hit, otherwise it keeps
/// sampling and only replaces the terminal state with one of strictly smaller
/// cost-to-come.
///
/// # Parameters
///
/// - `problem`: Space, start, target and obstacles
/// - `steering`: Strategy proposing successors, see [`Steer`]
/// - `config`: Sample budget, collision granularity and early exit
/// - `rng`: Source of every random sample, seed it for reproducible trees
///
/// # Returns
///
/// The tree together with the terminal state, None if the target was never reached.
/// Controls are reported when the steering strategy records them.
///
/// # Errors
///
/// [`crate::PlanningError::InvalidConfiguration`] if the problem or the configuration is
/// invalid. Nothing is sampled in that case.
pub fn rrt<S, R, const N: usize>(
    problem: &PlanningProblem<N>,
    steering: &S,
    config: &PlannerConfig,
    rng: &mut R,
) -> Result<PlanResult<N>>
where
    S: Steer<N>,
    R: Rng + ?Sized,
{
    problem.validate(config)?;
    let checker = problem.checker(config.granularity).with_heading_axis(steering.heading_axis());
    let mut tree: Tree<State<N>, Maneuver> = Tree::new(problem.start);
    let mut terminal: Option<(State<N>, f64)> = None;

    info!(
        "[RRT] planning from {} with {} samples",
        problem.start, config.sample_budget
    );

    for i in 0..config.sample_budget {
        let Some((new_state, nearest, maneuver)) = extend_tree(&tree, problem, steering, &checker, rng) else {
            continue;
        };

        // Already in the tree, just try again
        match tree.add_child(&nearest, new_state, nearest.distance(&new_state), maneuver) {
            Ok(()) => {}
            Err(TreeError::DuplicateNode) => {
                trace!("[RRT] {new_state} is already in the tree");
                continue;
            }
            Err(e) => return Err(e.into()),
        }

        if !problem.target.contains(&new_state) {
            continue;
        }
        let cost = tree.shortest_path_length(&new_state)?;
        let improved = match terminal {
            Some((_, best)) => cost < best,
            None => true,
        };
        if improved {
            debug!("[RRT] target reached at sample {i} with cost {cost:.3}");
            terminal = Some((new_state, cost));
        }
        if !config.find_optimal {
            break;
        }
    }

    match terminal {
        Some((state, cost)) => info!(
            "[RRT] reached {state} with cost {cost:.3}, tree size {}",
            tree.size()
        ),
        None => info!("[RRT] target not reached, tree size {}", tree.size()),
    }
    PlanResult::new(tree, terminal.map(|(state, _)| state), steering.records_controls())
}

/// RRT with straight-line extensions of at most `config.d_threshold`.
///
/// # Errors
///
/// See [`rrt`].
pub fn rrt_holonomic<R, const N: usize>(
    problem: &PlanningProblem<N>,
    config: &PlannerConfig,
    rng: &mut R,
) -> Result<PlanResult<N>>
where
    R: Rng + ?Sized,
{
    rrt(problem, &Unconstrained::new(config.d_threshold), config, rng)
}

/// RRT over `(x, y, heading_deg)` states driven by the bicycle model.
///
/// Each edge is one `config.dt` step under a random control, and the returned result
/// carries the controls along the path.
///
/// # Errors
///
/// See [`rrt`].
pub fn rrt_non_holonomic<R>(problem: &PlanningProblem<3>, config: &PlannerConfig, rng: &mut R) -> Result<PlanResult<3>>
where
    R: Rng + ?Sized,
{
    // The control sampler needs valid ranges
    config.validate()?;
    let steering = BicycleSteering::from_config(config);
    rrt(problem, &steering, config, rng)
}

//
// Unit tests
//
