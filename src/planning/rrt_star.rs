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

//! RRT*, the asymptotically optimal variant.
//!
//! Every accepted state is attached to the cheapest collision free neighbor within a
//! shrinking radius, and then offered as a cheaper parent to those same neighbors. The
//! tree keeps each node's cost-to-come current through these rewires, so the target
//! check reads costs directly.
//!
//! Ties keep the first candidate seen: the expansion node, then neighbors in the order
//! they were added to the tree.

use crate::collision::CollisionChecker;
use crate::config::PlannerConfig;
use crate::error::{PlanningError, Result, TreeError};
use crate::geometry::{free_volume, unit_ball_volume, State};
use crate::motion::{BicycleSteering, Maneuver, Steer, Unconstrained, TIMED_STATE_TIME_AXIS};
use crate::planning::{extend_tree, forward_in_time, PlanResult, PlanningProblem};
use crate::tree::{Distance, Tree};
use log::{debug, info, trace};
use rand::Rng;

/// Constant controlling how fast the neighbor radius shrinks.
#[allow(clippy::cast_precision_loss)]
pub fn gamma(dim: usize, free_volume: f64) -> f64 {
    let d = dim as f64;
    1.0 + 2.0_f64.powf(d) * (1.0 + 1.0 / d) * free_volume
}

/// Neighbor search radius at the 0-based sample index `i`, capped at `d_threshold`.
///
/// Zero for the first sample, since `ln(1) = 0`.
#[allow(clippy::cast_precision_loss)]
pub fn search_radius(i: usize, gamma: f64, dim: usize, d_threshold: f64) -> f64 {
    let n = (i + 1) as f64;
    let radius = (gamma / unit_ball_volume(dim) * n.ln() / n).powf(1.0 / dim as f64);
    radius.min(d_threshold)
}

/// Picks the parent of `new_state` minimizing cost-to-come plus distance.
///
/// Starts from the expansion node `nearest`, which is already known to connect, and
/// moves to a neighbor only when it is strictly cheaper and the edge is collision free.
/// Neighbor edges are straight connections.
fn choose_parent<const N: usize>(
    tree: &Tree<State<N>, Maneuver>,
    checker: &CollisionChecker<N>,
    new_state: &State<N>,
    nearest: State<N>,
    maneuver: Maneuver,
    near: &[(State<N>, f64)],
) -> Result<(State<N>, f64, Maneuver)> {
    let mut parent = nearest;
    let mut weight = nearest.distance(new_state);
    let mut best = tree.cost(&nearest).ok_or(TreeError::MissingNode)? + weight;
    let mut edge = maneuver;

    for (candidate, distance) in near {
        if *candidate == nearest || !forward_in_time(candidate, new_state, checker.time_axis()) {
            continue;
        }
        let cost = tree.cost(candidate).ok_or(TreeError::MissingNode)? + distance;
        if cost < best && checker.is_collision_free(candidate, new_state) {
            parent = *candidate;
            weight = *distance;
            best = cost;
            edge = Maneuver::Direct;
        }
    }
    Ok((parent, weight, edge))
}

/// Reparents neighbors under `new_state` when that shortens their path from the root.
///
/// Costs are read from the tree on every comparison, since each rewire updates the
/// whole subtree below the rewired neighbor.
fn rewire_tree<const N: usize>(
    tree: &mut Tree<State<N>, Maneuver>,
    checker: &CollisionChecker<N>,
    new_state: &State<N>,
    near: &[(State<N>, f64)],
) -> Result<()> {
    let new_cost = tree.cost(new_state).ok_or(TreeError::MissingNode)?;
    for (neighbor, distance) in near {
        if !forward_in_time(new_state, neighbor, checker.time_axis()) {
            continue;
        }
        let old_cost = tree.cost(neighbor).ok_or(TreeError::MissingNode)?;
        if new_cost + distance < old_cost && checker.is_collision_free(new_state, neighbor) {
            match tree.set_parent(neighbor, new_state, *distance, Maneuver::Direct) {
                Ok(()) => trace!("[RRT*] rewired {neighbor} through {new_state}"),
                // The root and our own ancestors stay where they are
                Err(TreeError::RootNode | TreeError::CycleDetected) => {}
                Err(e) => return Err(e.into()),
            }
        }
    }
    Ok(())
}

/// Implementation of the RRT* planning algorithm.
///
/// Same sampling and validation as [`crate::planning::rrt`], followed for every
/// accepted state by:
///
/// - a neighbor search of radius [`search_radius`], whose constant [`gamma`] comes from
///   the state dimension and the obstacle-free volume of the space,
/// - choose-parent among the neighbors and the expansion node,
/// - rewiring of the neighbors through the new state,
/// - the target check against the maintained cost-to-come.
///
/// With a time axis set on the problem, parents must precede their children in time.
///
/// # Errors
///
/// [`PlanningError::InvalidConfiguration`] if the problem or the configuration is
/// invalid. Nothing is sampled in that case.
pub fn rrt_star<S, R, const N: usize>(
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
    let mut terminal: Option<State<N>> = None;

    let free = free_volume(&problem.space, problem.obstacles.fixed_regions());
    let gamma = gamma(N, free);
    info!(
        "[RRT*] planning from {} with {} samples, free volume {free:.3}, gamma {gamma:.3}",
        problem.start, config.sample_budget
    );

    for i in 0..config.sample_budget {
        let Some((new_state, nearest, maneuver)) = extend_tree(&tree, problem, steering, &checker, rng) else {
            continue;
        };
        if tree.contains(&new_state) {
            trace!("[RRT*] {new_state} is already in the tree");
            continue;
        }

        let radius = search_radius(i, gamma, N, config.d_threshold);
        let near = tree.nearest_neighbors(&new_state, radius);

        let (parent, weight, edge) = choose_parent(&tree, &checker, &new_state, nearest, maneuver, &near)?;
        tree.add_child(&parent, new_state, weight, edge)?;
        rewire_tree(&mut tree, &checker, &new_state, &near)?;

        if !problem.target.contains(&new_state) {
            continue;
        }
        let cost = tree.cost(&new_state).ok_or(TreeError::MissingNode)?;
        let improved = match terminal.and_then(|best| tree.cost(&best)) {
            Some(best) => cost < best,
            None => true,
        };
        if improved {
            debug!("[RRT*] target reached at sample {i} with cost {cost:.3}");
            terminal = Some(new_state);
        }
        if !config.find_optimal {
            break;
        }
    }

    match terminal.and_then(|state| tree.cost(&state).map(|cost| (state, cost))) {
        Some((state, cost)) => info!(
            "[RRT*] reached {state} with cost {cost:.3}, tree size {}",
            tree.size()
        ),
        None => info!("[RRT*] target not reached, tree size {}", tree.size()),
    }
    PlanResult::new(tree, terminal, steering.records_controls())
}

/// RRT* with straight-line extensions of at most `config.d_threshold`.
///
/// # Errors
///
/// See [`rrt_star`].
pub fn rrt_star_holonomic<R, const N: usize>(
    problem: &PlanningProblem<N>,
    config: &PlannerConfig,
    rng: &mut R,
) -> Result<PlanResult<N>>
where
    R: Rng + ?Sized,
{
    rrt_star(problem, &Unconstrained::new(config.d_threshold), config, rng)
}

/// Kinodynamic RRT* over `(x, y, heading_x, heading_y, t)` states.
///
/// Successors come from the bicycle model, time advancing by `config.dt` per step, and
/// every edge is checked against the moving obstacles at its interpolated time. The
/// result carries one maneuver per path edge: the sampled control, or
/// [`Maneuver::Direct`] where choose-parent or rewiring made a straight connection.
///
/// `Direct` edges interpolate position, heading and time linearly and ignore the
/// bicycle model, so no control reproduces them. A path containing one is collision
/// free but not drivable as is; replaying the controls only rebuilds the path up to the
/// first `Direct` edge.
///
/// # Errors
///
/// [`PlanningError::InvalidConfiguration`] if the problem has no time axis at index 4,
/// if the moving obstacles were rounded with a different number of decimals than
/// `config.time_decimals`, or for any reason listed on [`rrt_star`].
pub fn rrt_star_non_holonomic<R>(
    problem: &PlanningProblem<5>,
    config: &PlannerConfig,
    rng: &mut R,
) -> Result<PlanResult<5>>
where
    R: Rng + ?Sized,
{
    if problem.time_axis != Some(TIMED_STATE_TIME_AXIS) {
        return Err(PlanningError::InvalidConfiguration(format!(
            "timed states need their time axis at index {TIMED_STATE_TIME_AXIS}"
        )));
    }
    let dynamic = problem.obstacles.dynamic();
    if !dynamic.is_empty() && dynamic.decimals() != config.time_decimals {
        return Err(PlanningError::InvalidConfiguration(format!(
            "moving obstacles are rounded to {} decimals, expected {}",
            dynamic.decimals(),
            config.time_decimals
        )));
    }

    // The control sampler needs valid ranges
    config.validate()?;
    let steering = BicycleSteering::from_config(config);
    rrt_star(problem, &steering, config, rng)
}

//
// Unit tests
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Region;
    use crate::obstacles::ObstacleMap;
    use float_cmp::approx_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn line(x: f64) -> State<2> {
        State::new([x, 0.0])
    }

    #[test]
    fn test_gamma_and_radius() {
        assert!(approx_eq!(f64, gamma(2, 100.0), 1.0 + 4.0 * 1.5 * 100.0, ulps = 2));

        // First sample has no neighbors
        assert_eq!(search_radius(0, 601.0, 2, 0.5), 0.0);

        // Capped early, shrinking late
        assert!(approx_eq!(f64, search_radius(1, 601.0, 2, 0.5), 0.5, ulps = 2));
        let late = search_radius(10_000_000, 601.0, 2, 100.0);
        let later = search_radius(100_000_000, 601.0, 2, 100.0);
        assert!(later < late && late < 0.5);
    }

    #[test]
    fn test_rewire_tree() {
        // Tree is: 2 -> 4 -> 1
        let mut tree: Tree<State<2>, Maneuver> = Tree::new(line(2.0));
        tree.add_child(&line(2.0), line(4.0), 2.0, Maneuver::Direct).unwrap();
        tree.add_child(&line(4.0), line(1.0), 3.0, Maneuver::Direct).unwrap();
        let obstacles = ObstacleMap::new();
        let checker = CollisionChecker::new(&obstacles, 0.1, None);

        assert_eq!(tree.get_parent(&line(4.0)), Some(&line(2.0)));
        assert_eq!(tree.get_parent(&line(1.0)), Some(&line(4.0)));
        assert_eq!(tree.cost(&line(1.0)), Some(5.0));

        // When we rewire at 2, 1 should be reparented
        // 2 -> 1
        //   -> 4
        let near = tree.nearest_neighbors(&line(2.0), 5.0);
        rewire_tree(&mut tree, &checker, &line(2.0), &near).unwrap();
        assert_eq!(tree.get_parent(&line(4.0)), Some(&line(2.0)));
        assert_eq!(tree.get_parent(&line(1.0)), Some(&line(2.0)));
        assert_eq!(tree.cost(&line(1.0)), Some(1.0));
    }

    #[test]
    fn test_rewire_respects_obstacles() {
        let mut tree: Tree<State<2>, Maneuver> = Tree::new(line(2.0));
        tree.add_child(&line(2.0), line(4.0), 2.0, Maneuver::Direct).unwrap();
        tree.add_child(&line(4.0), line(1.0), 3.0, Maneuver::Direct).unwrap();
        let obstacles = ObstacleMap::new().with_fixed("post", Region::new([1.4, -1.0], [0.2, 2.0]));
        let checker = CollisionChecker::new(&obstacles, 0.1, None);

        let near = tree.nearest_neighbors(&line(2.0), 5.0);
        rewire_tree(&mut tree, &checker, &line(2.0), &near).unwrap();
        assert_eq!(tree.get_parent(&line(1.0)), Some(&line(4.0)));
        assert_eq!(tree.cost(&line(1.0)), Some(5.0));
    }

    #[test]
    fn test_choose_parent_prefers_cheaper_neighbor() {
        // 0 -> 1 -> (1, 3), and a direct 0 -> 2.5
        let mut tree: Tree<State<2>, Maneuver> = Tree::new(line(0.0));
        tree.add_child(&line(0.0), line(1.0), 1.0, Maneuver::Direct).unwrap();
        tree.add_child(&line(1.0), State::new([1.0, 3.0]), 3.0, Maneuver::Direct).unwrap();
        tree.add_child(&line(0.0), line(2.5), 2.5, Maneuver::Direct).unwrap();
        let obstacles = ObstacleMap::new();
        let checker = CollisionChecker::new(&obstacles, 0.1, None);

        // The root is out of range
        let new_state = State::new([2.0, 2.0]);
        let expansion = State::new([1.0, 3.0]);
        let near = tree.nearest_neighbors(&new_state, 2.5);
        assert_eq!(near.len(), 3);
        let (parent, weight, edge) = choose_parent(
            &tree,
            &checker,
            &new_state,
            expansion,
            Maneuver::Steered(crate::motion::Control::new(1.0, 0.0)),
            &near,
        )
        .unwrap();

        // Through 1: 1 + sqrt(5) ~ 3.24, through 2.5: 2.5 + sqrt(4.25) ~ 4.56,
        // from the expansion node: 4 + sqrt(2) ~ 5.41
        assert_eq!(parent, line(1.0));
        assert!(approx_eq!(f64, weight, 5.0_f64.sqrt(), ulps = 2));
        assert_eq!(edge, Maneuver::Direct);
    }

    #[test]
    fn test_choose_parent_falls_back_to_expansion_node() {
        let tree: Tree<State<2>, Maneuver> = Tree::new(line(0.0));
        let obstacles = ObstacleMap::new();
        let checker = CollisionChecker::new(&obstacles, 0.1, None);
        let new_state = line(0.5);
        let maneuver = Maneuver::Steered(crate::motion::Control::new(1.0, 0.0));

        let (parent, weight, edge) = choose_parent(&tree, &checker, &new_state, line(0.0), maneuver, &[]).unwrap();
        assert_eq!(parent, line(0.0));
        assert!(approx_eq!(f64, weight, 0.5, ulps = 2));
        assert_eq!(edge, maneuver);
    }

    #[test]
    fn test_timed_connections_move_forward() {
        let obstacles = ObstacleMap::new();
        let checker = CollisionChecker::new(&obstacles, 0.1, Some(4));
        let start = State::new([0.0, 0.0, 1.0, 0.0, 0.0]);
        let mut tree: Tree<State<5>, Maneuver> = Tree::new(start);

        // Cheap to reach but in the new state's future, so it cannot be its parent
        let future = State::new([1.0, 0.0, 1.0, 0.0, 3.0]);
        tree.add_child(&start, future, 0.5, Maneuver::Direct).unwrap();
        let new_state = State::new([1.5, 0.0, 1.0, 0.0, 2.0]);
        let near = tree.nearest_neighbors(&new_state, 5.0);
        let (parent, _, _) = choose_parent(&tree, &checker, &new_state, start, Maneuver::Direct, &near).unwrap();
        assert_eq!(parent, start);

        // Expensive to reach but in the past, so it cannot move under the new state
        let past = State::new([2.0, 0.0, 1.0, 0.0, 1.0]);
        tree.add_child(&start, past, 10.0, Maneuver::Direct).unwrap();
        tree.add_child(&start, new_state, 1.5, Maneuver::Direct).unwrap();
        let near = tree.nearest_neighbors(&new_state, 5.0);
        rewire_tree(&mut tree, &checker, &new_state, &near).unwrap();
        assert_eq!(tree.get_parent(&past), Some(&start));
        assert_eq!(tree.get_parent(&future), Some(&start));

        // The same position later in time can
        let later = State::new([2.0, 0.0, 1.0, 0.0, 4.0]);
        tree.add_child(&start, later, 10.0, Maneuver::Direct).unwrap();
        let near = tree.nearest_neighbors(&new_state, 5.0);
        rewire_tree(&mut tree, &checker, &new_state, &near).unwrap();
        assert_eq!(tree.get_parent(&later), Some(&new_state));
        assert_eq!(tree.cost(&later), Some(2.0));
        assert_eq!(tree.get_parent(&past), Some(&start));
    }

    #[test]
    fn test_rrt_star_costs_match_path_lengths() {
        let obstacles = ObstacleMap::new().with_fixed("block", Region::new([3.0, 3.0], [4.0, 4.0]));
        let problem = PlanningProblem::new(
            Region::new([0.0, 0.0], [10.0, 10.0]),
            State::new([0.0, 0.0]),
            Region::new([9.0, 9.0], [1.0, 1.0]),
            &obstacles,
        );
        let config = PlannerConfig {
            sample_budget: 500,
            d_threshold: 1.5,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(8);

        let result = rrt_star_holonomic(&problem, &config, &mut rng).unwrap();
        for node in result.tree.nodes() {
            let cost = result.tree.cost(node).unwrap();
            assert_eq!(Ok(cost), result.tree.shortest_path_length(node));
        }
    }

    #[test]
    fn test_rrt_star_non_holonomic_requires_time_axis() {
        let obstacles = ObstacleMap::new();
        let problem = PlanningProblem::new(
            Region::new([0.0, 0.0, -1.01, -1.01, 0.0], [20.0, 20.0, 2.02, 2.02, 100.0]),
            State::new([10.0, 10.0, 0.0, 1.0, 0.0]),
            Region::new([0.0, 18.0, -1.01, -1.01, 0.0], [20.0, 2.0, 2.02, 2.02, 100.0]),
            &obstacles,
        );
        let config = PlannerConfig::default();
        let mut rng = StdRng::seed_from_u64(8);

        assert!(matches!(
            rrt_star_non_holonomic(&problem, &config, &mut rng),
            Err(PlanningError::InvalidConfiguration(_))
        ));
        assert!(rrt_star_non_holonomic(&problem.with_time_axis(TIMED_STATE_TIME_AXIS), &config, &mut rng).is_ok());
    }

    #[test]
    fn test_kinodynamic_controls_replay_until_first_direct_edge() {
        let obstacles = ObstacleMap::new();
        let problem = PlanningProblem::new(
            Region::new([0.0, 0.0, -1.01, -1.01, 0.0], [20.0, 20.0, 2.02, 2.02, 100.0]),
            State::new([10.0, 5.0, 0.0, 1.0, 0.0]),
            Region::new([0.0, 12.0, -1.01, -1.01, 0.0], [20.0, 8.0, 2.02, 2.02, 100.0]),
            &obstacles,
        )
        .with_time_axis(TIMED_STATE_TIME_AXIS);
        let config = PlannerConfig {
            sample_budget: 800,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(6);
        let result = rrt_star_non_holonomic(&problem, &config, &mut rng).unwrap();
        let model = crate::motion::BicycleModel::new(config.vehicle.wheelbase);

        // Only steered edges come from the model
        for node in result.tree.nodes() {
            let Some(parent) = result.tree.get_parent(node) else {
                continue;
            };
            match result.tree.edge(node).unwrap() {
                Maneuver::Steered(control) => assert_eq!(model.step_timed(parent, control, config.dt), *node),
                Maneuver::Direct => {}
            }
        }

        if let (Some(path), Some(controls)) = (result.path(), result.controls.as_ref()) {
            let mut state = path[0];
            for (next, maneuver) in path[1..].iter().zip(controls) {
                let Some(control) = maneuver.control() else {
                    break;
                };
                state = model.step_timed(&state, &control, config.dt);
                assert_eq!(state, *next);
            }
        }
    }
}
