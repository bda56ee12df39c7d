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

use codspeed_criterion_compat::{criterion_group, criterion_main, Criterion};
use intersection_planning::motion::TIMED_STATE_TIME_AXIS;
use intersection_planning::obstacles::{TrajectorySample, VehicleDims};
use intersection_planning::planning::{rrt_holonomic, rrt_star_holonomic, rrt_star_non_holonomic};
use intersection_planning::{
    DynamicObstacles, ObstacleMap, PlannerConfig, PlanningProblem, Region, State,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn grid_problem(obstacles: &ObstacleMap<2>) -> PlanningProblem<'_, 2> {
    PlanningProblem::new(
        Region::new([0.0, 0.0], [50.0, 50.0]),
        State::new([1.0, 1.0]),
        Region::new([48.0, 48.0], [2.0, 2.0]),
        obstacles,
    )
}

fn grid_obstacles() -> ObstacleMap<2> {
    ObstacleMap::new()
        .with_fixed("block_1", Region::from_bounds([10.0, 10.0], [30.0, 30.0]))
        .with_fixed("block_2", Region::from_bounds([35.0, 5.0], [40.0, 45.0]))
}

fn config(sample_budget: usize, find_optimal: bool) -> PlannerConfig {
    PlannerConfig {
        sample_budget,
        d_threshold: 1.0,
        find_optimal,
        ..Default::default()
    }
}

fn bench_rrt(c: &mut Criterion) {
    let obstacles = grid_obstacles();
    let problem = grid_problem(&obstacles);
    let config = config(20_000, false);
    let mut rng = StdRng::seed_from_u64(1);
    c.bench_function("rrt", |b| {
        b.iter(|| rrt_holonomic(&problem, &config, &mut rng).unwrap())
    });
}

fn bench_rrtstar(c: &mut Criterion) {
    let obstacles = grid_obstacles();
    let problem = grid_problem(&obstacles);
    let config = config(2000, true);
    let mut rng = StdRng::seed_from_u64(1);
    c.bench_function("rrtstar", |b| {
        b.iter(|| rrt_star_holonomic(&problem, &config, &mut rng).unwrap())
    });
}

fn bench_kinodynamic_rrtstar(c: &mut Criterion) {
    let car: Vec<TrajectorySample> = (0..=200)
        .map(|k| {
            let t = f64::from(k) / 10.0;
            TrajectorySample::new(2.0 * t, 25.0, 0.0, t)
        })
        .collect();
    let dynamic = DynamicObstacles::from_trajectories([car.as_slice()], VehicleDims::new(4.0, 2.0), 1);
    let obstacles = ObstacleMap::new().with_dynamic(dynamic);
    let problem = PlanningProblem::new(
        Region::from_bounds([0.0, 0.0, -1.01, -1.01, 0.0], [50.0, 50.0, 1.01, 1.01, 60.0]),
        State::new([25.0, 5.0, 0.0, 1.0, 0.0]),
        Region::from_bounds([0.0, 40.0, -1.01, -1.01, 0.0], [50.0, 50.0, 1.01, 1.01, 60.0]),
        &obstacles,
    )
    .with_time_axis(TIMED_STATE_TIME_AXIS);
    let config = PlannerConfig {
        sample_budget: 1000,
        d_threshold: 3.0,
        ..Default::default()
    };
    let mut rng = StdRng::seed_from_u64(1);
    c.bench_function("kinodynamic_rrtstar", |b| {
        b.iter(|| rrt_star_non_holonomic(&problem, &config, &mut rng).unwrap())
    });
}

criterion_group!(benches, bench_rrt, bench_rrtstar, bench_kinodynamic_rrtstar);
criterion_main!(benches);
