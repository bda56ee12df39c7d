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

use intersection_planning::motion::TIMED_STATE_TIME_AXIS;
use intersection_planning::obstacles::{TrajectorySample, VehicleDims};
use intersection_planning::planning::rrt_star_non_holonomic;
use intersection_planning::{
    DynamicObstacles, ObstacleMap, PlanResult, PlannerConfig, PlanningProblem, Region, State,
};
use log::{info, warn};
use plotly::common::{Fill, Line, Marker, Mode};
use plotly::layout::Axis;
use plotly::{Layout, Plot, Scatter};
use std::env;
use std::error::Error;
use std::f64::consts::{FRAC_PI_2, PI};
use std::path::Path;

// Intersection geometry, meters and seconds
const SPACE_DIMS: (f64, f64) = (100.0, 100.0);
const T_MAX: f64 = 60.0;
const CAR_DIMS: (f64, f64) = (4.0, 2.0);

// Allowed deviation from the exit heading in a target region
const TARGET_OFFSET: f64 = PI / 6.0;

// Heading vector components are unit, padded so that exactly +-1 is inside
const HEADING_MIN: f64 = -1.01;
const HEADING_MAX: f64 = 1.01;

const START: [f64; 5] = [55.0, 20.0, 0.0, 1.0, 0.0];

// Planar rectangle spanning every heading and the whole time range
fn full_region(x: f64, y: f64, width: f64, height: f64) -> Region<5> {
    Region::from_bounds(
        [x, y, HEADING_MIN, HEADING_MIN, 0.0],
        [x + width, y + height, HEADING_MAX, HEADING_MAX, T_MAX],
    )
}

// Range of cos and sin over headings within `offset` of `heading`
fn heading_window(heading: f64, offset: f64) -> ([f64; 2], [f64; 2]) {
    let (lo, hi) = (heading - offset, heading + offset);
    let mut cos = [lo.cos().min(hi.cos()), lo.cos().max(hi.cos())];
    let mut sin = [lo.sin().min(hi.sin()), lo.sin().max(hi.sin())];

    // The extremes are reached inside the window when it contains a multiple of pi/2
    for k in -4_i32..=4 {
        let angle = f64::from(k) * FRAC_PI_2;
        if lo <= angle && angle <= hi {
            match k.rem_euclid(4) {
                0 => cos[1] = 1.0,
                1 => sin[1] = 1.0,
                2 => cos[0] = -1.0,
                _ => sin[0] = -1.0,
            }
        }
    }
    (cos, sin)
}

fn target_region(x: f64, y: f64, width: f64, height: f64, heading: f64) -> Region<5> {
    let pad = HEADING_MAX - 1.0;
    let ([hx_lo, hx_hi], [hy_lo, hy_hi]) = heading_window(heading, TARGET_OFFSET);
    Region::from_bounds(
        [x, y, hx_lo - pad, hy_lo - pad, 0.0],
        [x + width, y + height, hx_hi + pad, hy_hi + pad, T_MAX],
    )
}

fn target(turn: &str) -> Option<Region<5>> {
    match turn {
        "left" => Some(target_region(30.0, 51.0, 10.0, 14.0, PI)),
        "right" => Some(target_region(60.0, 35.0, 10.0, 14.0, 0.0)),
        "straight" => Some(target_region(50.0, 65.0, 10.0, 10.0, FRAC_PI_2)),
        _ => None,
    }
}

fn curbs() -> Vec<(&'static str, Region<5>)> {
    vec![
        ("left_bottom_curb", full_region(0.0, 0.0, 40.0, 35.0)),
        ("right_bottom_curb", full_region(60.0, 0.0, 40.0, 35.0)),
        ("left_divider", full_region(0.0, 49.0, 40.0, 2.0)),
        ("right_divider", full_region(60.0, 49.0, 40.0, 2.0)),
        ("left_top_curb", full_region(0.0, 65.0, 40.0, 35.0)),
        ("right_top_curb", full_region(60.0, 65.0, 40.0, 35.0)),
    ]
}

// Oncoming and crossing lanes the vehicle may not enter
fn lane_restrictions() -> Vec<(&'static str, Region<5>)> {
    vec![
        ("wrong_lane_1", full_region(40.0, 0.0, 10.0, 35.0)),
        ("wrong_lane_2", full_region(0.0, 35.0, 40.0, 14.0)),
        ("wrong_lane_3", full_region(60.0, 51.0, 40.0, 14.0)),
        ("wrong_lane_4", full_region(40.0, 65.0, 10.0, 35.0)),
    ]
}

// Constant velocity car sampled every 0.1 s
fn straight_car(x: f64, y: f64, heading_deg: f64, speed: f64) -> Vec<TrajectorySample> {
    let (dx, dy) = (heading_deg.to_radians().cos(), heading_deg.to_radians().sin());
    (0..=200)
        .map(|k| {
            let t = f64::from(k) / 10.0;
            TrajectorySample::new(x + dx * speed * t, y + dy * speed * t, heading_deg, t)
        })
        .collect()
}

fn crossing_cars() -> Vec<Vec<TrajectorySample>> {
    vec![
        // Westbound through the top half
        straight_car(100.0, 57.0, 180.0, 8.0),
        // Eastbound through the bottom half
        straight_car(0.0, 42.0, 0.0, 6.0),
        // Southbound, oncoming
        straight_car(45.0, 100.0, 270.0, 5.0),
    ]
}

fn load_config(path: &Path) -> PlannerConfig {
    match PlannerConfig::load(path) {
        Ok(config) => config,
        Err(e) => {
            warn!("Using default configuration: {e}");
            PlannerConfig::default()
        }
    }
}

fn rect_trace(region: &Region<5>, color: &'static str, fill: bool) -> Box<Scatter<f64, f64>> {
    let (x0, y0) = (region.origin[0], region.origin[1]);
    let (x1, y1) = (region.upper(0), region.upper(1));
    let trace = Scatter::new(vec![x0, x1, x1, x0, x0], vec![y0, y0, y1, y1, y0])
        .mode(Mode::Lines)
        .line(Line::new().color(color));
    if fill {
        trace.fill(Fill::ToSelf).fill_color(color)
    } else {
        trace
    }
}

/// Visualize the grown tree and, if any, the returned path
fn visualize(
    obstacles: &ObstacleMap<5>,
    restrictions: &[&str],
    target: &Region<5>,
    result: &PlanResult<5>,
    turn: &str,
) {
    let mut plot = Plot::new();

    for (name, region) in obstacles.fixed() {
        let color = if restrictions.contains(&name) { "lightgray" } else { "gray" };
        plot.add_trace(rect_trace(region, color, true));
    }
    plot.add_trace(rect_trace(target, "green", false));

    // Moving obstacles halfway through their recordings
    for footprint in obstacles.dynamic().at(6.0) {
        let (x0, y0) = (footprint.origin[0], footprint.origin[1]);
        let (x1, y1) = (footprint.upper(0), footprint.upper(1));
        let trace = Scatter::new(vec![x0, x1, x1, x0, x0], vec![y0, y0, y1, y1, y0])
            .fill(Fill::ToSelf)
            .fill_color("red")
            .line(Line::new().color("red"));
        plot.add_trace(trace);
    }

    // Plot tree
    for state in result.tree.iter_depth_first() {
        if let Some(parent) = result.tree.get_parent(state) {
            let trace = Scatter::new(vec![state.x(), parent.x()], vec![state.y(), parent.y()])
                .mode(Mode::Lines)
                .line(Line::new().color("blue").width(0.5));
            plot.add_trace(trace);
        }
    }

    // Plot path
    if let Some(path) = result.path() {
        let (x, y): (Vec<_>, Vec<_>) = path.iter().map(|s| (s.x(), s.y())).unzip();
        plot.add_trace(
            Scatter::new(x, y)
                .mode(Mode::Lines)
                .line(Line::new().color("black").width(3.0)),
        );
    }

    let start = result.tree.root();
    plot.add_trace(
        Scatter::new(vec![start.x()], vec![start.y()])
            .mode(Mode::Markers)
            .marker(Marker::new().color("green").size(12)),
    );

    let layout = Layout::new()
        .title(format!("Kinodynamic RRT*, {turn} turn").as_str().into())
        .show_legend(false)
        .width(750)
        .height(750)
        .x_axis(Axis::new().title("X".into()).range(vec![0.0, SPACE_DIMS.0]))
        .y_axis(Axis::new().title("Y".into()).range(vec![0.0, SPACE_DIMS.1]));

    plot.set_layout(layout);
    plot.show();
}

pub fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().collect();
    if args.len() > 3 {
        eprintln!("Usage: intersection [left|right|straight] [config.yaml]");
        return Ok(());
    }
    let turn = args.get(1).map_or("left", String::as_str);
    let Some(target) = target(turn) else {
        eprintln!("Unknown turn '{turn}', expected left, right or straight");
        return Ok(());
    };
    let config = load_config(Path::new(args.get(2).map_or("configs/planner.yaml", String::as_str)));

    let cars = crossing_cars();
    let dynamic = DynamicObstacles::from_trajectories(
        cars.iter().map(Vec::as_slice),
        VehicleDims::new(CAR_DIMS.0, CAR_DIMS.1),
        config.time_decimals,
    );
    let mut obstacles = ObstacleMap::new().with_dynamic(dynamic);
    let restrictions = lane_restrictions();
    for (name, region) in curbs().into_iter().chain(restrictions.iter().copied()) {
        obstacles.insert_fixed(name, region);
    }
    let restriction_names: Vec<&str> = restrictions.iter().map(|(name, _)| *name).collect();

    let space = Region::from_bounds(
        [0.0, 0.0, HEADING_MIN, HEADING_MIN, 0.0],
        [SPACE_DIMS.0, SPACE_DIMS.1, HEADING_MAX, HEADING_MAX, T_MAX],
    );
    let problem = PlanningProblem::new(space, State::new(START), target, &obstacles)
        .with_time_axis(TIMED_STATE_TIME_AXIS);

    info!("Planning a {turn} turn with {} samples", config.sample_budget);
    let mut rng = config.rng();
    let result = rrt_star_non_holonomic(&problem, &config, &mut rng)?;

    match result.terminal {
        Some(end) => {
            let path = result.path().unwrap_or_default();
            info!("Total travel time: {:.1} s", end.get(TIMED_STATE_TIME_AXIS));
            info!("Path length: {:.2} m over {} states", result.cost().unwrap_or(0.0), path.len());
        }
        None => info!("Target not reached"),
    }

    visualize(&obstacles, &restriction_names, &target, &result, turn);
    Ok(())
}
