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

//! Motion models proposing a successor state from an expansion root.
//!
//! Two strategies implement [`Steer`]:
//!
//! - [`Unconstrained`] moves straight toward the random sample, at most `d_threshold`.
//! - [`BicycleSteering`] draws a random control and integrates a kinematic bicycle for
//!   one step `dt`. It understands two state layouts:
//!   `(x, y, heading_deg)` and `(x, y, heading_x, heading_y, t)`.

use crate::config::{BicycleConfig, PlannerConfig};
use crate::geometry::State;
use crate::tree::Distance;
use rand::distributions::{Distribution, Uniform};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Index of the time coordinate in the `(x, y, heading_x, heading_y, t)` layout.
pub const TIMED_STATE_TIME_AXIS: usize = 4;

/// Index of the heading, in degrees, in the `(x, y, heading_deg)` layout.
pub const HEADING_DEG_AXIS: usize = 2;

/// Velocity and steering angle applied for one integration step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Control {
    pub velocity: f64,
    pub steering_deg: f64,
}

impl Control {
    pub fn new(velocity: f64, steering_deg: f64) -> Self {
        Control {
            velocity,
            steering_deg,
        }
    }
}

/// How the vehicle gets across one tree edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Maneuver {
    /// Produced by integrating this control.
    Steered(Control),
    /// A straight connection with no control behind it. The bicycle model cannot
    /// reproduce it in general.
    Direct,
}

impl Maneuver {
    pub fn control(&self) -> Option<Control> {
        match self {
            Maneuver::Steered(control) => Some(*control),
            Maneuver::Direct => None,
        }
    }
}

/// Uniform control distribution over the configured velocity and steering ranges.
#[derive(Debug, Clone)]
pub struct ControlSampler {
    velocity: Uniform<f64>,
    steering_deg: Uniform<f64>,
}

impl ControlSampler {
    /// # Panics
    ///
    /// If a range is empty or not finite, see [`BicycleConfig::validate`].
    pub fn new(config: &BicycleConfig) -> Self {
        let (v_min, v_max) = config.velocity_range;
        let (psi_min, psi_max) = config.steering_range_deg;
        ControlSampler {
            velocity: Uniform::new_inclusive(v_min, v_max),
            steering_deg: Uniform::new_inclusive(psi_min, psi_max),
        }
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Control {
        Control::new(self.velocity.sample(rng), self.steering_deg.sample(rng))
    }
}

/// Strategy producing a candidate successor for tree expansion.
pub trait Steer<const N: usize> {
    /// Proposes a successor of `from`. `toward` is the random sample whose nearest tree
    /// node is `from`.
    fn steer<R: Rng + ?Sized>(&self, from: &State<N>, toward: &State<N>, rng: &mut R) -> (State<N>, Maneuver);

    /// Whether the planner should report a control sequence for the returned path.
    fn records_controls(&self) -> bool {
        false
    }

    /// State coordinate holding a heading in degrees, which wraps around at 360.
    fn heading_axis(&self) -> Option<usize> {
        None
    }
}

/// Returns the point at most `d_threshold` from `from` on the straight line toward `toward`.
///
/// Every coordinate moves by the same fraction; the threshold is measured on the planar
/// distance.
pub fn extend_toward<const N: usize>(from: &State<N>, toward: &State<N>, d_threshold: f64) -> State<N> {
    let dist = from.distance(toward);
    if dist <= d_threshold {
        return *toward;
    }

    let scale = d_threshold / dist;
    let (start, end) = (from.coords(), toward.coords());
    let mut next = start;
    for (n, (s, e)) in next.iter_mut().zip(start.iter().zip(end.iter())) {
        *n = s + (e - s) * scale;
    }
    State::new(next)
}

/// Holonomic straight-line extension.
#[derive(Debug, Clone, Copy)]
pub struct Unconstrained {
    pub d_threshold: f64,
}

impl Unconstrained {
    pub fn new(d_threshold: f64) -> Self {
        Unconstrained { d_threshold }
    }
}

impl<const N: usize> Steer<N> for Unconstrained {
    fn steer<R: Rng + ?Sized>(&self, from: &State<N>, toward: &State<N>, _rng: &mut R) -> (State<N>, Maneuver) {
        (extend_toward(from, toward, self.d_threshold), Maneuver::Direct)
    }
}

/// Wraps an angle into `[0, 360)` degrees.
pub fn wrap_degrees(deg: f64) -> f64 {
    let wrapped = deg.rem_euclid(360.0);
    // rem_euclid rounds tiny negative inputs up to exactly 360
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Kinematic bicycle integrated with a single forward Euler step.
#[derive(Debug, Clone, Copy)]
pub struct BicycleModel {
    pub wheelbase: f64,
}

impl BicycleModel {
    pub fn new(wheelbase: f64) -> Self {
        BicycleModel { wheelbase }
    }

    // Heading change over one step, radians. Exactly zero for zero velocity or steering.
    fn heading_change(&self, control: &Control, dt: f64) -> f64 {
        control.velocity / self.wheelbase * control.steering_deg.to_radians().tan() * dt
    }

    /// Integrates `(x, y, heading_deg)` for one step.
    pub fn step(&self, state: &State<3>, control: &Control, dt: f64) -> State<3> {
        let [x, y, heading] = state.coords();
        let theta = heading.to_radians();
        State::new([
            x + control.velocity * theta.cos() * dt,
            y + control.velocity * theta.sin() * dt,
            wrap_degrees(heading + self.heading_change(control, dt).to_degrees()),
        ])
    }

    /// Integrates `(x, y, heading_x, heading_y, t)` for one step, advancing `t` by `dt`.
    pub fn step_timed(&self, state: &State<5>, control: &Control, dt: f64) -> State<5> {
        let [x, y, hx, hy, t] = state.coords();
        let theta = hy.atan2(hx);
        let change = self.heading_change(control, dt);
        let (next_hx, next_hy) = if change == 0.0 {
            (hx, hy)
        } else {
            let next = theta + change;
            (next.cos(), next.sin())
        };
        State::new([
            x + control.velocity * theta.cos() * dt,
            y + control.velocity * theta.sin() * dt,
            next_hx,
            next_hy,
            t + dt,
        ])
    }
}

/// Non-holonomic extension: a random control integrated for one step.
///
/// The random sample only picks which node to expand; the successor comes from the
/// control alone.
#[derive(Debug, Clone)]
pub struct BicycleSteering {
    pub model: BicycleModel,
    pub controls: ControlSampler,
    pub dt: f64,
}

impl BicycleSteering {
    pub fn new(model: BicycleModel, controls: ControlSampler, dt: f64) -> Self {
        BicycleSteering { model, controls, dt }
    }

    /// # Panics
    ///
    /// If the vehicle bounds are invalid, see [`PlannerConfig::validate`].
    pub fn from_config(config: &PlannerConfig) -> Self {
        BicycleSteering::new(
            BicycleModel::new(config.vehicle.wheelbase),
            ControlSampler::new(&config.vehicle),
            config.dt,
        )
    }
}

impl Steer<3> for BicycleSteering {
    fn steer<R: Rng + ?Sized>(&self, from: &State<3>, _toward: &State<3>, rng: &mut R) -> (State<3>, Maneuver) {
        let control = self.controls.sample(rng);
        (self.model.step(from, &control, self.dt), Maneuver::Steered(control))
    }

    fn records_controls(&self) -> bool {
        true
    }

    fn heading_axis(&self) -> Option<usize> {
        Some(HEADING_DEG_AXIS)
    }
}

impl Steer<5> for BicycleSteering {
    fn steer<R: Rng + ?Sized>(&self, from: &State<5>, _toward: &State<5>, rng: &mut R) -> (State<5>, Maneuver) {
        let control = self.controls.sample(rng);
        (self.model.step_timed(from, &control, self.dt), Maneuver::Steered(control))
    }

    fn records_controls(&self) -> bool {
        true
    }
}
