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

//! Sampling-based trajectory planning for a vehicle crossing a multi-lane intersection.
//!
//! The crate grows RRT and RRT* trees over axis-aligned state spaces, steering either
//! holonomically (straight-line extension) or through a bicycle model, and validates
//! every edge against static regions and time-indexed moving obstacle footprints.
//!
//! Scenario geometry is supplied by the caller as explicit [`geometry::Region`] and
//! [`geometry::State`] values; nothing scenario-specific lives in the planning core.

pub mod collision;
pub mod config;
pub mod error;
pub mod geometry;
pub mod motion;
pub mod obstacles;
pub mod planning;
pub mod sampling;
pub mod tree;

pub use config::{BicycleConfig, PlannerConfig};
pub use error::{ConfigError, PlanningError, Result, TreeError};
pub use geometry::{Region, State};
pub use motion::{Control, Maneuver};
pub use obstacles::{DynamicObstacles, ObstacleMap};
pub use planning::{PlanResult, PlanningProblem};
