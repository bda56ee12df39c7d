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

//! Error types for intersection planning

use thiserror::Error;

/// Errors raised by [`crate::tree::Tree`] mutations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("the node is already in the tree")]
    DuplicateNode,

    #[error("the node is not present in the tree")]
    MissingNode,

    #[error("the root node has no parent")]
    RootNode,

    #[error("cannot attach a node beneath its own descendant")]
    CycleDetected,
}

/// Planner error type.
///
/// Per-sample rejections (out of bounds, collisions) never surface here, and neither
/// does an unreached target, which is reported as a missing terminal state.
#[derive(Error, Debug)]
pub enum PlanningError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Tree error: {0}")]
    Tree(#[from] TreeError),
}

/// Errors loading a [`crate::config::PlannerConfig`] from disk.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(String),

    #[error("Failed to parse config: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, PlanningError>;
