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

//! Random sampling of the state space and expansion node selection.

use crate::geometry::{Region, State};
use crate::tree::Tree;
use rand::Rng;

/// Draws a point uniformly from `region`, each axis independently.
pub fn random_point<R: Rng + ?Sized, const N: usize>(region: &Region<N>, rng: &mut R) -> State<N> {
    let mut coords = region.origin;
    for (c, extent) in coords.iter_mut().zip(region.extents.iter()) {
        *c += rng.gen::<f64>() * extent;
    }
    State::new(coords)
}

/// Samples a random point in `space` and returns the tree node nearest to it (the
/// expansion root) together with the point itself.
pub fn select_node_to_expand<R, E, const N: usize>(
    tree: &Tree<State<N>, E>,
    space: &Region<N>,
    rng: &mut R,
) -> (State<N>, State<N>)
where
    R: Rng + ?Sized,
{
    let sample = random_point(space, rng);
    (*tree.nearest_neighbor(&sample), sample)
}
