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

//! Planning tree storing states with weighted, annotated edges.
//! Types must implement a distance trait to enable determination of nearest neighbors.
use crate::error::TreeError;
use linked_hash_set::LinkedHashSet;
use std::collections::HashMap;
use std::hash::Hash;

/// Basic node element for the tree.
///
/// Must be used with [Tree] since parents and children are referenced by index in the
/// [Tree]'s node vector.
#[derive(Debug)]
struct Node<T, E> {
    // The value of this node.
    value: T,

    // Location of the nodes parent, None only for the root.
    parent: Option<usize>,

    // Locations of the children in the tree's node vector. Insertion ordered so that
    // traversals are deterministic, and removal on rewire is constant time.
    children: LinkedHashSet<usize>,

    // Weight of the edge from the parent.
    weight: f64,

    // Data recorded on the edge from the parent.
    edge: Option<E>,

    // Sum of edge weights along the path from the root.
    cost: f64,
}

impl<T, E> Node<T, E> {
    fn new(value: T, parent: Option<usize>, weight: f64, edge: Option<E>, cost: f64) -> Self {
        Node {
            value,
            parent,
            children: LinkedHashSet::new(),
            weight,
            edge,
            cost,
        }
    }
}

/// Define a distance trait for tree node values.
pub trait Distance {
    fn distance(&self, other: &Self) -> f64;
}

/// DFS Iterator for a [Tree]
pub struct DepthFirstIterator<'a, T, E>
where
    T: 'a + Eq + Clone + Distance + Hash,
{
    tree: &'a Tree<T, E>,
    stack: Vec<usize>,
}

impl<'a, T, E> DepthFirstIterator<'a, T, E>
where
    T: Eq + Clone + Distance + Hash,
{
    fn new(tree: &'a Tree<T, E>) -> Self {
        // Root is always idx 0
        DepthFirstIterator {
            tree,
            stack: vec![0],
        }
    }
}

impl<'a, T, E> Iterator for DepthFirstIterator<'a, T, E>
where
    T: Eq + Clone + Distance + Hash,
{
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        self.stack.pop().map(|index| {
            // Children should be pushed onto the stack in reverse order to ensure left-most
            // are processed first
            let children: Vec<usize> = self.tree.nodes[index].children.iter().copied().collect();
            self.stack.extend(children.into_iter().rev());
            &self.tree.nodes[index].value
        })
    }
}

/// Directed, weighted arborescence rooted at the start state.
///
/// Every node but the root has exactly one parent. Each edge carries a weight and an
/// arbitrary payload `E` (for instance the control that produced the child). The cost
/// of every node is kept equal to the sum of edge weights on its path from the root,
/// including across [`Tree::set_parent`] rewires.
/// Node values must be unique, and nodes are never removed.
#[derive(Debug)]
pub struct Tree<T, E = ()>
where
    T: Eq + Clone + Distance + Hash,
{
    // Detailed node data for the tree.
    nodes: Vec<Node<T, E>>,

    // Support constant time lookup of nodes data with a value - node index map.
    nodes_map: HashMap<T, usize>,
}

impl<T: Eq + Clone + Distance + Hash, E> Tree<T, E> {
    /// Construct a new tree with the specified value as the root node.
    ///
    /// The node will take ownership of the provided value.
    pub fn new(val: T) -> Self {
        let mut nodes_map = HashMap::new();
        nodes_map.insert(val.clone(), 0);

        Tree {
            nodes: vec![Node::new(val, None, 0.0, None, 0.0)],
            nodes_map,
        }
    }

    /// Adds the value to the specified node's children through an edge of the given
    /// weight.
    ///
    /// # Errors
    ///
    /// If the parent is not found in the tree.
    /// If the child is already in the tree.
    pub fn add_child(&mut self, parent: &T, child: T, weight: f64, edge: E) -> Result<(), TreeError> {
        // Cannot duplicate children
        if self.nodes_map.contains_key(&child) {
            return Err(TreeError::DuplicateNode);
        }
        let parent_idx = self.index(parent)?;

        // Append the child node to the nodes vector and note the location in the map.
        let child_idx = self.nodes.len();
        let cost = self.nodes[parent_idx].cost + weight;
        self.nodes.push(Node::new(
            child.clone(),
            Some(parent_idx),
            weight,
            Some(edge),
            cost,
        ));
        self.nodes_map.insert(child, child_idx);
        self.nodes[parent_idx].children.insert(child_idx);

        Ok(())
    }

    /// Removes the edge into `child` and attaches it beneath `parent` instead.
    ///
    /// The costs of `child` and of its entire subtree are updated. On error the tree is
    /// left untouched.
    ///
    /// # Errors
    ///
    /// If either node is not found in the tree.
    /// If `child` is the root.
    /// If `parent` is `child` or one of its descendants.
    pub fn set_parent(&mut self, child: &T, parent: &T, weight: f64, edge: E) -> Result<(), TreeError> {
        let child_idx = self.index(child)?;
        let parent_idx = self.index(parent)?;

        let Some(old_parent_idx) = self.nodes[child_idx].parent else {
            return Err(TreeError::RootNode);
        };

        // Walk up from the new parent, we must not meet the child on the way to the root
        let mut cur_idx = Some(parent_idx);
        while let Some(idx) = cur_idx {
            if idx == child_idx {
                return Err(TreeError::CycleDetected);
            }
            cur_idx = self.nodes[idx].parent;
        }

        self.nodes[old_parent_idx].children.remove(&child_idx);
        self.nodes[parent_idx].children.insert(child_idx);

        let node = &mut self.nodes[child_idx];
        node.parent = Some(parent_idx);
        node.weight = weight;
        node.edge = Some(edge);

        self.update_costs(child_idx);
        Ok(())
    }

    // Recomputes the cost of the node at `idx` and of everything below it from the
    // parents' costs.
    fn update_costs(&mut self, idx: usize) {
        let mut stack = vec![idx];
        while let Some(cur) = stack.pop() {
            if let Some(parent_idx) = self.nodes[cur].parent {
                self.nodes[cur].cost = self.nodes[parent_idx].cost + self.nodes[cur].weight;
            }
            stack.extend(self.nodes[cur].children.iter().copied());
        }
    }

    // Return the size of the tree
    pub fn size(&self) -> usize {
        self.nodes.len()
    }

    pub fn root(&self) -> &T {
        &self.nodes[0].value
    }

    pub fn contains(&self, val: &T) -> bool {
        self.nodes_map.contains_key(val)
    }

    /// Iterates over all node values in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &T> {
        self.nodes.iter().map(|node| &node.value)
    }

    /// Returns the predecessor of the specified node, None for the root or a missing node.
    pub fn get_parent(&self, val: &T) -> Option<&T> {
        self.get_node(val)
            .and_then(|node| node.parent)
            .map(|idx| &self.nodes[idx].value)
    }

    /// Returns the payload of the edge into the specified node.
    pub fn edge(&self, val: &T) -> Option<&E> {
        self.get_node(val).and_then(|node| node.edge.as_ref())
    }

    /// Returns the weight of the edge into the specified node, 0 for the root.
    pub fn weight(&self, val: &T) -> Option<f64> {
        self.get_node(val).map(|node| node.weight)
    }

    /// Returns the maintained cost-to-come of the specified node.
    pub fn cost(&self, val: &T) -> Option<f64> {
        self.get_node(val).map(|node| node.cost)
    }

    /// Recomputes the length of the unique path from the root to `end` by summing the
    /// edge weights from the root down.
    ///
    /// # Errors
    ///
    /// If the specified node is not found in the Tree
    pub fn shortest_path_length(&self, end: &T) -> Result<f64, TreeError> {
        let mut weights = Vec::new();
        let mut cur_idx = self.index(end)?;
        while let Some(parent_idx) = self.nodes[cur_idx].parent {
            weights.push(self.nodes[cur_idx].weight);
            cur_idx = parent_idx;
        }
        Ok(weights.iter().rev().fold(0.0, |acc, w| acc + w))
    }

    /// Returns the closest element to the specified value.
    ///
    /// Ties go to the node that was added first.
    pub fn nearest_neighbor(&self, val: &T) -> &T {
        self.nodes
            .iter()
            .min_by(|a, b| {
                let da = val.distance(&a.value);
                let db = val.distance(&b.value);
                da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
            })
            .map_or(&self.nodes[0].value, |node| &node.value)
    }

    /// Returns every node within `radius` of the specified value, with its distance,
    /// in insertion order. The value itself is included if it is in the tree.
    pub fn nearest_neighbors(&self, val: &T, radius: f64) -> Vec<(T, f64)> {
        self.nodes
            .iter()
            .filter_map(|node| {
                let distance = val.distance(&node.value);
                (distance <= radius).then(|| (node.value.clone(), distance))
            })
            .collect()
    }

    /// Returns a [DepthFirstIterator] for the tree
    pub fn iter_depth_first(&self) -> DepthFirstIterator<T, E> {
        DepthFirstIterator::new(self)
    }

    /// Returns a path from the root to the specified end point
    ///
    /// # Errors
    ///
    /// If the specified node is not found in the Tree
    pub fn path(&self, end: &T) -> Result<Vec<T>, TreeError> {
        // Build the path from end to beginning
        let mut path = Vec::new();

        // Loop until you get to the root
        let mut cur_idx = Some(self.index(end)?);
        while let Some(idx) = cur_idx {
            path.push(self.nodes[idx].value.clone());
            cur_idx = self.nodes[idx].parent;
        }

        // Reverse it to get the path in order
        path.reverse();
        Ok(path)
    }

    /// Returns the edge payloads along the path from the root to `end`, one per edge.
    ///
    /// # Errors
    ///
    /// If the specified node is not found in the Tree
    pub fn edges_to(&self, end: &T) -> Result<Vec<E>, TreeError>
    where
        E: Clone,
    {
        let mut edges = Vec::new();
        let mut cur_idx = self.index(end)?;
        while let Some(parent_idx) = self.nodes[cur_idx].parent {
            edges.extend(self.nodes[cur_idx].edge.clone());
            cur_idx = parent_idx;
        }
        edges.reverse();
        Ok(edges)
    }

    fn index(&self, val: &T) -> Result<usize, TreeError> {
        self.nodes_map
            .get(val)
            .copied()
            .ok_or(TreeError::MissingNode)
    }

    /// Returns the node with the specified value
    ///
    /// Returns None if the specified value is not in the tree.
    fn get_node(&self, val: &T) -> Option<&Node<T, E>> {
        self.nodes_map
            .get(val)
            .and_then(|&index| self.nodes.get(index))
    }
}

//
// Unit tests
//
