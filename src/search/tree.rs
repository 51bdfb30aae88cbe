//! Arena-backed search tree.
//!
//! Nodes live in one `Vec` and refer to each other by [`NodeId`]. Children
//! are owned, ordered index lists on the parent; the parent link is a plain
//! back-reference index.

#![allow(clippy::cast_precision_loss)]

use std::collections::HashSet;

use super::strategy::ReasoningStrategy;

/// Index of a node in its [`SearchTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    /// Arena index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// One reasoning state in the tree.
#[derive(Debug, Clone)]
pub struct SearchNode {
    /// Step text; empty for the root.
    pub content: String,
    /// Strategy tag; `None` for the root.
    pub strategy: Option<ReasoningStrategy>,
    /// Parent index; `None` for the root.
    pub parent: Option<NodeId>,
    /// Children in creation order.
    pub children: Vec<NodeId>,
    /// Backpropagation passes through this node.
    pub visits: u32,
    /// Sum of simulated values.
    pub value: f64,
    /// Distance from the root.
    pub depth: usize,
}

impl SearchNode {
    /// Mean value, or 0 if unvisited.
    #[must_use]
    pub fn mean_value(&self) -> f64 {
        if self.visits == 0 {
            0.0
        } else {
            self.value / f64::from(self.visits)
        }
    }

    /// Whitespace-separated word count of the content.
    #[must_use]
    pub fn word_count(&self) -> usize {
        self.content.split_whitespace().count()
    }
}

/// A tree owned by exactly one search.
#[derive(Debug, Clone)]
pub struct SearchTree {
    nodes: Vec<SearchNode>,
}

impl Default for SearchTree {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchTree {
    /// A tree holding only the root placeholder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![SearchNode {
                content: String::new(),
                strategy: None,
                parent: None,
                children: Vec::new(),
                visits: 0,
                value: 0.0,
                depth: 0,
            }],
        }
    }

    /// The root placeholder.
    #[must_use]
    pub const fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Number of nodes, root included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if only the root exists.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// Borrow a node.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &SearchNode {
        &self.nodes[id.0]
    }

    /// Attach a new child under `parent`.
    pub fn add_child(
        &mut self,
        parent: NodeId,
        content: impl Into<String>,
        strategy: ReasoningStrategy,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        let depth = self.nodes[parent.0].depth + 1;
        self.nodes.push(SearchNode {
            content: content.into(),
            strategy: Some(strategy),
            parent: Some(parent),
            children: Vec::new(),
            visits: 0,
            value: 0.0,
            depth,
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    /// UCB1 score of `id`.
    ///
    /// Unvisited nodes score `+inf`. Visited nodes score
    /// `mean + c * sqrt(ln(parent_visits) / visits)`; the root has no
    /// exploration term.
    #[must_use]
    pub fn ucb(&self, id: NodeId, exploration: f64) -> f64 {
        let node = self.node(id);
        if node.visits == 0 {
            return f64::INFINITY;
        }
        let exploitation = node.mean_value();
        let Some(parent) = node.parent.map(|p| self.node(p)) else {
            return exploitation;
        };
        if parent.visits == 0 {
            return exploitation;
        }
        let visits = f64::from(node.visits);
        exploration.mul_add(
            (f64::from(parent.visits).ln() / visits).sqrt(),
            exploitation,
        )
    }

    /// Descend from the root by highest UCB1 until a childless node.
    ///
    /// Ties go to the earliest child.
    #[must_use]
    pub fn select(&self, exploration: f64) -> NodeId {
        let mut current = self.root();
        while let Some(next) = self.first_max_child(current, |id| self.ucb(id, exploration)) {
            current = next;
        }
        current
    }

    /// Add `value` to `id` and every ancestor, counting one visit each.
    pub fn backpropagate(&mut self, id: NodeId, value: f64) {
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = &mut self.nodes[node_id.0];
            node.visits += 1;
            node.value += value;
            current = node.parent;
        }
    }

    /// Node ids from the first step below the root down to `id`.
    #[must_use]
    pub fn path_to(&self, id: NodeId) -> Vec<NodeId> {
        let mut path = Vec::with_capacity(self.node(id).depth);
        let mut current = id;
        while let Some(parent) = self.node(current).parent {
            path.push(current);
            current = parent;
        }
        path.reverse();
        path
    }

    /// Step contents from below the root down to `id`.
    #[must_use]
    pub fn path_contents(&self, id: NodeId) -> Vec<String> {
        self.path_to(id)
            .into_iter()
            .map(|node| self.node(node).content.clone())
            .collect()
    }

    /// Distinct strategy tags on the path from the root to `id`.
    #[must_use]
    pub fn distinct_strategies(&self, id: NodeId) -> usize {
        self.path_to(id)
            .into_iter()
            .filter_map(|node| self.node(node).strategy)
            .collect::<HashSet<_>>()
            .len()
    }

    /// Descend from the root by highest mean value until a leaf.
    ///
    /// Ties go to the earliest child. The root is not included.
    #[must_use]
    pub fn best_path(&self) -> Vec<NodeId> {
        let mut path = Vec::new();
        let mut current = self.root();
        while let Some(next) = self.first_max_child(current, |id| self.node(id).mean_value()) {
            path.push(next);
            current = next;
        }
        path
    }

    fn first_max_child(&self, id: NodeId, score: impl Fn(NodeId) -> f64) -> Option<NodeId> {
        let mut best: Option<(NodeId, f64)> = None;
        for &child in &self.node(id).children {
            let child_score = score(child);
            match best {
                Some((_, best_score)) if child_score <= best_score => {}
                _ => best = Some((child, child_score)),
            }
        }
        best.map(|(child, _)| child)
    }
}
