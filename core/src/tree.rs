use crate::model::Game;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type NodeIdx = usize;

pub const ROOT: NodeIdx = 0;
pub const ROOT_NAME: &str = "All Games";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNode {
    pub name: String,
    pub parent: Option<NodeIdx>,
    pub children: Vec<NodeIdx>,
}

/// Two-level genre taxonomy kept in an arena: root -> genre -> game leaves.
/// Leaves are not deduplicated; a game shows up once per genre it lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenreTree {
    nodes: Vec<TreeNode>,
}

impl Default for GenreTree {
    fn default() -> Self { Self::new() }
}

impl GenreTree {
    pub fn new() -> Self {
        Self { nodes: vec![TreeNode { name: ROOT_NAME.to_string(), parent: None, children: Vec::new() }] }
    }

    pub fn build(games: &[Game]) -> Self {
        let mut tree = Self::new();
        let mut genre_nodes: HashMap<&str, NodeIdx> = HashMap::new();
        for game in games {
            for genre in &game.genres {
                let genre_idx = match genre_nodes.get(genre.as_str()) {
                    Some(&idx) => idx,
                    None => {
                        let idx = tree.attach(ROOT, genre.clone());
                        genre_nodes.insert(genre.as_str(), idx);
                        idx
                    }
                };
                tree.attach(genre_idx, game.name.clone());
            }
        }
        tracing::debug!(games = games.len(), genres = genre_nodes.len(), leaves = tree.leaf_count(), "built genre tree");
        tree
    }

    fn attach(&mut self, parent: NodeIdx, name: String) -> NodeIdx {
        let idx = self.nodes.len();
        self.nodes.push(TreeNode { name, parent: Some(parent), children: Vec::new() });
        self.nodes[parent].children.push(idx);
        idx
    }

    pub fn root(&self) -> &TreeNode { &self.nodes[ROOT] }

    pub fn node(&self, idx: NodeIdx) -> Option<&TreeNode> { self.nodes.get(idx) }

    pub fn children(&self, idx: NodeIdx) -> impl Iterator<Item = &TreeNode> {
        self.nodes.get(idx).into_iter().flat_map(move |n| n.children.iter().map(move |&c| &self.nodes[c]))
    }

    /// Genre names in first-seen order.
    pub fn genres(&self) -> impl Iterator<Item = &str> {
        self.children(ROOT).map(|n| n.name.as_str())
    }

    pub fn node_count(&self) -> usize { self.nodes.len() }

    pub fn leaf_count(&self) -> usize {
        self.root().children.iter().map(|&g| self.nodes[g].children.len()).sum()
    }

    /// Names of every leaf whose parent genre is exactly `genre`, in depth-first order.
    pub fn games_in_genre(&self, genre: &str) -> Vec<&str> {
        let mut found = Vec::new();
        let mut stack = vec![ROOT];
        while let Some(idx) = stack.pop() {
            let node = &self.nodes[idx];
            if node.parent == Some(ROOT) && node.name == genre {
                found.extend(node.children.iter().map(|&c| self.nodes[c].name.as_str()));
            }
            // reversed so children are visited in insertion order
            stack.extend(node.children.iter().rev());
        }
        found
    }
}
