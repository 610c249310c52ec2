use crate::model::{ItemId, Ownership};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Undirected game graph. An edge joins two games owned by at least one common
/// user and its weight is the number of such users.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CooccurrenceGraph {
    // Both directions are stored so neighbour lookups are a single map access.
    adjacency: HashMap<ItemId, HashMap<ItemId, u32>>,
    num_edges: usize,
}

impl CooccurrenceGraph {
    pub fn new() -> Self { Self::default() }

    pub fn build(ownership: &Ownership) -> Self {
        let mut graph = Self::new();
        let mut users_paired = 0usize;
        for (_user, items) in ownership.users_with_items() {
            if items.len() < 2 { continue; }
            users_paired += 1;
            let items: Vec<&ItemId> = items.iter().collect();
            for (i, a) in items.iter().enumerate() {
                for b in &items[i + 1..] {
                    graph.bump(a, b);
                }
            }
        }
        tracing::debug!(users = ownership.num_users(), users_paired, nodes = graph.node_count(), edges = graph.edge_count(), "built co-occurrence graph");
        graph
    }

    /// Adds one shared owner to the (a, b) edge, creating nodes and edge as needed.
    fn bump(&mut self, a: &str, b: &str) {
        if a == b { return; }
        let w = self.adjacency.entry(a.to_string()).or_default().entry(b.to_string()).or_insert(0);
        *w += 1;
        if *w == 1 { self.num_edges += 1; }
        *self.adjacency.entry(b.to_string()).or_default().entry(a.to_string()).or_insert(0) += 1;
    }

    pub fn contains(&self, id: &str) -> bool { self.adjacency.contains_key(id) }

    pub fn weight(&self, a: &str, b: &str) -> Option<u32> {
        self.adjacency.get(a).and_then(|n| n.get(b)).copied()
    }

    /// Neighbours of `id` with edge weights, in no particular order.
    pub fn neighbors<'a>(&'a self, id: &str) -> impl Iterator<Item = (&'a ItemId, u32)> + 'a {
        self.adjacency.get(id).into_iter().flat_map(|n| n.iter().map(|(k, w)| (k, *w)))
    }

    pub fn node_count(&self) -> usize { self.adjacency.len() }

    pub fn edge_count(&self) -> usize { self.num_edges }

    pub fn nodes(&self) -> impl Iterator<Item = &ItemId> { self.adjacency.keys() }
}
