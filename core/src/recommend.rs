//! Graph-neighbour, genre-tree and hybrid recommendations.
//!
//! All functions are pure reads over structures built once at startup. The only
//! non-determinism is the tree sampling step, which draws from the `rng` passed in.

use crate::error::{RecError, RecResult};
use crate::graph::CooccurrenceGraph;
use crate::model::{Catalog, ItemId, RatingIndex};
use crate::tree::GenreTree;
use rand::Rng;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

/// How many graph neighbours the hybrid intersects against.
pub const GRAPH_CANDIDATES: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TreePickParams {
    /// games returned
    pub picks: usize,
    /// size of the top-rated pool the picks are drawn from
    pub cutoff: usize,
}

impl Default for TreePickParams {
    fn default() -> Self { Self { picks: 5, cutoff: 20 } }
}

impl TreePickParams {
    pub fn from_signed(picks: i64, cutoff: i64) -> RecResult<Self> {
        Ok(Self { picks: count_param("picks", picks)?, cutoff: count_param("cutoff", cutoff)? })
    }
}

/// Converts a caller-supplied count, rejecting negatives.
pub fn count_param(name: &'static str, value: i64) -> RecResult<usize> {
    usize::try_from(value).map_err(|_| RecError::NegativeCount { name, value })
}

/// Neighbours of `target_id` by descending co-ownership weight; equal weights
/// are ordered by ascending item id. With `id_to_name` the ids are translated
/// and any id without a name is dropped, so fewer than `top_n` may come back.
pub fn recommend_by_graph(
    graph: &CooccurrenceGraph,
    target_id: &str,
    top_n: usize,
    id_to_name: Option<&HashMap<ItemId, String>>,
) -> Vec<String> {
    if !graph.contains(target_id) {
        return Vec::new();
    }
    let mut neighbors: Vec<(&ItemId, u32)> = graph.neighbors(target_id).collect();
    neighbors.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    let top = neighbors.into_iter().take(top_n).map(|(id, _)| id);
    match id_to_name {
        Some(names) => top.filter_map(|id| names.get(id).cloned()).collect(),
        None => top.cloned().collect(),
    }
}

/// Random picks among the best-rated games of `genre`.
///
/// Leaves under `genre` are resolved through the lowercase `name_index`
/// (unresolvable names are dropped), rated with `ratings` (0.0 when unrated),
/// sorted by rating and cut to `params.cutoff`. A pool no larger than
/// `params.picks` is returned whole in rating order; otherwise exactly
/// `params.picks` distinct entries are drawn in draw order.
pub fn recommend_by_tree_random_high_rating<R: Rng + ?Sized>(
    tree: &GenreTree,
    genre: &str,
    name_index: &HashMap<String, ItemId>,
    ratings: &RatingIndex,
    params: TreePickParams,
    rng: &mut R,
) -> Vec<String> {
    let mut rated: Vec<(&str, f64)> = tree
        .games_in_genre(genre)
        .into_iter()
        .filter_map(|name| name_index.get(&name.to_lowercase()).map(|id| (name, ratings.get(id))))
        .collect();
    rated.sort_by(|a, b| b.1.total_cmp(&a.1));
    rated.truncate(params.cutoff);

    if rated.len() <= params.picks {
        return rated.into_iter().map(|(name, _)| name.to_string()).collect();
    }
    rand::seq::index::sample(rng, rated.len(), params.picks)
        .into_iter()
        .map(|i| rated[i].0.to_string())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HybridRecommendation {
    /// sorted ascending
    pub names: Vec<String>,
    /// set when the intersection came out empty
    pub notice: Option<String>,
}

/// Games both similar to `target_id` (top [`GRAPH_CANDIDATES`] graph neighbours)
/// and among the random top-rated picks of `genre`.
#[allow(clippy::too_many_arguments)]
pub fn hybrid_recommendation<R: Rng + ?Sized>(
    graph: &CooccurrenceGraph,
    tree: &GenreTree,
    target_id: &str,
    genre: &str,
    catalog: &Catalog,
    ratings: &RatingIndex,
    params: TreePickParams,
    rng: &mut R,
) -> HybridRecommendation {
    let by_graph: BTreeSet<String> =
        recommend_by_graph(graph, target_id, GRAPH_CANDIDATES, Some(catalog.id_to_name())).into_iter().collect();
    let by_tree: BTreeSet<String> =
        recommend_by_tree_random_high_rating(tree, genre, catalog.name_index(), ratings, params, rng).into_iter().collect();

    let names: Vec<String> = by_graph.intersection(&by_tree).cloned().collect();
    let notice = if names.is_empty() {
        let msg = format!("the intersection of graph-similar games and random top-rated '{genre}' games is empty");
        tracing::info!(target_id, genre, graph_hits = by_graph.len(), tree_hits = by_tree.len(), "{msg}");
        Some(msg)
    } else {
        None
    };
    HybridRecommendation { names, notice }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Game, Ownership};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn star_graph() -> CooccurrenceGraph {
        // hub co-owned with a by 5 users, with b and c by 3 each
        let mut own = Ownership::new();
        for u in 0..5 {
            own.extend(&format!("a{u}"), ["hub", "a"]);
        }
        for u in 0..3 {
            own.extend(&format!("bc{u}"), ["hub", "b"]);
        }
        for u in 3..6 {
            own.extend(&format!("bc{u}"), ["hub", "c"]);
        }
        CooccurrenceGraph::build(&own)
    }

    #[test]
    fn graph_ranks_by_weight_then_id() {
        let g = star_graph();
        assert_eq!(g.weight("hub", "a"), Some(5));
        assert_eq!(recommend_by_graph(&g, "hub", 2, None), vec!["a", "b"]);
        assert_eq!(recommend_by_graph(&g, "hub", 10, None), vec!["a", "b", "c"]);
        assert!(recommend_by_graph(&g, "missing", 5, None).is_empty());
        assert!(recommend_by_graph(&g, "hub", 0, None).is_empty());
    }

    #[test]
    fn graph_names_drop_unknown_ids() {
        let g = star_graph();
        let names: HashMap<ItemId, String> = [("a".to_string(), "Alpha".to_string()), ("c".to_string(), "Gamma".to_string())].into();
        assert_eq!(recommend_by_graph(&g, "hub", 2, Some(&names)), vec!["Alpha"]);
    }

    fn genre_fixture(n: usize) -> (GenreTree, Catalog, RatingIndex) {
        let catalog: Catalog = (0..n).map(|i| Game::new(i.to_string(), format!("Game {i}"), &["Action"])).collect();
        let ratings: RatingIndex = (0..n).map(|i| (i.to_string(), i as f64 / n as f64)).collect();
        (GenreTree::build(catalog.games()), catalog, ratings)
    }

    #[test]
    fn small_pool_is_returned_whole_in_rating_order() {
        let (tree, catalog, ratings) = genre_fixture(3);
        let mut rng = StdRng::seed_from_u64(7);
        let exact = recommend_by_tree_random_high_rating(&tree, "Action", catalog.name_index(), &ratings, TreePickParams { picks: 3, cutoff: 20 }, &mut rng);
        assert_eq!(exact, vec!["Game 2", "Game 1", "Game 0"]);
        let smaller = recommend_by_tree_random_high_rating(&tree, "Action", catalog.name_index(), &ratings, TreePickParams { picks: 5, cutoff: 20 }, &mut rng);
        assert_eq!(smaller, exact);
    }

    #[test]
    fn picks_come_from_the_top_rated_pool() {
        let (tree, catalog, ratings) = genre_fixture(30);
        let params = TreePickParams::default();
        let pool: BTreeSet<String> = (10..30).map(|i| format!("Game {i}")).collect();
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let picks = recommend_by_tree_random_high_rating(&tree, "Action", catalog.name_index(), &ratings, params, &mut rng);
            assert_eq!(picks.len(), 5);
            let distinct: BTreeSet<String> = picks.iter().cloned().collect();
            assert_eq!(distinct.len(), 5);
            assert!(distinct.is_subset(&pool));
        }
    }

    #[test]
    fn same_seed_same_picks() {
        let (tree, catalog, ratings) = genre_fixture(30);
        let run = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            recommend_by_tree_random_high_rating(&tree, "Action", catalog.name_index(), &ratings, TreePickParams::default(), &mut rng)
        };
        assert_eq!(run(42), run(42));
    }

    #[test]
    fn tree_lookup_is_case_insensitive_and_drops_unknown_names() {
        let tree = GenreTree::build(&[
            Game::new("1", "Half-Life", &["Action"]),
            Game::new("2", "Ghost", &["Action"]),
        ]);
        let name_index: HashMap<String, ItemId> = [("half-life".to_string(), "1".to_string())].into();
        let mut rng = StdRng::seed_from_u64(1);
        let picks = recommend_by_tree_random_high_rating(&tree, "Action", &name_index, &RatingIndex::new(), TreePickParams::default(), &mut rng);
        assert_eq!(picks, vec!["Half-Life"]);
        assert!(recommend_by_tree_random_high_rating(&tree, "Horror", &name_index, &RatingIndex::new(), TreePickParams::default(), &mut rng).is_empty());
    }

    #[test]
    fn hybrid_is_subset_of_both_sides() {
        let catalog: Catalog = vec![
            Game::new("hub", "Hub", &["Action"]),
            Game::new("a", "Alpha", &["Action"]),
            Game::new("b", "Beta", &["RPG"]),
            Game::new("c", "Gamma", &["Action"]),
        ]
        .into_iter()
        .collect();
        let tree = GenreTree::build(catalog.games());
        let ratings: RatingIndex = vec![("a", 0.9), ("c", 0.5), ("hub", 0.1)].into_iter().collect();
        let g = star_graph();
        let mut rng = StdRng::seed_from_u64(3);

        let hybrid = hybrid_recommendation(&g, &tree, "hub", "Action", &catalog, &ratings, TreePickParams::default(), &mut rng);
        assert_eq!(hybrid.names, vec!["Alpha", "Gamma"]);
        assert!(hybrid.notice.is_none());

        let none = hybrid_recommendation(&g, &tree, "nope", "Action", &catalog, &ratings, TreePickParams::default(), &mut rng);
        assert!(none.names.is_empty());
        assert!(none.notice.is_some());
    }

    #[test]
    fn negative_counts_are_rejected() {
        assert!(matches!(count_param("top_n", -1), Err(RecError::NegativeCount { name: "top_n", value: -1 })));
        assert_eq!(count_param("top_n", 3).unwrap(), 3);
        assert!(TreePickParams::from_signed(5, -20).is_err());
    }
}
