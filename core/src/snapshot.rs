use crate::error::RecError;
use crate::graph::CooccurrenceGraph;
use crate::model::{Catalog, ItemId, Ownership, RatingIndex};
use crate::popularity::PopularityTable;
use crate::recommend::{self, HybridRecommendation, TreePickParams};
use crate::tree::GenreTree;
use anyhow::{Context, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fs::{create_dir_all, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

pub const SNAPSHOT_VERSION: u32 = 1;

/// The read-only structures every recommendation is computed from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub catalog: Catalog,
    pub ratings: RatingIndex,
    pub graph: CooccurrenceGraph,
    pub tree: GenreTree,
    pub popularity: PopularityTable,
}

impl Snapshot {
    pub fn build(catalog: Catalog, ownership: &Ownership, ratings: RatingIndex) -> Self {
        let graph = CooccurrenceGraph::build(ownership);
        let tree = GenreTree::build(catalog.games());
        let popularity = PopularityTable::build(&catalog, ownership);
        tracing::info!(
            games = catalog.len(),
            users = ownership.num_users(),
            rated = ratings.len(),
            graph_nodes = graph.node_count(),
            graph_edges = graph.edge_count(),
            tree_leaves = tree.leaf_count(),
            popularity_rows = popularity.len(),
            "snapshot built"
        );
        Self { catalog, ratings, graph, tree, popularity }
    }

    /// Case-insensitive name -> id.
    pub fn resolve(&self, name: &str) -> Option<&ItemId> { self.catalog.id_for_name(name) }

    pub fn recommend_by_graph(&self, target_id: &str, top_n: usize) -> Vec<String> {
        recommend::recommend_by_graph(&self.graph, target_id, top_n, Some(self.catalog.id_to_name()))
    }

    pub fn recommend_by_tree<R: Rng + ?Sized>(&self, genre: &str, params: TreePickParams, rng: &mut R) -> Vec<String> {
        recommend::recommend_by_tree_random_high_rating(&self.tree, genre, self.catalog.name_index(), &self.ratings, params, rng)
    }

    pub fn hybrid<R: Rng + ?Sized>(&self, target_id: &str, genre: &str, params: TreePickParams, rng: &mut R) -> HybridRecommendation {
        recommend::hybrid_recommendation(&self.graph, &self.tree, target_id, genre, &self.catalog, &self.ratings, params, rng)
    }

    pub fn meta(&self, created_at: String) -> MetaFile {
        MetaFile {
            version: SNAPSHOT_VERSION,
            created_at,
            games: self.catalog.len(),
            graph_nodes: self.graph.node_count(),
            graph_edges: self.graph.edge_count(),
            genres: self.tree.genres().count(),
            popularity_rows: self.popularity.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaFile {
    pub version: u32,
    pub created_at: String,
    pub games: usize,
    pub graph_nodes: usize,
    pub graph_edges: usize,
    pub genres: usize,
    pub popularity_rows: usize,
}

pub struct SnapshotPaths {
    pub root: PathBuf,
}

impl SnapshotPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    fn snapshot(&self) -> PathBuf { self.root.join("snapshot.bin") }
    fn meta(&self) -> PathBuf { self.root.join("meta.json") }
}

pub fn save_snapshot(paths: &SnapshotPaths, snapshot: &Snapshot) -> Result<MetaFile> {
    create_dir_all(&paths.root).with_context(|| format!("creating {}", paths.root.display()))?;
    let mut f = BufWriter::new(File::create(paths.snapshot())?);
    bincode::serialize_into(&mut f, snapshot)?;
    f.flush()?;
    let created_at = time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_default();
    let meta = snapshot.meta(created_at);
    save_meta(paths, &meta)?;
    Ok(meta)
}

pub fn load_snapshot(paths: &SnapshotPaths) -> Result<Snapshot> {
    let meta = load_meta(paths)?;
    if meta.version != SNAPSHOT_VERSION {
        return Err(RecError::SnapshotVersion { found: meta.version, expected: SNAPSHOT_VERSION }.into());
    }
    let f = File::open(paths.snapshot()).with_context(|| format!("opening {}", paths.snapshot().display()))?;
    let snapshot: Snapshot = bincode::deserialize_from(BufReader::new(f))?;
    tracing::debug!(games = meta.games, graph_edges = meta.graph_edges, created_at = %meta.created_at, "snapshot loaded");
    Ok(snapshot)
}

pub fn save_meta(paths: &SnapshotPaths, meta: &MetaFile) -> Result<()> {
    create_dir_all(&paths.root)?;
    let mut f = File::create(paths.meta())?;
    let json = serde_json::to_string_pretty(meta)?;
    f.write_all(json.as_bytes())?;
    Ok(())
}

pub fn load_meta(paths: &SnapshotPaths) -> Result<MetaFile> {
    let mut f = File::open(paths.meta()).with_context(|| format!("opening {}", paths.meta().display()))?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    let meta: MetaFile = serde_json::from_str(&buf)?;
    Ok(meta)
}
